//! Error types raised by rule source implementations.

use std::io;

use thiserror::Error;

/// Errors surfaced by [`super::RuleSource`] implementations.
#[derive(Debug, Error)]
pub enum RuleSourceError {
    #[error("I/O error on {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: io::Error,
    },

    #[error("rule not found: {0}")]
    NotFound(String),

    #[error("rule metadata error: {0}")]
    Metadata(String),
}

impl RuleSourceError {
    pub fn io(location: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            location: location.into(),
            source,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io { source, .. } => source.kind() != io::ErrorKind::NotFound,
            Self::NotFound(_) | Self::Metadata(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleSourceError>;
