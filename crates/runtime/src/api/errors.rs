//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from the filter engine, rule sources and worker coordination
//! so clients can bubble them up with consistent context.
use thiserror::Error;

pub use crate::filter::FilterError;
pub use crate::repository::RuleSourceError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime requires a {0} before building")]
    MissingCollaborator(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    RuleSource(#[from] RuleSourceError),

    #[error("worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),
}
