//! Process-wide compiled regular expression cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;

/// Append-only map from pattern text to its compiled form.
///
/// The same text always yields the same `Arc`; text that fails to compile is
/// logged and never stored.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: RwLock<HashMap<String, Arc<Regex>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(&self, text: &str) -> Option<Arc<Regex>> {
        if let Some(hit) = self.compiled.read().get(text) {
            return Some(Arc::clone(hit));
        }

        // Compile outside the lock; a racing insert of the same text wins.
        let regex = match Regex::new(text) {
            Ok(regex) => Arc::new(regex),
            Err(error) => {
                tracing::warn!(target: "pickup::filter", pattern = text, %error, "invalid pattern");
                return None;
            }
        };

        let mut compiled = self.compiled.write();
        Some(Arc::clone(compiled.entry(text.to_string()).or_insert(regex)))
    }

    pub fn get(&self, text: &str) -> Option<Arc<Regex>> {
        self.compiled.read().get(text).cloned()
    }

    pub fn len(&self) -> usize {
        self.compiled.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.read().is_empty()
    }
}
