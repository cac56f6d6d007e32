//! In-memory [`RuleSource`] for tests and embedded rule sets.

use std::collections::HashMap;
use std::io;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::repository::{Result, RuleDefinition, RuleMetadata, RuleSource, RuleSourceError};

#[derive(Debug, Clone, Copy)]
enum ReadFailure {
    Times(u32),
    Always,
}

#[derive(Debug, Default)]
struct Inner {
    rules: Vec<(String, String)>,
    metadata: Option<RuleMetadata>,
    failures: HashMap<String, ReadFailure>,
    reads: HashMap<String, u32>,
}

/// Rules held in memory, in insertion order.
///
/// Reads can be made to fail a number of times (or forever) to exercise
/// retry handling.
#[derive(Debug, Default)]
pub struct InMemoryRuleSource {
    inner: Mutex<Inner>,
}

impl InMemoryRuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert_rule(name, text);
        self
    }

    /// Adds or replaces a rule; new rules go to the end of discovery order.
    pub fn insert_rule(&self, name: impl Into<String>, text: impl Into<String>) {
        let (name, text) = (name.into(), text.into());
        let mut inner = self.inner.lock();
        match inner.rules.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = text,
            None => inner.rules.push((name, text)),
        }
    }

    pub fn remove_rule(&self, name: &str) {
        self.inner.lock().rules.retain(|(existing, _)| existing != name);
    }

    /// The next `times` reads of `name` fail with a transient I/O error.
    pub fn fail_reads(&self, name: impl Into<String>, times: u32) {
        self.inner
            .lock()
            .failures
            .insert(name.into(), ReadFailure::Times(times));
    }

    /// Every read of `name` fails with a transient I/O error.
    pub fn fail_always(&self, name: impl Into<String>) {
        self.inner.lock().failures.insert(name.into(), ReadFailure::Always);
    }

    /// Number of read calls issued for `name`, failed ones included.
    pub fn reads(&self, name: &str) -> u32 {
        self.inner.lock().reads.get(name).copied().unwrap_or(0)
    }

    pub fn metadata(&self) -> Option<RuleMetadata> {
        self.inner.lock().metadata.clone()
    }
}

#[async_trait]
impl RuleSource for InMemoryRuleSource {
    async fn discover(&self) -> Result<Vec<RuleDefinition>> {
        let inner = self.inner.lock();
        Ok(inner
            .rules
            .iter()
            .map(|(name, _)| RuleDefinition::new(name.clone(), format!("memory://{name}")))
            .collect())
    }

    async fn read(&self, rule: &RuleDefinition) -> Result<String> {
        let mut inner = self.inner.lock();
        *inner.reads.entry(rule.name.clone()).or_default() += 1;

        let fail = match inner.failures.get_mut(&rule.name) {
            Some(ReadFailure::Always) => true,
            Some(ReadFailure::Times(0)) | None => false,
            Some(ReadFailure::Times(remaining)) => {
                *remaining -= 1;
                true
            }
        };
        if fail {
            return Err(RuleSourceError::io(
                rule.location.clone(),
                io::Error::new(io::ErrorKind::Interrupted, "simulated read failure"),
            ));
        }

        inner
            .rules
            .iter()
            .find(|(name, _)| *name == rule.name)
            .map(|(_, text)| text.clone())
            .ok_or_else(|| RuleSourceError::NotFound(rule.location.clone()))
    }

    async fn load_metadata(&self) -> Result<Option<RuleMetadata>> {
        Ok(self.inner.lock().metadata.clone())
    }

    async fn save_metadata(&self, metadata: &RuleMetadata) -> Result<()> {
        self.inner.lock().metadata = Some(metadata.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_failures_run_out() {
        let source = InMemoryRuleSource::new().with_rule("a", "Name == \"x\"");
        source.fail_reads("a", 2);
        let rule = source.discover().await.unwrap().remove(0);

        assert!(source.read(&rule).await.unwrap_err().is_transient());
        assert!(source.read(&rule).await.is_err());
        assert_eq!(source.read(&rule).await.unwrap(), "Name == \"x\"");
        assert_eq!(source.reads("a"), 3);
    }

    #[tokio::test]
    async fn replacing_a_rule_keeps_its_position() {
        let source = InMemoryRuleSource::new()
            .with_rule("a", "1")
            .with_rule("b", "2");
        source.insert_rule("a", "3");

        let names: Vec<_> = source
            .discover()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, ["a", "b"]);
    }
}
