//! Rule source contract.

use async_trait::async_trait;

use super::error::Result;
use super::types::{RuleDefinition, RuleMetadata};

/// Resolves a rule location to named rule definitions and stores the user's
/// per-rule enabled flags and ordering.
///
/// Implementations:
/// - [`super::FileRuleSource`]: a directory of `*.ifl` files plus `rules.ron`
/// - [`super::InMemoryRuleSource`]: tests and embedded rule sets
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Lists the rules currently available, in discovery order.
    async fn discover(&self) -> Result<Vec<RuleDefinition>>;

    /// Reads the raw predicate text of one rule.
    async fn read(&self, rule: &RuleDefinition) -> Result<String>;

    /// Loads persisted metadata; `None` when nothing was saved yet.
    async fn load_metadata(&self) -> Result<Option<RuleMetadata>>;

    /// Persists metadata, replacing what was stored before.
    async fn save_metadata(&self, metadata: &RuleMetadata) -> Result<()>;
}
