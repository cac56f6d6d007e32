//! Rule source layer.
//!
//! Sources resolve a rule location to named predicate programs and persist the
//! user's per-rule enabled flags and ordering. The filter engine only talks to
//! the [`RuleSource`] trait.

mod error;
mod file;
mod memory;
mod traits;
mod types;

pub use error::{Result, RuleSourceError};
pub use file::{FileRuleSource, METADATA_FILE, RULE_EXTENSION};
pub use memory::InMemoryRuleSource;
pub use traits::RuleSource;
pub use types::{RuleDefinition, RuleMeta, RuleMetadata};
