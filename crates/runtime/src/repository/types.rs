//! Shared types for the rule source layer.

use serde::{Deserialize, Serialize};

/// A rule discovered by a source: its display name and where to read it from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    /// Source-specific location (a file path for [`super::FileRuleSource`]).
    pub location: String,
}

impl RuleDefinition {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }
}

/// Per-rule user state persisted next to the rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMeta {
    pub name: String,
    pub enabled: bool,
}

/// Ordered rule list with enabled flags; order is evaluation order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMetadata {
    pub rules: Vec<RuleMeta>,
}

impl RuleMetadata {
    pub fn get(&self, name: &str) -> Option<&RuleMeta> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|rule| rule.name == name)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &RuleMeta> {
        self.rules.iter().filter(|rule| rule.enabled)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
