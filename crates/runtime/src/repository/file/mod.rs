//! File-based rule source.

mod rules;

pub use rules::{FileRuleSource, METADATA_FILE, RULE_EXTENSION};
