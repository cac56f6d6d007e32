//! In-memory rule source for testing and embedded rule sets.

mod rules;

pub use rules::InMemoryRuleSource;
