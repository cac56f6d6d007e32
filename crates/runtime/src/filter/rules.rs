//! Rule metadata merging and compiled filter sets.

use std::collections::HashSet;

use pickup_core::Candidate;

use super::PatternCache;
use super::predicate::{EvalError, Query, parse_query};
use crate::repository::{RuleDefinition, RuleMeta, RuleMetadata};

/// Reconciles persisted metadata with what the source currently offers.
///
/// Known rules keep their enabled flag and position. Newly discovered rules
/// are appended in discovery order with `default_enabled`. Rules the source no
/// longer offers are dropped.
pub fn merge_metadata(
    known: Option<&RuleMetadata>,
    discovered: &[RuleDefinition],
    default_enabled: bool,
) -> RuleMetadata {
    let available: HashSet<&str> = discovered.iter().map(|rule| rule.name.as_str()).collect();

    let mut rules: Vec<RuleMeta> = known
        .map(|known| {
            known
                .rules
                .iter()
                .filter(|meta| available.contains(meta.name.as_str()))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    for rule in discovered {
        if rules.iter().all(|meta| meta.name != rule.name) {
            rules.push(RuleMeta {
                name: rule.name.clone(),
                enabled: default_enabled,
            });
        }
    }

    RuleMetadata { rules }
}

/// One compiled rule file: it matches when any of its queries does.
#[derive(Debug, Clone)]
pub struct Filter {
    name: String,
    queries: Vec<Query>,
}

impl Filter {
    pub fn new(name: impl Into<String>, queries: Vec<Query>) -> Self {
        Self {
            name: name.into(),
            queries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// The first evaluation error aborts this filter.
    pub fn matches(&self, candidate: &Candidate) -> Result<bool, EvalError> {
        for query in &self.queries {
            if query.evaluate(candidate)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Immutable list of active filters, replaced wholesale on reload.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn names(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Parses a rule file, one query per line.
///
/// Blank lines and lines starting with `//` or `#` are skipped. A malformed
/// line is logged and skipped. Returns the filter and the number of lines
/// that failed to parse.
pub fn compile_rule(name: &str, text: &str, patterns: &PatternCache) -> (Filter, usize) {
    let mut queries = Vec::new();
    let mut invalid = 0;

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") || line.starts_with('#') {
            continue;
        }
        match parse_query(line, patterns) {
            Ok(query) => queries.push(query),
            Err(error) => {
                invalid += 1;
                tracing::warn!(
                    target: "pickup::filter",
                    rule = name,
                    line = index + 1,
                    %error,
                    "skipping malformed query"
                );
            }
        }
    }

    (Filter::new(name, queries), invalid)
}
