//! Rule-based filter engine.
//!
//! Rules are predicate programs loaded through a
//! [`RuleSource`](crate::repository::RuleSource). The [`FilterEngine`] keeps
//! the enabled subset compiled in an immutable [`FilterSet`] that is swapped
//! atomically on reload, and answers "should this candidate be picked up".
mod engine;
mod metrics;
mod patterns;
pub mod predicate;
mod rules;

use std::time::Duration;

use thiserror::Error;

pub use engine::{FilterConfig, FilterEngine, ReloadReport, RetryPolicy};
pub use metrics::{FilterMetrics, FilterMetricsSnapshot};
pub use patterns::PatternCache;
pub use predicate::{EvalError, ParseError, Query};
pub use rules::{Filter, FilterSet, compile_rule, merge_metadata};

use crate::repository::RuleSourceError;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("another reload is in progress (waited {waited:?})")]
    ReloadBusy { waited: Duration },

    #[error("filter engine has been disposed")]
    Disposed,

    #[error("unknown rule: {0}")]
    UnknownRule(String),

    #[error(transparent)]
    Source(#[from] RuleSourceError),

    #[error("invalid query: {0}")]
    Parse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, FilterError>;
