//! Boolean predicate language for filter rules.
//!
//! A query compares candidate attributes against literals:
//!
//! ```text
//! Rarity >= Rare && ItemLevel >= 75
//! Path =~ "^Metadata/Items/Currency" || (Class == "Ring" && !Identified)
//! ```
//!
//! Queries are parsed once when rules load. Regular expressions are resolved
//! through the shared [`PatternCache`](super::PatternCache) at parse time; an
//! invalid pattern yields a comparison that never matches.
mod eval;
mod lexer;
mod parser;

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use strum::{Display, EnumString};
use thiserror::Error;

use pickup_core::Candidate;

pub use parser::parse_query;

/// Candidate attribute addressable from a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Field {
    Name,
    BaseName,
    Path,
    Class,
    Rarity,
    Kind,
    Distance,
    Width,
    Height,
    StackSize,
    MaxStackSize,
    ItemLevel,
    Quality,
    Identified,
    Corrupted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Matches,
    NotMatches,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Matches => "=~",
            CompareOp::NotMatches => "!~",
        })
    }
}

/// Right-hand side of a comparison.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Str(String),
    /// Bare word such as `Unique` or `Container`.
    Ident(String),
    Number(f64),
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(text) => write!(f, "{text:?}"),
            Literal::Ident(ident) => f.write_str(ident),
            Literal::Number(n) => write!(f, "{n}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Bare boolean field.
    Flag(Field),
    Compare {
        field: Field,
        op: CompareOp,
        value: Literal,
    },
    /// `=~` / `!~`; `pattern` is `None` when the expression failed to compile.
    Match {
        field: Field,
        pattern: Option<Arc<Regex>>,
        negate: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty query")]
    Empty,

    #[error("unexpected character {ch:?} at {at}")]
    UnexpectedChar { ch: char, at: usize },

    #[error("unterminated string starting at {at}")]
    UnterminatedString { at: usize },

    #[error("invalid number {literal:?} at {at}")]
    InvalidNumber { literal: String, at: usize },

    #[error("unknown field {name:?} at {at}")]
    UnknownField { name: String, at: usize },

    #[error("unexpected {found} at {at}")]
    UnexpectedToken { found: String, at: usize },

    #[error("unexpected end of query")]
    UnexpectedEnd,

    #[error("pattern operator {op} needs a string literal at {at}")]
    PatternNotString { op: CompareOp, at: usize },

    #[error("query nested too deeply at {at}")]
    TooDeep { at: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("field {0} is only defined for items")]
    ItemOnlyField(Field),

    #[error("field {field} cannot be compared with {literal}")]
    TypeMismatch { field: Field, literal: String },

    #[error("operator {op} is not supported for field {field}")]
    UnsupportedOperator { field: Field, op: CompareOp },

    #[error("field {0} is not a boolean")]
    NotBoolean(Field),
}

/// One parsed line of a rule file.
#[derive(Clone, Debug)]
pub struct Query {
    source: String,
    expr: Expr,
}

impl Query {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn evaluate(&self, candidate: &Candidate) -> Result<bool, EvalError> {
        eval::evaluate(&self.expr, candidate)
    }
}
