//! Evaluation of parsed queries against a candidate.

use std::cmp::Ordering;
use std::str::FromStr;

use pickup_core::{Candidate, Rarity, TargetKind};
use regex::Regex;

use super::{CompareOp, EvalError, Expr, Field, Literal};

enum Value<'a> {
    Str(&'a str),
    Num(f64),
    Bool(bool),
    Rarity(Rarity),
    Kind(TargetKind),
}

pub(super) fn evaluate(expr: &Expr, candidate: &Candidate) -> Result<bool, EvalError> {
    match expr {
        Expr::Or(lhs, rhs) => Ok(evaluate(lhs, candidate)? || evaluate(rhs, candidate)?),
        Expr::And(lhs, rhs) => Ok(evaluate(lhs, candidate)? && evaluate(rhs, candidate)?),
        Expr::Not(inner) => Ok(!evaluate(inner, candidate)?),
        Expr::Flag(field) => match value_of(*field, candidate)? {
            Value::Bool(b) => Ok(b),
            _ => Err(EvalError::NotBoolean(*field)),
        },
        Expr::Compare { field, op, value } => compare(*field, *op, value, candidate),
        Expr::Match {
            field,
            pattern,
            negate,
        } => {
            let pattern = pattern.as_deref();
            let text = match value_of(*field, candidate)? {
                Value::Str(text) => text,
                Value::Rarity(r) => return Ok(pattern_matches(pattern, &r.to_string(), *negate)),
                Value::Kind(k) => return Ok(pattern_matches(pattern, &k.to_string(), *negate)),
                Value::Num(_) | Value::Bool(_) => {
                    return Err(EvalError::UnsupportedOperator {
                        field: *field,
                        op: if *negate {
                            CompareOp::NotMatches
                        } else {
                            CompareOp::Matches
                        },
                    });
                }
            };
            Ok(pattern_matches(pattern, text, *negate))
        }
    }
}

/// An uncompiled pattern never matches, negated or not.
fn pattern_matches(pattern: Option<&Regex>, text: &str, negate: bool) -> bool {
    match pattern {
        Some(re) => re.is_match(text) != negate,
        None => false,
    }
}

fn value_of(field: Field, candidate: &Candidate) -> Result<Value<'_>, EvalError> {
    let item = || candidate.item().ok_or(EvalError::ItemOnlyField(field));

    Ok(match field {
        Field::Name => Value::Str(candidate.name()),
        Field::Path => Value::Str(candidate.path()),
        Field::Kind => Value::Kind(candidate.kind()),
        Field::Distance => Value::Num(f64::from(candidate.distance)),
        Field::BaseName => Value::Str(&item()?.base_name),
        Field::Class => Value::Str(&item()?.class),
        Field::Rarity => Value::Rarity(item()?.rarity),
        Field::Width => Value::Num(f64::from(item()?.width)),
        Field::Height => Value::Num(f64::from(item()?.height)),
        Field::StackSize => Value::Num(f64::from(item()?.stack_size)),
        Field::MaxStackSize => Value::Num(f64::from(item()?.max_stack_size)),
        Field::ItemLevel => Value::Num(f64::from(item()?.item_level)),
        Field::Quality => Value::Num(f64::from(item()?.quality)),
        Field::Identified => Value::Bool(item()?.identified),
        Field::Corrupted => Value::Bool(item()?.corrupted),
    })
}

fn compare(
    field: Field,
    op: CompareOp,
    literal: &Literal,
    candidate: &Candidate,
) -> Result<bool, EvalError> {
    let mismatch = || EvalError::TypeMismatch {
        field,
        literal: literal.to_string(),
    };
    let unsupported = || EvalError::UnsupportedOperator { field, op };

    let ordering = match (value_of(field, candidate)?, literal) {
        (Value::Str(actual), Literal::Str(expected) | Literal::Ident(expected)) => {
            let equal = eq_ignore_case(actual, expected);
            return match op {
                CompareOp::Eq => Ok(equal),
                CompareOp::Ne => Ok(!equal),
                _ => Err(unsupported()),
            };
        }
        (Value::Bool(actual), Literal::Bool(expected)) => {
            return match op {
                CompareOp::Eq => Ok(actual == *expected),
                CompareOp::Ne => Ok(actual != *expected),
                _ => Err(unsupported()),
            };
        }
        (Value::Kind(actual), Literal::Str(expected) | Literal::Ident(expected)) => {
            let expected = TargetKind::from_str(expected).map_err(|_| mismatch())?;
            return match op {
                CompareOp::Eq => Ok(actual == expected),
                CompareOp::Ne => Ok(actual != expected),
                _ => Err(unsupported()),
            };
        }
        (Value::Num(actual), Literal::Number(expected)) => {
            actual.partial_cmp(expected).ok_or_else(mismatch)?
        }
        (Value::Rarity(actual), Literal::Str(expected) | Literal::Ident(expected)) => {
            actual.cmp(&Rarity::from_str(expected).map_err(|_| mismatch())?)
        }
        _ => return Err(mismatch()),
    };

    Ok(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Matches | CompareOp::NotMatches => return Err(unsupported()),
    })
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PatternCache;
    use crate::filter::predicate::{Query, parse_query};
    use pickup_core::{
        ContainerDetails, EntityId, GroundLabel, ItemDetails, LabelInfo, TargetDetails,
        WorldPosition,
    };

    fn item(details: ItemDetails) -> Candidate {
        Candidate::from_label(&GroundLabel {
            id: EntityId(1),
            position: WorldPosition::ORIGIN,
            distance: 42.0,
            label: LabelInfo::default(),
            details: TargetDetails::Item(details),
        })
    }

    fn ring() -> Candidate {
        let mut details = ItemDetails::new("Vermillion Ring", "Metadata/Items/Rings/Ring13");
        details.base_name = "Vermillion Ring".into();
        details.class = "Ring".into();
        details.rarity = Rarity::Rare;
        details.item_level = 84;
        details.identified = false;
        item(details)
    }

    fn chest() -> Candidate {
        Candidate::from_label(&GroundLabel {
            id: EntityId(2),
            position: WorldPosition::ORIGIN,
            distance: 12.0,
            label: LabelInfo::default(),
            details: TargetDetails::Container(ContainerDetails {
                name: "Strongbox".into(),
                path: "Metadata/Chests/StrongBoxes/Arcanist".into(),
                opened: false,
            }),
        })
    }

    fn query(text: &str) -> Query {
        parse_query(text, &PatternCache::new()).unwrap()
    }

    fn eval(text: &str, candidate: &Candidate) -> Result<bool, EvalError> {
        query(text).evaluate(candidate)
    }

    #[test]
    fn string_equality_ignores_case() {
        assert_eq!(eval("Class == \"ring\"", &ring()), Ok(true));
        assert_eq!(eval("Name != \"VERMILLION RING\"", &ring()), Ok(false));
    }

    #[test]
    fn rarity_is_ordered() {
        assert_eq!(eval("Rarity >= Magic", &ring()), Ok(true));
        assert_eq!(eval("Rarity == unique", &ring()), Ok(false));
        assert_eq!(eval("Rarity < Unique && ItemLevel >= 84", &ring()), Ok(true));
    }

    #[test]
    fn numbers_and_flags() {
        assert_eq!(eval("Distance < 50", &ring()), Ok(true));
        assert_eq!(eval("!Identified && Quality == 0", &ring()), Ok(true));
        assert_eq!(eval("Corrupted", &ring()), Ok(false));
    }

    #[test]
    fn patterns_match_and_negate() {
        assert_eq!(eval("Path =~ \"Rings/\"", &ring()), Ok(true));
        assert_eq!(eval("Path !~ \"Rings/\"", &ring()), Ok(false));
        assert_eq!(eval("Rarity =~ \"^R\"", &ring()), Ok(true));
    }

    #[test]
    fn broken_pattern_never_matches() {
        assert_eq!(eval("Name =~ \"(\"", &ring()), Ok(false));
        assert_eq!(eval("Name !~ \"(\"", &ring()), Ok(false));
    }

    #[test]
    fn containers_expose_shared_fields_only() {
        assert_eq!(eval("Kind == Container && Distance <= 12", &chest()), Ok(true));
        assert_eq!(
            eval("ItemLevel > 1", &chest()),
            Err(EvalError::ItemOnlyField(Field::ItemLevel))
        );
        // Short-circuit skips the item-only side.
        assert_eq!(eval("Kind == Container || Quality > 1", &chest()), Ok(true));
    }

    #[test]
    fn type_errors_are_reported() {
        assert!(matches!(
            eval("Quality == \"high\"", &ring()),
            Err(EvalError::TypeMismatch { field: Field::Quality, .. })
        ));
        assert!(matches!(
            eval("Rarity == Legendary", &ring()),
            Err(EvalError::TypeMismatch { .. })
        ));
        assert_eq!(
            eval("Name > \"a\"", &ring()),
            Err(EvalError::UnsupportedOperator {
                field: Field::Name,
                op: CompareOp::Gt
            })
        );
        assert_eq!(eval("Name", &ring()), Err(EvalError::NotBoolean(Field::Name)));
    }
}
