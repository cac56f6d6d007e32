//! Recursive-descent parser: `||` binds loosest, then `&&`, then `!`.
//!
//! Nesting (`!`, parentheses and operator chains) is capped at [`MAX_DEPTH`]
//! so a hostile rule line is rejected instead of exhausting the stack.

use std::str::FromStr;

use super::lexer::{Spanned, Token, tokenize};
use super::{CompareOp, Expr, Field, Literal, ParseError, Query};
use crate::filter::PatternCache;

/// Deepest expression tree a single query may build.
pub const MAX_DEPTH: usize = 64;

/// Parses one query line, compiling its patterns through `patterns`.
pub fn parse_query(text: &str, patterns: &PatternCache) -> Result<Query, ParseError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
        patterns,
    };
    let expr = parser.or()?;
    if let Some((token, at)) = parser.peek() {
        return Err(ParseError::UnexpectedToken {
            found: token.to_string(),
            at: *at,
        });
    }

    Ok(Query {
        source: text.trim().to_string(),
        expr,
    })
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: usize,
    patterns: &'a PatternCache,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Spanned> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek().is_some_and(|(token, _)| token == expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consumes `expected` and returns its offset.
    fn eat_at(&mut self, expected: &Token) -> Option<usize> {
        let at = self.peek().map(|(_, at)| *at)?;
        self.eat(expected).then_some(at)
    }

    fn descend(&mut self, at: usize) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::TooDeep { at });
        }
        Ok(())
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut expr = self.and()?;
        while let Some(at) = self.eat_at(&Token::Or) {
            self.descend(at)?;
            let rhs = self.and()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
        self.depth = base;
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut expr = self.unary()?;
        while let Some(at) = self.eat_at(&Token::And) {
            self.descend(at)?;
            let rhs = self.unary()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        self.depth = base;
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if let Some(at) = self.eat_at(&Token::Not) {
            self.descend(at)?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let (token, at) = self.next().cloned().ok_or(ParseError::UnexpectedEnd)?;

        match token {
            Token::LParen => {
                self.descend(at)?;
                let expr = self.or()?;
                self.depth -= 1;
                match self.next() {
                    Some((Token::RParen, _)) => Ok(expr),
                    Some((token, at)) => Err(ParseError::UnexpectedToken {
                        found: token.to_string(),
                        at: *at,
                    }),
                    None => Err(ParseError::UnexpectedEnd),
                }
            }
            Token::Ident(name) => {
                let field = Field::from_str(&name)
                    .map_err(|_| ParseError::UnknownField { name, at })?;
                self.comparison(field)
            }
            other => Err(ParseError::UnexpectedToken {
                found: other.to_string(),
                at,
            }),
        }
    }

    fn comparison(&mut self, field: Field) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some((Token::Compare(op), _)) => *op,
            _ => return Ok(Expr::Flag(field)),
        };
        self.pos += 1;

        let (token, at) = self.next().cloned().ok_or(ParseError::UnexpectedEnd)?;

        if matches!(op, CompareOp::Matches | CompareOp::NotMatches) {
            let Token::Str(pattern) = token else {
                return Err(ParseError::PatternNotString { op, at });
            };
            return Ok(Expr::Match {
                field,
                pattern: self.patterns.get_or_compile(&pattern),
                negate: op == CompareOp::NotMatches,
            });
        }

        let value = match token {
            Token::Str(text) => Literal::Str(text),
            Token::Number(n) => Literal::Number(n),
            Token::Ident(ident) if ident.eq_ignore_ascii_case("true") => Literal::Bool(true),
            Token::Ident(ident) if ident.eq_ignore_ascii_case("false") => Literal::Bool(false),
            Token::Ident(ident) => Literal::Ident(ident),
            other => {
                return Err(ParseError::UnexpectedToken {
                    found: other.to_string(),
                    at,
                });
            }
        };

        Ok(Expr::Compare { field, op, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn parse(text: &str) -> Result<Query, ParseError> {
        parse_query(text, &PatternCache::new())
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let query = parse("Rarity == Unique || Quality > 10 && Corrupted").unwrap();

        let Expr::Or(lhs, rhs) = query.expr() else {
            panic!("expected Or at the root, got {:?}", query.expr());
        };
        assert!(matches!(**lhs, Expr::Compare { field: Field::Rarity, .. }));
        assert!(matches!(**rhs, Expr::And(_, _)));
    }

    #[test]
    fn fields_are_case_insensitive() {
        let query = parse("itemlevel >= 80 && !IDENTIFIED").unwrap();
        let Expr::And(lhs, rhs) = query.expr() else {
            panic!("expected And");
        };
        assert!(matches!(
            **lhs,
            Expr::Compare {
                field: Field::ItemLevel,
                op: CompareOp::Ge,
                value: Literal::Number(n)
            } if n == 80.0
        ));
        assert!(matches!(&**rhs, Expr::Not(inner) if matches!(**inner, Expr::Flag(Field::Identified))));
    }

    #[test]
    fn boolean_literals_are_recognised() {
        let query = parse("Corrupted == FALSE").unwrap();
        assert!(matches!(
            query.expr(),
            Expr::Compare {
                value: Literal::Bool(false),
                ..
            }
        ));
    }

    #[test]
    fn patterns_share_the_cache() {
        let patterns = PatternCache::new();
        let a = parse_query("Path =~ \"^Currency/\"", &patterns).unwrap();
        let b = parse_query("Name !~ \"^Currency/\"", &patterns).unwrap();

        let (Expr::Match { pattern: Some(pa), .. }, Expr::Match { pattern: Some(pb), negate: true, .. }) =
            (a.expr(), b.expr())
        else {
            panic!("expected two compiled matches");
        };
        assert!(Arc::ptr_eq(pa, pb));
        assert_eq!(patterns.len(), 1);
    }

    #[test]
    fn invalid_pattern_parses_to_never_matching_expression() {
        let query = parse("Name =~ \"([unclosed\"").unwrap();
        assert!(matches!(query.expr(), Expr::Match { pattern: None, .. }));
    }

    #[test]
    fn malformed_queries_are_rejected() {
        assert_eq!(parse("   ").unwrap_err(), ParseError::Empty);
        assert_eq!(
            parse("Colour == Red").unwrap_err(),
            ParseError::UnknownField {
                name: "Colour".into(),
                at: 0
            }
        );
        assert_eq!(parse("(Name == \"a\"").unwrap_err(), ParseError::UnexpectedEnd);
        assert_eq!(parse("Quality >").unwrap_err(), ParseError::UnexpectedEnd);
        assert_eq!(
            parse("Path =~ Currency").unwrap_err(),
            ParseError::PatternNotString {
                op: CompareOp::Matches,
                at: 8
            }
        );
        assert!(matches!(
            parse("Name == \"a\" Quality").unwrap_err(),
            ParseError::UnexpectedToken { at: 12, .. }
        ));
    }

    #[test]
    fn nesting_is_capped() {
        let nots = format!("{}Corrupted", "!".repeat(20_000));
        assert_eq!(parse(&nots).unwrap_err(), ParseError::TooDeep { at: MAX_DEPTH });

        let parens = format!("{}Corrupted{}", "(".repeat(5_000), ")".repeat(5_000));
        assert_eq!(parse(&parens).unwrap_err(), ParseError::TooDeep { at: MAX_DEPTH });

        let chain = vec!["Corrupted"; 5_000].join(" && ");
        assert!(matches!(parse(&chain).unwrap_err(), ParseError::TooDeep { .. }));

        let within = format!("{}Corrupted", "!".repeat(MAX_DEPTH));
        assert!(parse(&within).is_ok());
    }
}
