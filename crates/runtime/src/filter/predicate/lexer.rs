//! Tokenizer for predicate queries.

use std::fmt;

use super::{CompareOp, ParseError};

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    Not,
    And,
    Or,
    Compare(CompareOp),
    Ident(String),
    Str(String),
    Number(f64),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Not => f.write_str("!"),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::Compare(op) => write!(f, "{op}"),
            Token::Ident(ident) => f.write_str(ident),
            Token::Str(text) => write!(f, "{text:?}"),
            Token::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A token and the byte offset it starts at.
pub type Spanned = (Token, usize);

pub fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(at, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match ch {
            '(' => {
                chars.next();
                Token::LParen
            }
            ')' => {
                chars.next();
                Token::RParen
            }
            '!' => {
                chars.next();
                match chars.peek().map(|&(_, c)| c) {
                    Some('=') => {
                        chars.next();
                        Token::Compare(CompareOp::Ne)
                    }
                    Some('~') => {
                        chars.next();
                        Token::Compare(CompareOp::NotMatches)
                    }
                    _ => Token::Not,
                }
            }
            '=' => {
                chars.next();
                match chars.next().map(|(_, c)| c) {
                    Some('=') => Token::Compare(CompareOp::Eq),
                    Some('~') => Token::Compare(CompareOp::Matches),
                    _ => return Err(ParseError::UnexpectedChar { ch: '=', at }),
                }
            }
            '<' | '>' => {
                chars.next();
                let or_equal = chars.peek().is_some_and(|&(_, c)| c == '=');
                if or_equal {
                    chars.next();
                }
                Token::Compare(match (ch, or_equal) {
                    ('<', false) => CompareOp::Lt,
                    ('<', true) => CompareOp::Le,
                    ('>', false) => CompareOp::Gt,
                    _ => CompareOp::Ge,
                })
            }
            '&' | '|' => {
                chars.next();
                match chars.next() {
                    Some((_, next)) if next == ch => {
                        if ch == '&' {
                            Token::And
                        } else {
                            Token::Or
                        }
                    }
                    _ => return Err(ParseError::UnexpectedChar { ch, at }),
                }
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, escaped)) => text.push(escaped),
                            None => return Err(ParseError::UnterminatedString { at }),
                        },
                        Some((_, c)) => text.push(c),
                        None => return Err(ParseError::UnterminatedString { at }),
                    }
                }
                Token::Str(text)
            }
            c if c.is_ascii_digit() || c == '-' || c == '.' => {
                let mut end = at;
                let mut literal = String::new();
                while let Some(&(i, c)) = chars.peek() {
                    let sign = c == '-' && literal.is_empty();
                    if !(c.is_ascii_digit() || c == '.' || sign) {
                        break;
                    }
                    literal.push(c);
                    end = i;
                    chars.next();
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber {
                        literal: input[at..=end].to_string(),
                        at,
                    })?;
                Token::Number(value)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !(c.is_alphanumeric() || c == '_') {
                        break;
                    }
                    ident.push(c);
                    chars.next();
                }
                Token::Ident(ident)
            }
            other => return Err(ParseError::UnexpectedChar { ch: other, at }),
        };

        tokens.push((token, at));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn operators_are_split_greedily() {
        assert_eq!(
            kinds("!(a != 1) && b !~ \"x\" || c<=2"),
            vec![
                Token::Not,
                Token::LParen,
                Token::Ident("a".into()),
                Token::Compare(CompareOp::Ne),
                Token::Number(1.0),
                Token::RParen,
                Token::And,
                Token::Ident("b".into()),
                Token::Compare(CompareOp::NotMatches),
                Token::Str("x".into()),
                Token::Or,
                Token::Ident("c".into()),
                Token::Compare(CompareOp::Le),
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn strings_support_escapes() {
        assert_eq!(
            kinds(r#"Name == "Kitava's \"Feast\"""#)[2],
            Token::Str("Kitava's \"Feast\"".into())
        );
    }

    #[test]
    fn lexical_errors_report_offsets() {
        assert_eq!(
            tokenize("a = 1"),
            Err(ParseError::UnexpectedChar { ch: '=', at: 2 })
        );
        assert_eq!(
            tokenize("a & b"),
            Err(ParseError::UnexpectedChar { ch: '&', at: 2 })
        );
        assert_eq!(
            tokenize("Name == \"open"),
            Err(ParseError::UnterminatedString { at: 8 })
        );
        assert!(matches!(
            tokenize("Quality > 1.2.3"),
            Err(ParseError::InvalidNumber { at: 10, .. })
        ));
    }
}
