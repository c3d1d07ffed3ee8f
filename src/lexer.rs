use std::fmt;

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Bang,
    Ident(String),
    Star,
    /// Quoted string with the surrounding quotes already stripped.
    Str(String),
    Comma,
    And,
    Or,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Bang => write!(f, "!"),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Star => write!(f, "*"),
            Token::Str(value) => write!(f, "\"{}\"", value),
            Token::Comma => write!(f, ","),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

/// Scans the whole query, or fails naming the input left at the point where
/// no token matches. No partial token sequence is ever returned.
pub fn lex(query: &str) -> Result<Vec<Token>> {
    let mut rest = query.trim_start();
    let mut tokens = Vec::new();
    while !rest.is_empty() {
        let (token, len) = scan(rest).ok_or_else(|| Error::Lex(rest.to_owned()))?;
        tokens.push(token);
        rest = rest[len..].trim_start();
    }
    Ok(tokens)
}

/// Matches one token at the start of `input` and returns it with its byte
/// length. `!` is matched before identifiers, identifiers before `*`, and
/// `&&`/`||` only as pairs, so multi-character tokens are never split and a
/// bare `*` is never absorbed into a name.
fn scan(input: &str) -> Option<(Token, usize)> {
    match input.chars().next()? {
        '!' => Some((Token::Bang, 1)),
        c if c.is_ascii_alphabetic() => {
            let len = input
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(input.len());
            Some((Token::Ident(input[..len].to_owned()), len))
        }
        '*' => Some((Token::Star, 1)),
        '"' => {
            // The closing quote is required; strings cannot embed quotes.
            let end = input[1..].find('"')?;
            Some((Token::Str(input[1..1 + end].to_owned()), end + 2))
        }
        ',' => Some((Token::Comma, 1)),
        '&' => input.starts_with("&&").then(|| (Token::And, 2)),
        '|' => input.starts_with("||").then(|| (Token::Or, 2)),
        '(' => Some((Token::LParen, 1)),
        ')' => Some((Token::RParen, 1)),
        _ => None,
    }
}
