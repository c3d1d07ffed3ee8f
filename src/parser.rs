use crate::ast::{is_variable_name, Atom, Conjunction, Query, Sign, Term};
use crate::error::{Error, Result};
use crate::lexer::{lex, Token};

/// LL(1) cursor over the lexed tokens. The grammar decides every production
/// on a single token of lookahead, so there is no backtracking to support.
struct Tokens {
    items: Vec<Token>,
    pos: usize,
}

impl Tokens {
    fn new(items: Vec<Token>) -> Self {
        Tokens { items, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.items.get(self.pos)
    }

    fn next(&mut self) -> Result<Token> {
        let token = self
            .items
            .get(self.pos)
            .cloned()
            .ok_or_else(|| Error::Parse("unexpected end of query".to_owned()))?;
        self.pos += 1;
        Ok(token)
    }

    /// Consumes the next token if it equals `token`.
    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        match self.next()? {
            ref token if token == expected => Ok(()),
            token => Err(Error::Parse(format!(
                "expected `{}`, found `{}`",
                expected, token
            ))),
        }
    }
}

/// Lexes and parses a full query. Anything left over after the last
/// conjunction is an error.
pub fn parse_query(input: &str) -> Result<Query> {
    let mut tokens = Tokens::new(lex(input)?);
    let query = query(&mut tokens)?;
    if let Some(token) = tokens.peek() {
        return Err(Error::Parse(format!("trailing input at `{}`", token)));
    }
    Ok(query)
}

fn query(tokens: &mut Tokens) -> Result<Query> {
    let mut disjuncts = vec![conjunction(tokens)?];
    while tokens.eat(&Token::Or) {
        disjuncts.push(conjunction(tokens)?);
    }
    Ok(Query { disjuncts })
}

fn conjunction(tokens: &mut Tokens) -> Result<Conjunction> {
    let mut atoms = vec![predicate(tokens)?];
    while tokens.eat(&Token::And) {
        atoms.push(predicate(tokens)?);
    }
    Ok(Conjunction { atoms })
}

fn predicate(tokens: &mut Tokens) -> Result<Atom> {
    let sign = if tokens.eat(&Token::Bang) {
        Sign::Negated
    } else {
        Sign::Positive
    };
    let relation = match tokens.next()? {
        Token::Ident(name) => name,
        token => {
            return Err(Error::Parse(format!(
                "expected relation name, found `{}`",
                token
            )))
        }
    };
    tokens.expect(&Token::LParen)?;
    let mut args = vec![arg(tokens)?];
    while tokens.eat(&Token::Comma) {
        args.push(arg(tokens)?);
    }
    tokens.expect(&Token::RParen)?;
    Ok(Atom {
        sign,
        relation,
        args,
    })
}

fn arg(tokens: &mut Tokens) -> Result<Term> {
    match tokens.next()? {
        Token::Ident(name) if is_variable_name(&name) => Ok(Term::Variable(name)),
        // An identifier with a digit can name a relation but never a
        // variable, so in argument position it denotes its own text.
        Token::Ident(name) => Ok(Term::Literal(name)),
        Token::Str(value) => Ok(Term::Literal(value)),
        Token::Star => Ok(Term::Wildcard),
        token => Err(Error::Parse(format!(
            "expected argument, found `{}`",
            token
        ))),
    }
}
