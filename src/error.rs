//! Error types for the query compiler.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure is terminal for the query being compiled. No SQL is emitted
/// once any of these is raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("cannot lex query at: {0}")]
    Lex(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("No such table: {0}")]
    NoSuchTable(String),

    #[error("Table {table} has {expected} columns, but {queried} were queried")]
    Arity {
        table: String,
        expected: usize,
        queried: usize,
    },

    #[error("variable {0} not bound anywhere")]
    UnboundProjected(String),

    #[error("variable {0} not bound in any positive predicate")]
    Unbound(String),

    #[error("malformed binding {0:?}, expected VAR=VALUE")]
    BindingSyntax(String),
}
