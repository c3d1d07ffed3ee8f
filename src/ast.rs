pub type Identifier = String;
pub type RelationName = Identifier;
pub type VariableName = Identifier;
pub type ColumnName = Identifier;

/// One argument position of a predicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    Variable(VariableName),
    Literal(String),
    Wildcard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negated,
}

/// One relation invocation, possibly negated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Atom {
    pub sign: Sign,
    pub relation: RelationName,
    pub args: Vec<Term>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conjunction {
    pub atoms: Vec<Atom>,
}

/// A parsed query: a disjunction of conjunctions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub disjuncts: Vec<Conjunction>,
}

/// Variable names are purely alphabetic. Relation names only need a leading
/// letter, so a name like `t1` can scan a relation but never bind a variable.
pub fn is_variable_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic())
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric())
}
