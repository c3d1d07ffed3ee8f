use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

use crate::ast::{
    is_identifier, ColumnName, Conjunction, Query, RelationName, Sign, Term, VariableName,
};
use crate::error::{Error, Result};

/// Relation name to ordered column names. The compiler only reads it; the
/// loader (or any other catalog source) builds it.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    tables: IndexMap<RelationName, Vec<ColumnName>>,
}

impl Schema {
    pub fn add_table(&mut self, name: RelationName, columns: Vec<ColumnName>) {
        self.tables.insert(name, columns);
    }

    pub fn columns(&self, name: &str) -> Option<&[ColumnName]> {
        self.tables.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }
}

/// Externally supplied variable values. A variable present here compiles to
/// a value equality wherever it occurs, never to a join.
pub type BoundVars = HashMap<VariableName, String>;

/// Splits a command-line binding of the form `VAR=VALUE`. The name must be
/// identifier shaped; the value is taken verbatim, `=` included.
pub fn parse_binding(raw: &str) -> Result<(VariableName, String)> {
    match raw.split_once('=') {
        Some((name, value)) if is_identifier(name) => Ok((name.to_owned(), value.to_owned())),
        _ => Err(Error::BindingSyntax(raw.to_owned())),
    }
}

/// One column of an aliased scan, e.g. `student_0._1_`.
#[derive(Clone, Debug, PartialEq, Eq)]
struct ColumnRef {
    alias: String,
    column: ColumnName,
}

impl ColumnRef {
    fn to_sql(&self) -> String {
        format!("{}.{}", self.alias, self.column)
    }
}

#[derive(Clone, Debug)]
enum Value {
    Column(ColumnRef),
    Literal(String),
}

impl Value {
    fn to_sql(&self) -> String {
        match self {
            Value::Column(column) => column.to_sql(),
            Value::Literal(value) => quote(value),
        }
    }
}

#[derive(Clone, Debug)]
struct Condition {
    lhs: ColumnRef,
    rhs: Value,
}

impl Condition {
    fn to_sql(&self) -> String {
        format!("{} = {}", self.lhs.to_sql(), self.rhs.to_sql())
    }
}

#[derive(Clone, Debug)]
struct Scan {
    relation: RelationName,
    alias: String,
}

/// The anti-join for one negated atom.
#[derive(Clone, Debug)]
struct NotExists {
    scan: Scan,
    conditions: Vec<Condition>,
}

/// One SELECT, compiled from one conjunction.
#[derive(Clone, Debug)]
struct Select {
    projection: Vec<(ColumnRef, VariableName)>,
    scans: Vec<Scan>,
    conditions: Vec<Condition>,
    anti_joins: Vec<NotExists>,
}

impl Select {
    fn to_sql(&self) -> String {
        let mut s = String::from("SELECT DISTINCT");
        s.push_str(
            &self
                .projection
                .iter()
                .map(|(column, name)| format!("\n\t{} AS {}", column.to_sql(), name))
                .join(","),
        );
        s.push_str("\nFROM");
        s.push_str(
            &self
                .scans
                .iter()
                .map(|scan| format!("\n\t{} {}", scan.relation, scan.alias))
                .join(","),
        );
        s.push_str("\nWHERE 1");
        for condition in &self.conditions {
            s.push_str(&format!("\n\tAND {}", condition.to_sql()));
        }
        for anti in &self.anti_joins {
            s.push_str(&format!(
                "\n\tAND NOT EXISTS (SELECT 1 FROM {} {} WHERE 1",
                anti.scan.relation, anti.scan.alias
            ));
            for condition in &anti.conditions {
                s.push_str(&format!("\n\t\tAND {}", condition.to_sql()));
            }
            s.push_str("\n\t)");
        }
        s
    }
}

/// SQL string literal. Backslashes are doubled before quotes are escaped;
/// that order is load-bearing.
pub(crate) fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Compiles a parsed query against `schema` into a single SQL statement
/// projecting `wants`, with externally bound variables taken from `bound`.
/// Each conjunction becomes one SELECT; the SELECTs are joined by UNION and
/// ordered by the projected variables.
pub fn compile(
    query: &Query,
    schema: &Schema,
    bound: &BoundVars,
    wants: &[VariableName],
) -> Result<String> {
    assert!(!wants.is_empty());
    let selects = query
        .disjuncts
        .iter()
        .map(|conjunction| Ok(compile_conjunction(conjunction, schema, bound, wants)?.to_sql()))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!(
        "{}\nORDER BY {} ASC",
        selects.join("\nUNION\n"),
        wants.iter().join(", ")
    ))
}

fn compile_conjunction(
    conjunction: &Conjunction,
    schema: &Schema,
    bound: &BoundVars,
    wants: &[VariableName],
) -> Result<Select> {
    let mut headers = Vec::with_capacity(conjunction.atoms.len());
    for atom in &conjunction.atoms {
        let columns = schema
            .columns(&atom.relation)
            .ok_or_else(|| Error::NoSuchTable(atom.relation.clone()))?;
        if atom.args.len() != columns.len() {
            return Err(Error::Arity {
                table: atom.relation.clone(),
                expected: columns.len(),
                queried: atom.args.len(),
            });
        }
        headers.push(columns);
    }

    // Aliases number every atom in source order, negated ones included, so
    // two scans of the same relation stay distinct.
    let aliases: Vec<String> = conjunction
        .atoms
        .iter()
        .enumerate()
        .map(|(i, atom)| format!("{}_{}", atom.relation, i))
        .collect();

    let mut variables = IndexSet::new();
    for atom in &conjunction.atoms {
        for term in &atom.args {
            if let Term::Variable(name) = term {
                variables.insert(name.clone());
            }
        }
    }

    // Positive pass. A variable's binding site is its first positive
    // occurrence; externally bound variables become value equalities and
    // never join, so they get a binding site but no occurrence group.
    let mut scans = Vec::new();
    let mut conditions = Vec::new();
    let mut binding_sites: IndexMap<VariableName, ColumnRef> = IndexMap::new();
    let mut occurrences: IndexMap<VariableName, Vec<ColumnRef>> = IndexMap::new();
    for ((atom, alias), columns) in conjunction.atoms.iter().zip(&aliases).zip(&headers) {
        if atom.sign == Sign::Negated {
            continue;
        }
        scans.push(Scan {
            relation: atom.relation.clone(),
            alias: alias.clone(),
        });
        for (term, column) in atom.args.iter().zip(columns.iter()) {
            let site = ColumnRef {
                alias: alias.clone(),
                column: column.clone(),
            };
            match term {
                Term::Literal(value) => conditions.push(Condition {
                    lhs: site,
                    rhs: Value::Literal(value.clone()),
                }),
                Term::Variable(name) => {
                    binding_sites
                        .entry(name.clone())
                        .or_insert_with(|| site.clone());
                    if let Some(value) = bound.get(name) {
                        conditions.push(Condition {
                            lhs: site,
                            rhs: Value::Literal(value.clone()),
                        });
                    } else {
                        occurrences.entry(name.clone()).or_default().push(site);
                    }
                }
                Term::Wildcard => {}
            }
        }
    }

    for want in wants {
        if !variables.contains(want.as_str()) {
            return Err(Error::UnboundProjected(want.clone()));
        }
    }
    for variable in &variables {
        if !binding_sites.contains_key(variable) && !bound.contains_key(variable) {
            return Err(Error::Unbound(variable.clone()));
        }
    }

    // A projected variable must name a binding site; an external binding
    // alone cannot be projected.
    let projection = wants
        .iter()
        .map(|want| {
            let site = binding_sites
                .get(want)
                .cloned()
                .ok_or_else(|| Error::Unbound(want.clone()))?;
            Ok((site, want.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    // Repeated positive occurrences all join back to the binding site.
    for sites in occurrences.values() {
        for other in &sites[1..] {
            conditions.push(Condition {
                lhs: sites[0].clone(),
                rhs: Value::Column(other.clone()),
            });
        }
    }

    // Negated atoms lower last: the unbound check above guarantees every
    // variable reaching this point resolves to a site or an external value.
    let mut anti_joins = Vec::new();
    for ((atom, alias), columns) in conjunction.atoms.iter().zip(&aliases).zip(&headers) {
        if atom.sign == Sign::Positive {
            continue;
        }
        let mut inner = Vec::new();
        for (term, column) in atom.args.iter().zip(columns.iter()) {
            let lhs = ColumnRef {
                alias: alias.clone(),
                column: column.clone(),
            };
            match term {
                Term::Literal(value) => inner.push(Condition {
                    lhs,
                    rhs: Value::Literal(value.clone()),
                }),
                Term::Variable(name) => {
                    if let Some(value) = bound.get(name) {
                        inner.push(Condition {
                            lhs,
                            rhs: Value::Literal(value.clone()),
                        });
                    } else {
                        inner.push(Condition {
                            lhs,
                            rhs: Value::Column(binding_sites[name.as_str()].clone()),
                        });
                    }
                }
                Term::Wildcard => {}
            }
        }
        anti_joins.push(NotExists {
            scan: Scan {
                relation: atom.relation.clone(),
                alias: alias.clone(),
            },
            conditions: inner,
        });
    }

    Ok(Select {
        projection,
        scans,
        conditions,
        anti_joins,
    })
}
