use std::io::BufRead;

use anyhow::{bail, Context, Result};
use itertools::Itertools;
use rusqlite::Connection;
use tracing::debug;

use crate::ast::is_identifier;
use crate::compiler::Schema;

/// An in-memory database populated from delimited text, together with the
/// schema derived while loading it.
pub struct Database {
    conn: Connection,
    schema: Schema,
}

impl Database {
    /// Loads whitespace-delimited relation data. Each line is a relation
    /// name followed by one value per column; the first line mentioning a
    /// relation fixes its arity and creates a table with columns `_1_..=_n_`.
    /// Lines starting with `#` or `!` are skipped.
    pub fn load(input: impl BufRead) -> Result<Database> {
        let conn = Connection::open_in_memory()?;
        let mut schema = Schema::default();
        for line in input.lines() {
            let line = line?;
            let words = split_line(&line)?;
            let Some((relation, values)) = words.split_first() else {
                continue;
            };
            if relation.starts_with('#') || relation.starts_with('!') {
                continue;
            }
            if values.is_empty() {
                bail!("value(s) missing: {line}");
            }
            if !is_identifier(relation) {
                bail!("invalid relation name: {relation}");
            }
            let arity = schema.columns(relation).map(<[_]>::len);
            match arity {
                None => {
                    let columns: Vec<String> =
                        (1..=values.len()).map(|i| format!("_{i}_")).collect();
                    let sql = format!(
                        "CREATE TABLE {} ({})",
                        relation,
                        columns.iter().map(|c| format!("{c} VARCHAR NOT NULL")).join(", ")
                    );
                    debug!(%sql, "creating table");
                    conn.execute(&sql, [])?;
                    schema.add_table(relation.clone(), columns);
                }
                Some(n) if n != values.len() => bail!("wrong number of values: {line}"),
                Some(_) => {}
            }
            let sql = format!(
                "INSERT INTO {} VALUES ({})",
                relation,
                vec!["?"; values.len()].join(", ")
            );
            conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        }
        Ok(Database { conn, schema })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Runs a compiled query and collects every row as strings.
    pub fn run(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .context("failed to prepare generated SQL")?;
        let column_count = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                (0..column_count)
                    .map(|i| row.get(i))
                    .collect::<rusqlite::Result<Vec<String>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// Splits a data line into words. Double quotes group words and a backslash
/// escapes the character after it, inside or outside quotes.
pub fn split_line(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut escaped = false;
    let mut quoted = false;
    for c in line.chars() {
        if escaped {
            word.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            quoted = !quoted;
        } else if quoted || !c.is_whitespace() {
            word.push(c);
        } else if !word.is_empty() {
            words.push(std::mem::take(&mut word));
        }
    }
    if quoted || escaped {
        bail!("Unexpected end of line: {line}");
    }
    if !word.is_empty() {
        words.push(word);
    }
    Ok(words)
}

/// Renders a result row in the input format: backslashes and quotes
/// escaped, values with inner whitespace quoted, tab separated.
pub fn join_line(values: &[String]) -> String {
    values
        .iter()
        .map(|value| {
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
            if escaped.split_whitespace().nth(1).is_some() {
                format!("\"{escaped}\"")
            } else {
                escaped
            }
        })
        .join("\t")
}
