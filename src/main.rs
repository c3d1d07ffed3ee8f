use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use rustyline::{error::ReadlineError, Editor};
use tracing::debug;

use drql::ast::is_identifier;
use drql::loader::{join_line, Database};
use drql::{compile, parse_binding, parse_query, BoundVars};

/// Compile domain relational calculus queries to SQL and run them over
/// tab-delimited relations.
#[derive(Parser, Debug)]
#[command(name = "drql", version, about)]
struct Cli {
    /// Log the parsed query and the generated SQL
    #[arg(long)]
    debug: bool,

    /// Read relation data from this file instead of stdin
    #[arg(long, short)]
    file: Option<PathBuf>,

    /// Bind a query variable externally, e.g. -b L=proglang1
    #[arg(long = "bind", short = 'b', value_name = "VAR=VALUE")]
    bind: Vec<String>,

    /// Projected variables, comma or space separated, e.g. "S, SD"
    wants: Option<String>,

    /// The query, e.g. 'student(S, SD) && !registered(S, "proglang1")'
    query: Option<String>,
}

fn parse_wants(raw: &str) -> Result<Vec<String>> {
    let wants: Vec<String> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();
    if wants.is_empty() {
        bail!("no projected variables given");
    }
    for want in &wants {
        if !is_identifier(want) {
            bail!("invalid variable name: {want}");
        }
    }
    Ok(wants)
}

fn run_query(db: &Database, bound: &BoundVars, wants: &str, query: &str) -> Result<()> {
    let wants = parse_wants(wants)?;
    let query = parse_query(query)?;
    debug!(?query, "parsed query");
    let sql = compile(&query, db.schema(), bound, &wants)?;
    debug!(%sql, "generated SQL");
    for row in db.run(&sql)? {
        println!("{}", join_line(&row));
    }
    Ok(())
}

fn repl(db: &Database, bound: &BoundVars) -> Result<()> {
    let mut editor = Editor::<()>::new();
    loop {
        match editor.readline("drql> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line);
                match line.split_once(':') {
                    Some((wants, query)) => {
                        if let Err(e) = run_query(db, bound, wants, query) {
                            println!("Error: {e}");
                        }
                    }
                    None => println!("expected `<vars> : <query>`"),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {err}");
                break;
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_target(false)
        .init();

    let mut bound = BoundVars::new();
    for raw in &cli.bind {
        let (name, value) = parse_binding(raw)?;
        bound.insert(name, value);
    }

    let db = match &cli.file {
        Some(path) => Database::load(BufReader::new(File::open(path)?))?,
        // Without a data file the REPL has nowhere left to read data from.
        None if cli.query.is_some() => Database::load(io::stdin().lock())?,
        None => Database::load(io::empty())?,
    };

    match (&cli.wants, &cli.query) {
        (Some(wants), Some(query)) => run_query(&db, &bound, wants, query),
        (None, None) => repl(&db, &bound),
        _ => bail!("either give both <wants> and <query>, or neither for a REPL"),
    }
}
