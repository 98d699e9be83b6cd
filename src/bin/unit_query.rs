// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Command-line interface for running queries against unit files

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::process;
use std::sync::Arc;
use unit_query::ast::parameters;
use unit_query::query::LimitQuery;
use unit_query::{EngineConfig, Parameters, Query, QueryEngine, Queryable, UnitCollection, Value};

#[derive(Parser)]
#[command(name = "unit-query")]
#[command(about = "Evaluate queries against collections of installable units")]
#[command(version)]
#[command(author = "OctoFHIR Team <funyloony@gmail.com>")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a query against a JSON array of units
    Eval {
        /// Query text
        query: String,
        /// JSON file containing units (reads from stdin if not provided)
        #[arg(short, long)]
        file: Option<String>,
        /// Treat the query as a per-unit predicate
        #[arg(short = 'm', long)]
        predicate: bool,
        /// Positional parameter ($0, $1, ...)
        #[arg(short, long = "param")]
        params: Vec<String>,
        /// Keyed parameter as name=value ($name)
        #[arg(short, long = "key")]
        keys: Vec<String>,
        /// Return at most this many elements
        #[arg(short, long)]
        limit: Option<usize>,
        /// JSON file with engine configuration
        #[arg(long)]
        config: Option<String>,
        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Parse a query and print its canonical form
    Parse {
        /// Query text
        query: String,
        /// Parse as a per-unit predicate
        #[arg(short = 'm', long)]
        predicate: bool,
    },
}

fn main() {
    human_panic::setup_panic!();
    env_logger::init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Eval {
            query,
            file,
            predicate,
            params,
            keys,
            limit,
            config,
            pretty,
        } => handle_eval(&EvalArgs {
            query: &query,
            file: file.as_deref(),
            predicate,
            params: &params,
            keys: &keys,
            limit,
            config: config.as_deref(),
            pretty,
        }),
        Commands::Parse { query, predicate } => handle_parse(&query, predicate),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

struct EvalArgs<'a> {
    query: &'a str,
    file: Option<&'a str>,
    predicate: bool,
    params: &'a [String],
    keys: &'a [String],
    limit: Option<usize>,
    config: Option<&'a str>,
    pretty: bool,
}

fn handle_eval(args: &EvalArgs<'_>) -> Result<()> {
    let config = match args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading config '{path}'"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config '{path}'"))?
        }
        None => EngineConfig::default(),
    };

    let units = match args.file {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading units '{path}'"))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).context("reading units from stdin")?;
            buffer
        }
    };
    let collection = UnitCollection::from_json(&units).context("parsing units")?;
    log::debug!("loaded {} units", collection.len());

    let parameters = parameters_from_args(args.params, args.keys)?;
    let engine = QueryEngine::with_config(config);
    let mut query: Arc<dyn Query> = if args.predicate {
        Arc::new(engine.match_query(args.query, parameters)?)
    } else {
        Arc::new(engine.context_query(args.query, parameters)?)
    };
    if let Some(limit) = args.limit {
        query = LimitQuery::create(query, limit);
    }

    let result = collection.query(query.as_ref(), None)?;
    let values = result
        .to_vec()?
        .iter()
        .map(Value::to_json)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let output = if args.pretty {
        serde_json::to_string_pretty(&values)?
    } else {
        serde_json::to_string(&values)?
    };
    println!("{output}");
    Ok(())
}

fn handle_parse(text: &str, predicate: bool) -> Result<()> {
    let engine = QueryEngine::new();
    let expression = if predicate {
        engine.parse_predicate(text)?
    } else {
        engine.parse_query(text)?
    };
    println!("{expression}");
    let referenced = parameters(&expression);
    if !referenced.is_empty() {
        let names: Vec<String> = referenced.iter().map(ToString::to_string).collect();
        println!("Parameters: {}", names.join(", "));
    }
    Ok(())
}

fn parameters_from_args(params: &[String], keys: &[String]) -> Result<Parameters> {
    let mut parameters = Parameters::positional(params.iter().map(|p| parse_argument(p)).collect());
    for entry in keys {
        let Some((name, value)) = entry.split_once('=') else {
            bail!("keyed parameter '{entry}' must be name=value");
        };
        parameters = parameters.with(name, parse_argument(value));
    }
    Ok(parameters)
}

/// Integers and booleans are typed; everything else is a string
fn parse_argument(text: &str) -> Value {
    if let Ok(integer) = text.parse::<i64>() {
        return Value::Integer(integer);
    }
    match text {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        "null" => Value::Null,
        _ => Value::from(text),
    }
}
