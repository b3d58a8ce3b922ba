//! metaflat-unflatten: Rebuild nested records from a table
//!
//! Usage:
//!   # JSON Lines rows (as written by metaflat-flatten) to a JSON array of records
//!   metaflat-unflatten --model user.model.json rows.jsonl
//!
//!   # Rows with a header line, from stdin
//!   metaflat-flatten -m user.model.json --header users.json | metaflat-unflatten -m user.model.json --header

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use metaflat::{FlattenedRow, MetadataNode, TableConfig, Unflattener};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "metaflat-unflatten")]
#[command(about = "Rebuild nested JSON records from a table described by a metadata model", long_about = None)]
struct Args {
    /// Metadata model describing the records
    #[arg(long, short = 'm')]
    model: String,

    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// The first row holds column names
    #[arg(long)]
    header: bool,

    /// JSON file with a table configuration; must match the one used to flatten
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Separator between key values when matching rows to records
    #[arg(long)]
    join_symbol: Option<char>,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let model = load_model(&args.model)?;
    let mut config = load_config(args.config.as_deref())?;
    if let Some(symbol) = args.join_symbol {
        config.join_symbol = symbol;
    }

    let mut unflattener = Unflattener::from_config(&model, &config).context("Failed to prepare columns")?;

    let mut reader = if let Some(file_path) = &args.input {
        Box::new(BufReader::new(
            File::open(file_path).with_context(|| format!("Failed to open {}", file_path))?,
        )) as Box<dyn Read>
    } else {
        Box::new(std::io::stdin()) as Box<dyn Read>
    };
    let mut content = Vec::new();
    reader.read_to_end(&mut content).context("Failed to read input")?;

    let rows = unflatten_content(content, args.header, &mut unflattener)?;
    tracing::info!(rows, "rows merged");

    let records = unflattener.into_destination();
    let output = if args.compact {
        serde_json::to_string(&records)?
    } else {
        serde_json::to_string_pretty(&records)?
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", output).context("Failed to write output")?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn load_model(path: &str) -> Result<MetadataNode> {
    let file = File::open(path).with_context(|| format!("Failed to open model {}", path))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse model {}", path))?;
    MetadataNode::from_value(&value).with_context(|| format!("Invalid metadata model {}", path))
}

fn load_config(path: Option<&str>) -> Result<TableConfig> {
    let Some(path) = path else {
        return Ok(TableConfig::default());
    };
    let file = File::open(path).with_context(|| format!("Failed to open config {}", path))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("Failed to parse config {}", path))
}

/// Parse JSON Lines rows, each with simd-json first and serde_json as the fallback
fn unflatten_content(content: Vec<u8>, header: bool, unflattener: &mut Unflattener) -> Result<usize> {
    let text = String::from_utf8(content).context("Input is not UTF-8")?;
    let mut rows = Vec::new();

    for (number, line) in text.lines().enumerate().skip(usize::from(header)) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut bytes = line.as_bytes().to_vec();
        let row: FlattenedRow = match simd_json::serde::from_slice(&mut bytes) {
            Ok(row) => row,
            Err(_) => serde_json::from_str(line)
                .with_context(|| format!("Line {} is not a JSON array of cells", number + 1))?,
        };
        rows.push(row);
    }

    unflattener.unflatten(&rows).context("Failed to unflatten rows")?;
    Ok(rows.len())
}
