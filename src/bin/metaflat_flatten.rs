//! metaflat-flatten: Flatten nested records into a table
//!
//! Usage:
//!   # One record or an array of records from a file, rows to stdout
//!   metaflat-flatten --model user.model.json users.json
//!
//!   # NDJSON from stdin, with a header row of column names
//!   cat users.jsonl | metaflat-flatten --model user.model.json --ndjson --header
//!
//! Rows are written as JSON Lines, one JSON array of cells per row.

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use metaflat::{flatten_json, Flattener, MetadataNode, TableConfig, TableWriter};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "metaflat-flatten")]
#[command(about = "Flatten nested JSON records into a table described by a metadata model", long_about = None)]
struct Args {
    /// Metadata model describing the records
    #[arg(long, short = 'm')]
    model: String,

    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Process newline-delimited JSON (one record, or array of records, per line)
    #[arg(long)]
    ndjson: bool,

    /// Write the column names as the first row
    #[arg(long)]
    header: bool,

    /// JSON file with a table configuration (skip/add matchers, reposition)
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Keep columns in model order, ignoring FieldColumnPosition
    #[arg(long)]
    no_reposition: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let model = load_model(&args.model)?;
    let mut config = load_config(args.config.as_deref())?;
    if args.no_reposition {
        config.reposition = false;
    }

    let mut flattener = Flattener::from_config(&model, &config).context("Failed to prepare columns")?;

    let reader = if let Some(file_path) = &args.input {
        Box::new(BufReader::new(
            File::open(file_path).with_context(|| format!("Failed to open {}", file_path))?,
        )) as Box<dyn Read>
    } else {
        Box::new(std::io::stdin()) as Box<dyn Read>
    };

    let stdout = std::io::stdout();
    let mut writer = TableWriter::new(BufWriter::new(stdout.lock()));
    if args.header {
        writer.write_header(&flattener.columns().headers())?;
    }

    let rows = if args.ndjson {
        flatten_json(BufReader::new(reader), &mut writer, &mut flattener)?
    } else {
        process_document(reader, &mut writer, &mut flattener)?
    };

    writer.flush()?;
    tracing::info!(rows, "table written");
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

/// Flatten a single JSON document using SIMD-accelerated parsing, falling back to
/// line-by-line parsing for NDJSON or input simd-json rejects
fn process_document<W: std::io::Write>(
    mut reader: Box<dyn Read>,
    writer: &mut TableWriter<W>,
    flattener: &mut Flattener,
) -> Result<usize> {
    let mut content = Vec::new();
    reader.read_to_end(&mut content).context("Failed to read input")?;

    // simd-json parses in place, keep the original bytes for the fallback
    let mut scratch = content.clone();
    match simd_json::to_owned_value(&mut scratch) {
        Ok(document) => {
            let json_str = simd_json::to_string(&document)?;
            let value: Value = serde_json::from_str(&json_str)?;
            let rows = flattener.flatten(&value).context("Failed to flatten input")?;
            writer.write_rows(flattener.written_rows())?;
            Ok(rows)
        }
        Err(err) => {
            tracing::debug!(error = %err, "simd-json rejected input, parsing line by line");
            flatten_json(Cursor::new(content), writer, flattener)
        }
    }
}
