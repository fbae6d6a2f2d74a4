//! CLI tool for extracting validated analytics records from marketing decks.

use anyhow::{Context, Result};
use clap::Parser;
use deck_core::{Config, ExtractedRecord};
use deck_pipeline::{BatchRunner, FileReport, JsonDirCache, ProcessOutput};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configuration used when `--config` is not given.
const BUNDLED_CONFIG: &str = include_str!("../../../config/dashboard_config.yaml");

/// Extract dashboard records from marketing slide decks.
#[derive(Parser, Debug)]
#[command(name = "deck-extract")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input deck file(s) (.pptx, .pptm or .ppt)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Dashboard configuration (YAML). Defaults to the bundled configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory (default: same as each input file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Cache processed decks as JSON in this directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Print the batch result as JSON to stdout instead of writing files
    #[arg(short, long)]
    print: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Batch summary written next to the record files.
#[derive(Serialize)]
struct Summary<'a> {
    metrics: &'a deck_core::ProcessingMetrics,
    diagnostics: &'a [deck_core::Diagnostic],
    files: &'a [FileReport],
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => Config::from_yaml_str(BUNDLED_CONFIG).context("Bundled configuration is invalid")?,
    };

    let mut runner = BatchRunner::new(Arc::new(config));
    if let Some(dir) = &args.cache_dir {
        let cache = JsonDirCache::open(dir)
            .with_context(|| format!("Failed to open cache directory {}", dir.display()))?;
        runner = runner.with_cache(Arc::new(cache));
    }

    let output = runner.run(&args.input);

    if args.print {
        let json = serde_json::to_string_pretty(&output)?;
        println!("{}", json);
    } else {
        write_outputs(&output, args.output.as_deref(), args.verbose)?;
    }

    print_summary(&output);
    Ok(())
}

/// Write one `<stem>.records.json` per deck plus `batch.metrics.json`.
fn write_outputs(output: &ProcessOutput, output_dir: Option<&Path>, verbose: bool) -> Result<()> {
    let mut remaining: &[ExtractedRecord] = &output.records;
    for report in &output.files {
        let (records, rest) = remaining.split_at(report.records.min(remaining.len()));
        remaining = rest;
        if report.records == 0 {
            continue;
        }

        let path = get_output_path(&report.path, output_dir, "records.json")?;
        write_json(&path, &records)?;
        if verbose {
            eprintln!("Written to: {}", path.display());
        }
    }

    let summary_anchor = output
        .files
        .first()
        .map(|f| f.path.with_file_name("batch"))
        .unwrap_or_else(|| PathBuf::from("batch"));
    let summary_path = get_output_path(&summary_anchor, output_dir, "metrics.json")?;
    write_json(
        &summary_path,
        &Summary {
            metrics: &output.metrics,
            diagnostics: &output.diagnostics,
            files: &output.files,
        },
    )?;
    if verbose {
        eprintln!("Written to: {}", summary_path.display());
    }
    Ok(())
}

/// `<dir>/<stem>.<suffix>`, where `dir` is the output directory or the
/// input's own directory.
fn get_output_path(input_path: &Path, output_dir: Option<&Path>, suffix: &str) -> Result<PathBuf> {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let output_filename = format!("{}.{}", stem, suffix);

    let output_path = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            dir.join(output_filename)
        }
        None => match input_path.parent() {
            Some(parent) => parent.join(output_filename),
            None => PathBuf::from(output_filename),
        },
    };
    Ok(output_path)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(&json)
        .with_context(|| format!("Failed to write to {}", path.display()))?;
    Ok(())
}

fn print_summary(output: &ProcessOutput) {
    let m = &output.metrics;
    eprintln!(
        "{} files ({} failed, {} cached), {} slides ({} failed), {} records: {} valid, {} invalid, {} with warnings",
        m.total_files,
        m.failed_files,
        m.cache_hits,
        m.total_slides,
        m.failed_slides,
        m.extracted_records,
        m.valid_records,
        m.invalid_records,
        m.warning_records
    );
    for diagnostic in &output.diagnostics {
        match diagnostic.slide_number {
            Some(slide) => eprintln!(
                "  {} slide {}: {}",
                diagnostic.source_file, slide, diagnostic.message
            ),
            None => eprintln!("  {}: {}", diagnostic.source_file, diagnostic.message),
        }
    }
}
