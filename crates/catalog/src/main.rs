use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use catalog_core::config::PipelineConfig;
use catalog_core::io::{CsvDirectorySink, CsvTableSource, TableSource};
use catalog_core::pipeline::{self, RunReport};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::Table as ComfyTable;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Product catalog data-quality pipeline", long_about = None)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean, flag and classify the raw catalog, then write every output
    Run(RunArgs),
    /// Load the raw catalog and verify its columns without processing it
    Check(CheckArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Raw products CSV (overrides config and CATALOG_INPUT)
    #[arg(long)]
    input: Option<PathBuf>,
    /// Directory receiving the output CSVs (overrides config and CATALOG_OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Run every stage but skip writing outputs
    #[arg(long)]
    dry_run: bool,
    /// Print the run report as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Default)]
struct CheckArgs {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Raw products CSV (overrides config and CATALOG_INPUT)
    #[arg(long)]
    input: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Check(args) => handle_check(args),
    }
}

fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config from '{}'", path.display()))?,
        None => PipelineConfig::default(),
    };
    Ok(config.with_env_overrides())
}

fn source_for(config: &PipelineConfig) -> CsvTableSource {
    CsvTableSource::new(&config.input).with_null_tokens(config.null_tokens.clone())
}

fn handle_run(args: RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(input) = args.input {
        config.input = input;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    config.validate().context("invalid pipeline configuration")?;

    let source = source_for(&config);
    let raw = source
        .load()
        .with_context(|| format!("failed to ingest '{}'", config.input.display()))?;

    let outputs = pipeline::run(&raw, &config).context("pipeline run failed")?;

    if args.dry_run {
        warn!("Dry run: outputs were not written");
    } else {
        let sink = CsvDirectorySink::new(&config.output_dir);
        pipeline::persist(&outputs, &sink).with_context(|| {
            format!(
                "failed to write outputs to '{}'",
                config.output_dir.display()
            )
        })?;
        info!(output_dir = %config.output_dir.display(), "Outputs written");
    }

    let report = outputs.report();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn handle_check(args: CheckArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(input) = args.input {
        config.input = input;
    }

    let table = source_for(&config)
        .load()
        .with_context(|| format!("failed to ingest '{}'", config.input.display()))?;

    println!(
        "{}: {} products, {} columns",
        config.input.display(),
        table.height(),
        table.width()
    );
    Ok(())
}

fn print_report(report: &RunReport) {
    let mut counts = ComfyTable::new();
    counts.set_header(vec!["Output", "Rows"]);
    counts.add_row(vec!["ingested".to_string(), report.counts.ingested.to_string()]);
    counts.add_row(vec!["review".to_string(), report.counts.review.to_string()]);
    counts.add_row(vec!["rejected".to_string(), report.counts.rejected.to_string()]);
    counts.add_row(vec!["valid".to_string(), report.counts.valid.to_string()]);
    println!("{counts}");

    let summary = &report.summary;
    let mut stats = ComfyTable::new();
    stats.set_header(vec!["Metric", "Clean", "Valid"]);
    stats.add_row(vec![
        "products with id".to_string(),
        summary.total_products_clean.to_string(),
        summary.total_products_valid.to_string(),
    ]);
    stats.add_row(vec![
        "median price".to_string(),
        format_price(summary.median_price_clean),
        format_price(summary.median_price_valid),
    ]);
    stats.add_row(vec![
        "mean price".to_string(),
        format_price(summary.mean_price_clean),
        format_price(summary.mean_price_valid),
    ]);
    stats.add_row(vec![
        "missing price".to_string(),
        summary.missing_price.to_string(),
        "-".to_string(),
    ]);
    println!("{stats}");

    let mut discrepancies = ComfyTable::new();
    discrepancies.set_header(vec!["Rank", "Most expensive", "Price", "Discrepancy", "Price"]);
    let analysis = &report.price_analysis;
    let rows = analysis
        .most_expensive
        .len()
        .max(analysis.discrepancies.len());
    for rank in 0..rows {
        let top = analysis.most_expensive.get(rank);
        let gap = analysis.discrepancies.get(rank);
        discrepancies.add_row(vec![
            (rank + 1).to_string(),
            top.and_then(|p| p.id.clone()).unwrap_or_default(),
            format_price(top.and_then(|p| p.price)),
            gap.and_then(|p| p.id.clone()).unwrap_or_default(),
            format_price(gap.and_then(|p| p.price)),
        ]);
    }
    println!("{discrepancies}");
}

fn format_price(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |price| format!("{price:.2}"))
}
