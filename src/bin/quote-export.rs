//! quote-export CLI - runs the periodic quotation export
//!
//! ## Example Usage
//!
//! ```bash
//! # Run the scheduler, pulling batches from the configured fetch endpoint
//! quote-export --config export.toml run
//!
//! # Export one batch from a JSON file and exit
//! quote-export once --requests batch.json
//!
//! # Validate reference data and the code index
//! quote-export check
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use colored::Colorize;
use quote_export::config::ExportConfig;
use quote_export::export::{BatchSource, CycleOutcome, CycleReport, ExportScheduler, QueueSource};
use quote_export::reference::ReferenceStore;
use quote_export::types::Batch;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Instant;

/// quote-export: periodic currency quotation export
#[derive(Parser)]
#[command(name = "quote-export")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Periodic currency quotation export", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the export scheduler until interrupted
    Run,

    /// Export a single batch read from a JSON file
    Once {
        /// JSON list of requests: [{"moeda": "USD", "data_inicio": "...", "data_fim": "..."}]
        #[arg(short = 'r', long, value_name = "FILE")]
        requests: PathBuf,
    },

    /// Load reference data and the code index, then print statistics
    Check,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ExportConfig> {
    if let Some(config_path) = path {
        return ExportConfig::load(config_path)
            .with_context(|| format!("loading {}", config_path.display()));
    }

    // Try default location
    if let Some(home) = dirs::home_dir() {
        let default_config = home.join(".quote-export").join("config.toml");
        if default_config.exists() {
            return ExportConfig::load(&default_config)
                .with_context(|| format!("loading {}", default_config.display()));
        }
    }

    Ok(ExportConfig::default())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| {
        if cli.verbose {
            println!(
                "{} v{}",
                "quote-export".cyan().bold(),
                env!("CARGO_PKG_VERSION")
            );
            println!(
                "Output dir: {}",
                config.output_dir.display().to_string().dimmed()
            );
        }

        match cli.command {
            Commands::Run => run_scheduler(&config),
            Commands::Once { requests } => run_once(&config, &requests),
            Commands::Check => check(&config),
        }
    });

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

/// Reference data must be fully loaded before any scheduler exists
fn load_reference(config: &ExportConfig) -> anyhow::Result<Arc<ReferenceStore>> {
    let store = ReferenceStore::load(&config.calendar_path, &config.quotation_path)
        .context("loading reference data")?;
    Ok(Arc::new(store))
}

fn build_scheduler<S: BatchSource + 'static>(
    config: &ExportConfig,
    source: S,
    store: Arc<ReferenceStore>,
) -> anyhow::Result<ExportScheduler<S>> {
    Ok(ExportScheduler::new(
        source,
        store,
        Arc::new(config.code_index()?),
        config.report_writer()?,
        config.scheduler_config(),
    ))
}

#[cfg(feature = "http")]
fn run_scheduler(config: &ExportConfig) -> anyhow::Result<()> {
    let Some(fetch) = &config.fetch else {
        bail!("`run` needs a [fetch] url in the configuration; use `once` for local batches");
    };
    let store = load_reference(config)?;
    let source = quote_export::export::HttpBatchSource::new(&fetch.url, fetch.timeout())?;
    let scheduler = build_scheduler(config, source, store)?;
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;

    let scheduler_stats = scheduler.stats();

    runtime.block_on(async {
        let handle = scheduler.spawn();
        println!(
            "{} exporting every {}s from {} (Ctrl-C to stop)",
            "Running:".green().bold(),
            config.interval_secs,
            fetch.url
        );
        tokio::signal::ctrl_c()
            .await
            .context("waiting for shutdown signal")?;
        println!("{}", "Stopping after the current cycle...".yellow());
        handle.shutdown().await;
        let stats = scheduler_stats.snapshot();
        println!(
            "{} cycles, {} reports, {} rows",
            stats.cycles, stats.written, stats.rows
        );
        Ok::<(), anyhow::Error>(())
    })
}

#[cfg(not(feature = "http"))]
fn run_scheduler(_config: &ExportConfig) -> anyhow::Result<()> {
    bail!("`run` fetches batches over HTTP and requires the `http` feature")
}

fn run_once(config: &ExportConfig, requests: &Path) -> anyhow::Result<()> {
    let contents = fs::read_to_string(requests)
        .with_context(|| format!("reading {}", requests.display()))?;
    let batch: Batch = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {}", requests.display()))?;

    let store = load_reference(config)?;
    let queue = Arc::new(config.handoff_queue());
    queue.enqueue(batch);

    let scheduler = build_scheduler(config, QueueSource::new(queue), store)?;
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    let report = runtime.block_on(scheduler.tick());

    print_cycle(&report);
    if let CycleOutcome::Failed(reason) = &report.outcome {
        bail!("export failed: {}", reason);
    }
    Ok(())
}

fn print_cycle(report: &CycleReport) {
    println!("{}", "Cycle".cyan().bold());
    println!("  Id:        {}", report.id.to_string().dimmed());
    println!("  Requests:  {}", report.requests);
    println!("  Rows:      {}", report.rows);
    println!("  Elapsed:   {:.3}s", report.elapsed.as_secs_f64());
    for failure in &report.failures {
        println!(
            "  {} request {} ({}): {}",
            "Failed:".red(),
            failure.position,
            failure.currency_code,
            failure.error
        );
    }
    if report.skipped > 0 {
        println!("  {} {} request(s) not processed", "Skipped:".yellow(), report.skipped);
    }
    match &report.outcome {
        CycleOutcome::Written(path) => {
            println!("  {} {}", "Report:".green().bold(), path.display())
        }
        other => println!("  Outcome:   {}", other),
    }
}

fn check(config: &ExportConfig) -> anyhow::Result<()> {
    let start = Instant::now();
    let store = load_reference(config)?;
    let index = config.code_index()?;
    let stats = store.stats();

    println!("{}", "Reference data".cyan().bold());
    println!(
        "  Calendar:    {} rows, {} currencies ({})",
        stats.calendar_rows,
        stats.currencies,
        config.calendar_path.display()
    );
    println!(
        "  Quotations:  {} rows, {} series ({})",
        stats.quotation_rows,
        stats.series,
        config.quotation_path.display()
    );
    if let (Some(first), Some(last)) = (stats.first_date, stats.last_date) {
        println!("  Coverage:    {} to {}", first, last);
    }
    println!("  Code index:  {} currencies", index.len());
    println!(
        "  Loaded in {:.3}s",
        start.elapsed().as_secs_f64()
    );

    if index.is_empty() {
        println!(
            "{} no series codes configured; add a [series_codes] table",
            "Warning:".yellow()
        );
    }
    Ok(())
}
