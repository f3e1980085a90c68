//! Prism CLI: top-N color analysis for a list of image URLs.
//!
//! Reads a text file with one image URL per line, fetches and analyzes the
//! images concurrently, and writes one record per image with its most
//! prevalent colors.
//!
//! # Usage
//!
//! ```bash
//! # Three top colors per image, CSV to a file
//! prism --input urls.txt --output colors.csv -n 3
//!
//! # Tune the stage concurrency (downloads / analysis workers)
//! prism --input urls.txt -d 20 -w 8
//!
//! # JSONL to stdout
//! prism --input urls.txt --format jsonl
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use prism_core::{
    Config, HttpFetcher, LocationSource, OutputFormat, Pipeline, ResultWriter, StatsSnapshot,
};

mod logging;

/// Top-N color analysis for a list of image URLs.
#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File with one image URL per line
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_name = "csv|jsonl")]
    format: Option<String>,

    /// Count of most prevalent colors included per image
    #[arg(short = 'n', long = "top", value_name = "N")]
    top: Option<usize>,

    /// Number of downloads running simultaneously
    #[arg(short = 'd', long = "downloads", value_name = "D")]
    downloads: Option<usize>,

    /// Number of analysis workers running simultaneously (0 = CPU count - 1)
    #[arg(short = 'w', long = "workers", value_name = "W")]
    workers: Option<usize>,

    /// Config file path (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // An explicit --config that fails to load is fatal; a broken default
    // config file downgrades to a warning plus defaults.
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => match Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: Failed to load config: {e}\n  Using default configuration.");
                Config::default()
            }
        },
    };
    apply_overrides(&mut config, &cli);

    logging::init_from_config(&config, cli.verbose, cli.json_logs);
    tracing::debug!("Prism v{}", prism_core::VERSION);

    let format = resolve_format(&cli, &config)?;
    let source = LocationSource::from_path(&cli.input)?;
    let fetcher = Arc::new(HttpFetcher::from_config(&config.fetch, &config.limits)?);
    let pipeline = Pipeline::new(config.clone(), fetcher)?;

    let out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout()),
    };
    let mut writer = ResultWriter::new(out, format, config.analysis.top_n)?;

    // One token shared by the source and both stages; ctrl-c trips it.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, draining in-flight work");
                cancel.cancel();
            }
        });
    }

    tracing::info!(
        "Start processing (downloads: {}, workers: {}, top colors: {})",
        config.fetch.concurrency,
        config.analysis.concurrency,
        config.analysis.top_n
    );

    let start = Instant::now();
    let progress = create_progress();
    let locations = source.stream(config.pipeline.buffer_size, cancel.clone());
    let mut results = pipeline.run(locations, cancel);

    while let Some(result) = results.recv().await {
        writer.write(&result)?;
        let written = writer.items_written();
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            progress.set_message(format!(
                "{written} images · {:.1} img/sec",
                written as f64 / elapsed
            ));
        }
        progress.tick();
    }

    writer.flush()?;
    progress.finish_and_clear();

    let written = writer.items_written();
    print_summary(&pipeline.stats().snapshot(), written, start.elapsed());
    Ok(())
}

/// Fold CLI flags over the loaded config.
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(n) = cli.top {
        config.analysis.top_n = n;
    }
    if let Some(d) = cli.downloads {
        config.fetch.concurrency = d;
    }
    match cli.workers {
        Some(0) => config.analysis.concurrency = default_workers(),
        Some(w) => config.analysis.concurrency = w,
        None => {}
    }
}

/// Analysis workers when `-w 0` asks for auto: one less than the CPU count,
/// leaving a core for the fetch stage and the runtime, but never below 1.
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

fn resolve_format(cli: &Cli, config: &Config) -> anyhow::Result<OutputFormat> {
    let name = cli.format.as_deref().unwrap_or(&config.output.format);
    OutputFormat::parse(name)
        .ok_or_else(|| anyhow::anyhow!("unknown output format '{name}' (expected csv or jsonl)"))
}

/// Spinner on stderr; the total is unknown up front, so no bar.
fn create_progress() -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after the run.
fn print_summary(stats: &StatsSnapshot, written: usize, elapsed: std::time::Duration) {
    let rate = if elapsed.as_secs_f64() > 0.0 {
        written as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Analyzed:       {:>8}", stats.analyzed);
    if stats.fetch_failures > 0 {
        eprintln!("    Fetch failed:   {:>8}", stats.fetch_failures);
    }
    if stats.decode_failures > 0 {
        eprintln!("    Decode failed:  {:>8}", stats.decode_failures);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Written:        {:>8}", written);
    eprintln!("    Duration:       {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:           {:>7.1} img/sec", rate);
    eprintln!("  ====================================");
}
