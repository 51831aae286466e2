//! jpegtrim CLI - Batch JPEG Resizer
//!
//! Resizes every JPEG in a directory to a target width with a bounded number
//! of concurrent workers, then prints how much space was saved.

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use console::style;
use tracing::warn;

use jpegtrim::{init_logging, run_with_cancel, BatchReport, LoggingConfig, OutputMode, RunConfig};

/// Exit status for usage and configuration errors
const EXIT_USAGE: i32 = 2;

/// jpegtrim - Batch JPEG Resizer
#[derive(Parser, Debug)]
#[command(
    name = "jpegtrim",
    version,
    about = "Resize all JPEG images in a directory to a given width",
    long_about = "jpegtrim resizes every .jpg/.jpeg file in a directory (optionally recursively) \
                  to the given width, preserving aspect ratio, using a fixed number of parallel \
                  workers. Outputs are written next to the originals with a suffix, or replace \
                  them with --overwrite. Images already narrower than the width are left alone \
                  unless --force is given."
)]
struct Cli {
    /// Directory with images (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    input: Option<PathBuf>,

    /// New image width in pixels (required)
    #[arg(short, long, visible_alias = "maxwidth", value_name = "PIXELS")]
    width: Option<u32>,

    /// Overwrite the input files
    #[arg(short = 'r', long, visible_alias = "rw")]
    overwrite: bool,

    /// Process subdirectories recursively
    #[arg(short = 'R', long)]
    recursive: bool,

    /// Give output files the current date instead of the original one
    #[arg(long = "newdate")]
    new_date: bool,

    /// Output quality (1-100)
    #[arg(short, long, default_value_t = jpegtrim::config::DEFAULT_QUALITY, value_name = "QUALITY")]
    quality: u8,

    /// Number of parallel workers
    #[arg(short, long, default_value_t = jpegtrim::config::DEFAULT_THREADS, value_name = "COUNT")]
    threads: usize,

    /// Suffix added before the extension of output files
    #[arg(long, default_value = jpegtrim::config::DEFAULT_SUFFIX, value_name = "SUFFIX")]
    suffix: String,

    /// Also resize images that are already narrower than the width
    #[arg(long)]
    force: bool,

    /// Show what would be processed without actually processing
    #[arg(long)]
    dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Width is the one required parameter; without it there is nothing to do
    let Some(width) = cli.width.filter(|w| *w > 0) else {
        let _ = Cli::command().print_help();
        println!();
        process::exit(EXIT_USAGE);
    };

    let config = match build_config(&cli, width) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            process::exit(1);
        }
    };

    init_logging(&config.logging);

    if let Err(e) = config.validate() {
        eprintln!("{}: {}", style("Error").red().bold(), e.user_message());
        process::exit(EXIT_USAGE);
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = Arc::clone(&cancelled);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted: finishing files in progress, skipping the rest");
                cancelled.store(true, Ordering::SeqCst);
            }
        });
    }

    match run_with_cancel(&config, cancelled).await {
        Ok(report) => {
            let printed = match (config.dry_run, config.output) {
                (true, OutputMode::Json) => print_dry_run_json(&report),
                (true, OutputMode::Human) => {
                    print_dry_run(&report);
                    Ok(())
                }
                (false, OutputMode::Json) => print_summary_json(&report),
                (false, OutputMode::Human) => {
                    print_summary(&report);
                    Ok(())
                }
            };
            if let Err(e) = printed {
                eprintln!("{}: {:#}", style("Error").red().bold(), e);
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{}: {}", style("Error").red().bold(), e.user_message());
            let code = if e.is_recoverable() { 1 } else { EXIT_USAGE };
            process::exit(code);
        }
    }
}

/// Create the run configuration from CLI arguments
fn build_config(cli: &Cli, width: u32) -> anyhow::Result<RunConfig> {
    let input_dir = match &cli.input {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine the current directory")?,
    };

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    let output = if cli.json { OutputMode::Json } else { OutputMode::Human };

    Ok(RunConfig {
        input_dir,
        width,
        quality: cli.quality,
        overwrite: cli.overwrite,
        recursive: cli.recursive,
        new_date: cli.new_date,
        threads: cli.threads,
        suffix: cli.suffix.clone(),
        force: cli.force,
        dry_run: cli.dry_run,
        show_progress: !cli.quiet && output == OutputMode::Human,
        output,
        logging: LoggingConfig {
            level: level.to_string(),
        },
    })
}

/// Print processing summary
fn print_summary(report: &BatchReport) {
    let stats = &report.statistics;

    println!();
    println!("{}", style("Statistics:").bold());
    println!("  {}: {}", style("Processed files").green(), stats.processed);
    if stats.skipped > 0 {
        println!("  {}: {}", style("Skipped (already narrow)").yellow(), stats.skipped);
    }
    if stats.failed > 0 {
        println!("  {}: {}", style("Failed").red(), stats.failed);
    }
    if stats.cancelled > 0 {
        println!("  {}: {}", style("Cancelled").red(), stats.cancelled);
    }
    if report.unreadable_paths > 0 {
        println!("  {}: {}", style("Unreadable paths").red(), report.unreadable_paths);
    }
    println!("  {}: {:.2} MB", style("Total input size").cyan(), stats.input_mb());
    println!("  {}: {:.2} MB", style("Total output size").cyan(), stats.output_mb());
    println!(
        "  {}: {:.2} MB, {:.2}%",
        style("Total size reduction").cyan(),
        stats.saved_mb(),
        stats.reduction_percent()
    );
    println!("  {}: {:.2}s", style("Duration").blue(), stats.elapsed.as_secs_f64());
    println!("Processing complete.");
}

fn print_summary_json(report: &BatchReport) -> anyhow::Result<()> {
    let stats = &report.statistics;
    let value = serde_json::json!({
        "statistics": stats,
        "unreadable_paths": report.unreadable_paths,
        "saved_bytes": stats.saved_bytes() as i64,
        "reduction_percent": stats.reduction_percent(),
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_dry_run(report: &BatchReport) {
    let total: u64 = report.files.iter().map(|f| f.size).sum();
    println!(
        "{} files would be processed ({:.2} MB):",
        style(report.files.len()).bold(),
        total as f64 / 1024.0 / 1024.0
    );
    for file in &report.files {
        println!("  {}", file.path.display());
    }
}

fn print_dry_run_json(report: &BatchReport) -> anyhow::Result<()> {
    let files: Vec<_> = report
        .files
        .iter()
        .map(|f| serde_json::json!({ "path": f.path, "size": f.size }))
        .collect();
    let value = serde_json::json!({
        "files": files,
        "total_bytes": report.files.iter().map(|f| f.size).sum::<u64>(),
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
