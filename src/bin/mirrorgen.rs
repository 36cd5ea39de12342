//! # mirrorgen CLI - Listings and manifests for static file mirrors
//!
//! Writes `dir.json` into every directory under the mirror root and a
//! `manifest.json` at the root.
//!
//! ## Usage
//! ```bash
//! # Generate with default prefix "/"
//! mirrorgen --root /data/update-server
//!
//! # Serve the mirror under /dl
//! mirrorgen --root /data/update-server --base-url-prefix /dl
//!
//! # Reproducible manifest timestamp
//! SOURCE_DATE_EPOCH=1700000000 mirrorgen --root /data/update-server --quiet
//! ```
//!
//! Exit status is 0 on success, 2 when the root is missing or the
//! configuration is invalid, and 1 for any other failure.

use chrono::{DateTime, TimeZone, Utc};
use clap::Parser;
use colored::*;
use humantime::format_duration;
use mirrorgen::{Conventions, GeneratorBuilder, MirrorError, PersistEvent, Result, WriteOutcome};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// mirrorgen CLI - Generate mirror listings and the root manifest
#[derive(Parser)]
#[command(name = "mirrorgen")]
#[command(version)]
#[command(about = "Generate dir.json listings and manifest.json for a static file mirror")]
#[command(long_about = None)]
struct Cli {
    /// Filesystem root of the mirror (e.g. /data/update-server)
    #[arg(long)]
    root: PathBuf,

    /// URL prefix prepended to every href
    #[arg(long, default_value = "/")]
    base_url_prefix: String,

    /// Suppress progress output
    #[arg(long)]
    quiet: bool,

    /// JSON file overriding the naming conventions
    #[arg(long)]
    conventions: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(e.exit_code());
    }
}

/// Main command runner
fn run(cli: Cli) -> Result<()> {
    let conventions = match &cli.conventions {
        Some(path) => Conventions::from_json_file(path)?,
        None => Conventions::default(),
    };

    let mut builder = GeneratorBuilder::new()
        .base_url_prefix(cli.base_url_prefix)
        .conventions(conventions);
    if let Some(ts) = source_date_epoch()? {
        builder = builder.generated_at(ts);
    }
    let generator = builder.build(&cli.root)?;

    let quiet = cli.quiet;
    let stats = generator.run_with_progress(Some(|event: &PersistEvent| {
        if quiet {
            return;
        }
        match event.outcome {
            WriteOutcome::Written => println!("Wrote {}", event.path.display()),
            WriteOutcome::Unchanged => {
                println!("{}", format!("Unchanged {}", event.path.display()).dimmed())
            }
        }
    }))?;

    if !quiet {
        println!(
            "{} {} listings ({} rewritten), {} buckets in {}",
            "✓".green().bold(),
            stats.listings().to_string().cyan(),
            stats.listings_written.to_string().yellow(),
            stats.buckets.to_string().cyan(),
            format_duration(truncate_to_millis(stats.duration)),
        );
        if stats.directories_skipped > 0 {
            println!(
                "  Skipped: {} directories",
                stats.directories_skipped.to_string().yellow()
            );
        }
    }

    Ok(())
}

/// Pinned manifest timestamp from `SOURCE_DATE_EPOCH`, if set
fn source_date_epoch() -> Result<Option<DateTime<Utc>>> {
    let raw = match std::env::var("SOURCE_DATE_EPOCH") {
        Ok(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(None),
    };
    let secs: i64 = raw
        .trim()
        .parse()
        .map_err(|_| MirrorError::configuration(format!("SOURCE_DATE_EPOCH is not an integer: {:?}", raw)))?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(Some)
        .ok_or_else(|| MirrorError::configuration(format!("SOURCE_DATE_EPOCH out of range: {}", secs)))
}

fn truncate_to_millis(d: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(d.as_millis() as u64)
}
