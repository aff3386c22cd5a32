//! drivemap - inventory a directory tree into a SQLite database.
//!
//! Usage:
//!   drivemap scan <PATH>       Scan a tree into files.db
//!   drivemap export            Export files.db to CSV
//!   drivemap --help            Show help

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::thread;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use drivemap_core::{InventoryConfig, RunSummary};
use drivemap_scan::{Inventory, ScanProgress};
use drivemap_store::SqliteStore;

const DEFAULT_DB: &str = "files.db";

#[derive(Parser)]
#[command(
    name = "drivemap",
    version,
    about = "Inventory a directory tree into a SQLite database",
    long_about = "drivemap walks a directory tree in parallel and records the name, path, \
                  extension, size and path-derived tags of every file in a SQLite table. \
                  Progress is committed in batches, so an interrupted run keeps what it stored."
)]
struct Cli {
    /// Log more detail (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a directory tree into the database
    Scan(ScanArgs),

    /// Export the database to CSV
    Export {
        /// Database file
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Path to scan
    path: PathBuf,

    /// Database file
    #[arg(long, default_value = DEFAULT_DB)]
    db: PathBuf,

    /// JSON config file; flags given here override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of scanner threads [default: 8]
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Records committed per transaction [default: 10000]
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Number of tag columns; must match an existing database [default: 10]
    #[arg(short, long)]
    tags: Option<usize>,

    /// Records buffered between scanners and the writer [default: 20000]
    #[arg(long)]
    channel_capacity: Option<usize>,

    /// Export the database to this CSV file after a clean scan
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

/// Settings accepted from a `--config` file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    threads: Option<usize>,
    batch_size: Option<usize>,
    tag_count: Option<usize>,
    channel_capacity: Option<usize>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Scan(args) => run_scan(args),
        Command::Export { db, output } => run_export(&db, output.as_deref()),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "drivemap=debug,drivemap_scan=debug,drivemap_store=debug"
    } else if quiet {
        "warn"
    } else {
        "drivemap=info,drivemap_scan=info,drivemap_store=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Scan a tree into the database.
fn run_scan(args: ScanArgs) -> Result<()> {
    let config = build_config(&args)?;
    let store = SqliteStore::open(&args.db, config.tag_count)
        .with_context(|| format!("Failed to open database {}", args.db.display()))?;
    tracing::info!(db = %args.db.display(), "database initialized");

    let inventory = Inventory::new(config, store);
    let progress = spawn_progress_logger(inventory.subscribe());

    let result = inventory.run();
    // The progress channel closes when the run ends, successful or not.
    let _ = progress.join();
    let summary = result.context("Scan failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if let Some(csv_path) = &args.export {
        run_export(&args.db, Some(csv_path))?;
    }
    Ok(())
}

/// Merge defaults, the optional config file, and explicit flags.
fn build_config(args: &ScanArgs) -> Result<InventoryConfig> {
    let file = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str::<FileConfig>(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => FileConfig::default(),
    };

    let mut builder = InventoryConfig::builder();
    builder.root(args.path.clone());
    if let Some(threads) = args.threads.or(file.threads) {
        builder.threads(threads);
    }
    if let Some(batch_size) = args.batch_size.or(file.batch_size) {
        builder.batch_size(batch_size);
    }
    if let Some(tags) = args.tags.or(file.tag_count) {
        builder.tag_count(tags);
    }
    if let Some(capacity) = args.channel_capacity.or(file.channel_capacity) {
        builder.channel_capacity(capacity);
    }

    builder.build().context("Invalid configuration")
}

fn spawn_progress_logger(
    mut progress_rx: tokio::sync::broadcast::Receiver<ScanProgress>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        loop {
            match progress_rx.blocking_recv() {
                Ok(progress) => tracing::info!(
                    files = progress.files_scanned,
                    dirs = progress.dirs_scanned,
                    size = %format_size(progress.bytes_scanned),
                    rate = %format!("{:.0}/s", progress.files_per_second()),
                    "scanning {}",
                    progress.current_path.display()
                ),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Export the database to CSV.
fn run_export(db: &Path, output: Option<&Path>) -> Result<()> {
    if !db.exists() {
        color_eyre::eyre::bail!("Database {} does not exist", db.display());
    }
    let store = SqliteStore::open_existing(db)
        .with_context(|| format!("Failed to open database {}", db.display()))?;

    let rows = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let rows = store.export_csv(BufWriter::new(file))?;
            tracing::info!(rows, csv = %path.display(), "database exported to CSV");
            rows
        }
        None => store.export_csv(io::stdout().lock())?,
    };

    tracing::debug!(rows, "export finished");
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", "─".repeat(60));
    println!(" {} - {}", summary.root.display(), format_size(summary.bytes_seen));
    println!(
        " {} files in {} directories",
        summary.files_seen, summary.dirs_scanned
    );
    println!(
        " {} new rows, {} already stored, {} batches",
        summary.rows_inserted, summary.duplicates_ignored, summary.batches_committed
    );
    println!(
        " Scanned in {:.2}s ({:.0} files/s)",
        summary.elapsed.as_secs_f64(),
        summary.files_per_second()
    );
    println!("{}", "─".repeat(60));

    if summary.has_warnings() {
        println!();
        println!("{} entries skipped during scan", summary.warnings.len());
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
