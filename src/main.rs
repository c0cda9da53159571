//! CLI entry point for the crag finder.
//!
//! Provides subcommands for ranking an area's crags from a route-finder
//! export, writing the per-crag bucket breakdown, and checking how a
//! single rating string is classified.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crag_finder::classify::classify_rating;
use crag_finder::config::{PartialConfig, RunConfig};
use crag_finder::output::print_json;
use crag_finder::report;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "crag_finder")]
#[command(about = "Ranks climbing crags from a route-finder CSV export", long_about = None)]
struct Cli {
    /// JSON config file; command-line options override its values
    #[arg(short, long, global = true, env = "CRAG_FINDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank crags and write the full and diversity-filtered tables
    Rank {
        #[command(flatten)]
        run: RunArgs,

        /// Print the run summary as JSON to stdout
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write the per-crag, per-bucket breakdown table
    Breakdown {
        #[command(flatten)]
        run: RunArgs,

        /// CSV file to write (defaults to <area>_crag_breakdown.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show which bucket a rating string falls into
    Classify {
        /// Rating as it appears in the export, e.g. "5.10a PG13"
        #[arg(value_name = "RATING")]
        rating: String,

        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Climbing area; names the data directory and output files
    #[arg(short, long, env = "CRAG_FINDER_AREA")]
    area: Option<String>,

    /// Directory holding one sub-directory per area
    #[arg(short, long, env = "CRAG_FINDER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Route export to read (defaults to <data-dir>/<area>/route-finder.csv)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory for output tables (defaults to <data-dir>/<area>)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Keep only "Sport" and "Sport, TR" routes
    #[arg(long, value_name = "BOOL")]
    sport_only: Option<bool>,

    /// Drop routes with an R or X protection rating
    #[arg(long, value_name = "BOOL")]
    no_deaths: Option<bool>,
}

impl RunArgs {
    fn into_layer(self) -> PartialConfig {
        PartialConfig {
            area: self.area,
            data_dir: self.data_dir,
            input: self.input,
            output_dir: self.output_dir,
            ratings: None,
            sport_only: self.sport_only,
            no_deaths: self.no_deaths,
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok(); // Load .env file

    let _guard = match init_tracing() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialise logging: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Run failed");
            ExitCode::FAILURE
        }
    }
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/crag_finder.log".to_string());
    let file_appender = log_appender(Path::new(&log_file_path))?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()?;

    Ok(guard)
}

/// Daily-rolling appender for `log_file_path`. Fails instead of panicking
/// when the log directory cannot be created.
fn log_appender(log_file_path: &Path) -> Result<RollingFileAppender> {
    let log_dir = log_file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = log_file_path
        .file_name()
        .unwrap_or(OsStr::new("crag_finder.log"));

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(log_file_name.to_string_lossy())
        .build(log_dir)
        .with_context(|| format!("opening log directory {}", log_dir.display()))
}

fn resolve_config(file: Option<&Path>, args: RunArgs) -> Result<RunConfig> {
    let base = match file {
        Some(path) => PartialConfig::load(path)?,
        None => PartialConfig::default(),
    };
    let config = base.overlay(args.into_layer()).resolve()?;
    info!(
        area = %config.area,
        sport_only = config.policy.sport_only,
        no_deaths = config.policy.no_deaths,
        "Configuration resolved"
    );
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config_file = cli.config.as_deref();

    match cli.command {
        Commands::Rank { run, json } => {
            let config = resolve_config(config_file, run)?;
            let summary = report::run(&config)
                .with_context(|| format!("ranking crags for area '{}'", config.area))?;
            if json {
                print_json(&summary)?;
            }
        }
        Commands::Breakdown { run, output } => {
            let config = resolve_config(config_file, run)?;
            let (path, rows) = report::run_breakdown(&config, output)
                .with_context(|| format!("building breakdown for area '{}'", config.area))?;
            info!(path = %path.display(), rows, "Breakdown complete");
        }
        Commands::Classify { rating, run } => {
            let config = resolve_config(config_file, run)?;
            match classify_rating(&rating, &config.policy) {
                Some(bucket) => {
                    let priority = config.priorities.rank(bucket);
                    info!(rating = %rating, bucket = %bucket, priority, "Rating classified");
                    println!("{bucket}");
                }
                None => {
                    info!(rating = %rating, "Rating has no bucket under the current policy");
                    println!("(none)");
                }
            }
        }
    }

    Ok(())
}
