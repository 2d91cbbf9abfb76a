//! textap CLI: run the extractor once over a config and prior state.
//!
//! stdout carries Singer messages only; logs go to stderr.

use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use textap_core::{RunState, TapConfig};
use textap_exec::{ExecError, Tap};
use textap_io::config::load_config;
use textap_io::writers::state_file::load_state;
use textap_io::writers::{SingerWriter, StateFileSink};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "textap")]
#[command(about = "Incremental extractor for directories of JSONL, CSV and log files", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract new files and write SCHEMA/RECORD/STATE messages to stdout
    Run {
        /// Path to the config file (.json, .yaml or .yml)
        #[arg(short, long)]
        config: PathBuf,

        /// State written by a previous run
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Also persist every checkpoint to this file
        #[arg(long)]
        state_output: Option<PathBuf>,

        /// Records per batch (overrides config)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Print the shapes a run would announce, without emitting anything
    Infer {
        #[arg(short, long)]
        config: PathBuf,

        #[arg(short, long)]
        state: Option<PathBuf>,
    },

    /// Validate a config file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    info!("=== Welcome to textap {} ===", textap_core::VERSION);

    let result = match cli.command {
        Commands::Run {
            config,
            state,
            state_output,
            batch_size,
        } => run(&config, state.as_deref(), state_output, batch_size),
        Commands::Infer { config, state } => infer(&config, state.as_deref()),
        Commands::Validate { config } => validate(&config),
    };

    if let Err(e) = result {
        eprint!("{}", error_report(e.as_ref()));
        std::process::exit(1);
    }
}

/// The error line plus any suggestions, as printed to stderr on failure.
fn error_report(e: &(dyn std::error::Error + 'static)) -> String {
    let mut out = format!("Error: {}\n", e);
    if let Some(exec) = e.downcast_ref::<ExecError>() {
        for suggestion in exec.suggestions() {
            out.push_str(&format!("  - {}\n", suggestion));
        }
    }
    out
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_inputs(
    config_path: &Path,
    state_path: Option<&Path>,
) -> Result<(TapConfig, RunState), Box<dyn std::error::Error>> {
    info!("Reading config file {}", config_path.display());
    let cfg = load_config(config_path)?;
    let state = match state_path {
        Some(p) => load_state(p)?,
        None => RunState::default(),
    };
    Ok((cfg, state))
}

fn run(
    config_path: &Path,
    state_path: Option<&Path>,
    state_output: Option<PathBuf>,
    batch_size: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut cfg, state) = load_inputs(config_path, state_path)?;
    if let Some(n) = batch_size {
        cfg.batch_size = n;
    }

    let tap = Tap::new(&cfg)?;
    let writer = SingerWriter::stdout();
    let report = match state_output {
        Some(path) => tap.run(state, &mut StateFileSink::new(writer, path))?,
        None => {
            let mut writer = writer;
            tap.run(state, &mut writer)?
        }
    };

    info!(
        "Synced {} records from {} new files in {}ms",
        report.total_records(),
        report.total_new_files(),
        report.finished_ms.saturating_sub(report.started_ms)
    );
    Ok(())
}

fn infer(config_path: &Path, state_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let (cfg, state) = load_inputs(config_path, state_path)?;
    let tap = Tap::new(&cfg)?;
    let shapes = tap.infer_only(state)?;

    let doc: serde_json::Map<String, serde_json::Value> = shapes
        .into_iter()
        .map(|(name, shape)| (name, shape.to_document()))
        .collect();
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn validate(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = load_config(config_path)?;
    // builds the decoder too, so a bad log_pattern or grok_pattern is caught here
    Tap::new(&cfg)?;
    println!(
        "✓ Config is valid: {} directories, format {}",
        cfg.directories.len(),
        cfg.file_format
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_reported_once_with_suggestions() {
        let err: Box<dyn std::error::Error> =
            Box::new(ExecError::Config("log_pattern is required".into()));
        let report = error_report(err.as_ref());
        assert_eq!(report.matches("log_pattern is required").count(), 1);
        assert!(report.starts_with("Error: invalid configuration: "));
        assert!(report.lines().skip(1).all(|l| l.starts_with("  - ")));
        assert!(report.lines().count() > 1);
    }
}
