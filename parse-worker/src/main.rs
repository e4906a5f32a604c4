//! Parse worker subprocess.
//!
//! Loads one combat log, resolves and segments every log in it, and prints a
//! `ParseWorkerOutput` as JSON on stdout.

use std::path::{Path, PathBuf};
use std::time::Instant;

use aegis_core::{LoaderConfig, LogLoader, ParseWorkerOutput};
use tracing_subscriber::EnvFilter;

/// Initialize logging, writing to AEGIS_LOG_PATH if set, otherwise stderr.
fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    if let Ok(path) = std::env::var("AEGIS_LOG_PATH")
        && let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
    {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(file)
            .init();
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        tracing::error!("Usage: aegis-parse-worker <file_path> [config_path]");
        std::process::exit(1);
    }

    let file_path = PathBuf::from(&args[1]);
    let config = match args.get(2) {
        Some(path) => LoaderConfig::load(Path::new(path)),
        None => LoaderConfig::load_default(),
    };
    let options = match config.and_then(|config| config.load_options()) {
        Ok(options) => options,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let started = Instant::now();
    let loaded = match LogLoader::new(&file_path, options).load() {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(path = %file_path.display(), error = %e, "Failed to load combat log");
            std::process::exit(1);
        }
    };

    let output = ParseWorkerOutput::from_loaded(loaded, started);
    tracing::info!(
        logs = output.logs.len(),
        rejected = output.rejected.len(),
        errors = output.error_count,
        elapsed_ms = output.elapsed_ms as u64,
        "Parse complete"
    );

    match serde_json::to_string(&output) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize output");
            std::process::exit(1);
        }
    }
}
