//! Model training utility.
//!
//! Loads the vitals table, builds next-step training pairs per patient, fits
//! the forest and writes both the plain and the compressed artifact.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin train_model -- [--data <path>] [--models <dir>] [--trees <n>] [--seed <n>]
//! ```
//!
//! Defaults come from the `VITALCAST_*` environment (see `AppConfig`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use vitalcast::adapters::flatfile::CsvVitalsStore;
use vitalcast::adapters::registry::FileModelRegistry;
use vitalcast::adapters::sanitize::SanitizingMakeWriter;
use vitalcast::application::TrainingService;
use vitalcast::config::AppConfig;

const USAGE: &str =
    "Usage: train_model [--data <path>] [--models <dir>] [--trees <n>] [--seed <n>]";

fn usage_exit() -> ! {
    eprintln!("{USAGE}");
    std::process::exit(2);
}

fn next_value(args: &mut impl Iterator<Item = String>) -> String {
    match args.next() {
        Some(v) if !v.is_empty() => v,
        _ => usage_exit(),
    }
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map_or(0, |m| m.len())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(SanitizingMakeWriter::new(std::io::stderr))
        .init();

    let mut config = AppConfig::from_env()?;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data" => config.data_path = PathBuf::from(next_value(&mut args)),
            "--models" => config.model_dir = PathBuf::from(next_value(&mut args)),
            "--trees" => {
                config.forest.n_trees = next_value(&mut args)
                    .parse()
                    .context("--trees expects a positive integer")?;
            }
            "--seed" => {
                config.forest.seed = next_value(&mut args)
                    .parse()
                    .context("--seed expects an unsigned integer")?;
            }
            "-h" | "--help" => {
                println!("{USAGE}\n\nWrites model.bin and model_compressed.bin.");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown arg: {arg}");
                usage_exit();
            }
        }
    }
    config.forest.validate()?;

    let store = Arc::new(CsvVitalsStore::new(&config.data_path));
    let registry = Arc::new(FileModelRegistry::new(&config.model_dir));
    let service = TrainingService::new(store, registry, config.forest.clone());

    tracing::info!(
        "Training {} trees per output from {:?}",
        config.forest.n_trees,
        config.data_path
    );
    let report = service.train_and_save()?;

    tracing::info!(
        "Trained on {} pairs from {} records",
        report.pairs,
        report.records
    );
    tracing::info!(
        "Model saved to {:?} ({} bytes)",
        report.plain_path,
        file_size(&report.plain_path)
    );
    tracing::info!(
        "Compressed model saved to {:?} ({} bytes)",
        report.compressed_path,
        file_size(&report.compressed_path)
    );

    Ok(())
}
