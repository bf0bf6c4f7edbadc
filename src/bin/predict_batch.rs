//! Batch forecast over an uploaded vitals table.
//!
//! Prints one JSON object per row (patient id plus predicted vitals) to
//! stdout, followed by the alert message of every row that crosses a threshold.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin predict_batch -- <upload.csv> [--models <dir>] [--variant plain|compressed]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use vitalcast::adapters::flatfile::UploadTable;
use vitalcast::adapters::registry::FileModelRegistry;
use vitalcast::adapters::sanitize::SanitizingMakeWriter;
use vitalcast::application::InferenceService;
use vitalcast::config::AppConfig;
use vitalcast::ports::{ArtifactVariant, ModelRegistry};
use vitalcast::{PredictionResult, VitalField};

const USAGE: &str =
    "Usage: predict_batch <upload.csv> [--models <dir>] [--variant plain|compressed]";

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

/// Flat JSON row: `patient_id` then each vital under its column name.
fn to_json(result: &PredictionResult) -> Value {
    let mut row = Map::new();
    row.insert("patient_id".to_string(), Value::from(result.patient_id));
    for field in VitalField::ALL {
        row.insert(field.name().to_string(), Value::from(result.value(field)));
    }
    Value::Object(row)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(SanitizingMakeWriter::new(std::io::stderr))
        .init();

    let mut config = AppConfig::from_env()?;
    let mut upload: Option<PathBuf> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--models" => config.model_dir = PathBuf::from(next_value(&mut args)),
            "--variant" => {
                config.model_variant = next_value(&mut args)
                    .parse::<ArtifactVariant>()
                    .map_err(|e| anyhow!(e))?;
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            other if other.starts_with("--") => {
                eprintln!("Unknown arg: {other}");
                usage_exit();
            }
            _ if upload.is_none() => upload = Some(PathBuf::from(&arg)),
            _ => usage_exit(),
        }
    }
    let upload = upload.unwrap_or_else(|| usage_exit());

    let registry = FileModelRegistry::new(&config.model_dir);
    let model = registry.load_variant(config.model_variant)?;
    let service = InferenceService::new(Arc::new(model));

    let table = UploadTable::from_path(&upload)?;
    tracing::info!(
        "Read {} rows from {:?} ({})",
        table.len(),
        upload,
        table.encoding()
    );
    let results = service.predict_batch(&table)?;

    for result in &results {
        println!("{}", to_json(result));
    }

    let thresholds = config.thresholds();
    for alert in results.iter().filter_map(|r| thresholds.evaluate(r)) {
        println!("\n{}", alert.message());
    }

    Ok(())
}
