//! Synthetic vitals generator for demos and tests.
//!
//! Replaces the vitals table with `patients x records` plausible readings.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin generate_vitals -- [--patients <n>] [--records <n>] [--seed <n>] [--out <path>]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDateTime, Timelike};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use vitalcast::adapters::flatfile::CsvVitalsStore;
use vitalcast::adapters::sanitize::SanitizingMakeWriter;
use vitalcast::config::AppConfig;
use vitalcast::ports::VitalsStore;
use vitalcast::VitalRecord;

const USAGE: &str =
    "Usage: generate_vitals [--patients <n>] [--records <n>] [--seed <n>] [--out <path>]";

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

/// Readings for patients `1..=patients`, each series starting `records` days before `now`.
fn generate<R: Rng>(
    rng: &mut R,
    patients: i64,
    records: u32,
    now: NaiveDateTime,
) -> Vec<VitalRecord> {
    let start = now - Duration::days(i64::from(records));
    let mut out = Vec::new();

    for patient_id in 1..=patients {
        let mut timestamp = start;
        for _ in 0..records {
            timestamp += Duration::minutes(rng.gen_range(5..=60));
            let temperature: f64 = rng.gen_range(36.0..=38.5);
            out.push(VitalRecord {
                patient_id,
                timestamp,
                heart_rate: rng.gen_range(70..=110),
                bp_systolic: rng.gen_range(110..=160),
                bp_diastolic: rng.gen_range(70..=100),
                oxygen_saturation: f64::from(rng.gen_range(90_i32..=100)),
                temperature: (temperature * 10.0).round() / 10.0,
            });
        }
    }

    out
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(SanitizingMakeWriter::new(std::io::stderr))
        .init();

    let config = AppConfig::from_env()?;
    let mut out_path = config.data_path;
    let mut patients: i64 = 5;
    let mut records: u32 = 3;
    let mut seed: Option<u64> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--patients" => {
                patients = next_value(&mut args)
                    .parse()
                    .context("--patients expects an integer")?;
            }
            "--records" => {
                records = next_value(&mut args)
                    .parse()
                    .context("--records expects an unsigned integer")?;
            }
            "--seed" => {
                seed = Some(
                    next_value(&mut args)
                        .parse()
                        .context("--seed expects an unsigned integer")?,
                );
            }
            "--out" => out_path = PathBuf::from(next_value(&mut args)),
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown arg: {arg}");
                usage_exit();
            }
        }
    }

    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let now = Local::now().naive_local();
    // The table stores whole seconds.
    let now = now.with_nanosecond(0).unwrap_or(now);
    let generated = generate(&mut rng, patients, records, now);

    if out_path.exists() {
        std::fs::remove_file(&out_path)
            .with_context(|| format!("failed to replace {}", out_path.display()))?;
    }
    let store = CsvVitalsStore::new(&out_path);
    for record in &generated {
        store.append(record)?;
    }

    tracing::info!(
        "Generated {} records for {} patients in {:?}",
        generated.len(),
        patients,
        out_path
    );
    Ok(())
}
