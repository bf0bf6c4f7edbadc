//! Vitalcast: next-vitals forecasting dashboard
//!
//! Main entry point for the terminal application.

use anyhow::Result;
use std::io::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vitalcast::adapters::sanitize::SanitizingMakeWriter;
use vitalcast::config::AppConfig;
use vitalcast::tui::App;

fn main() -> Result<()> {
    // Initialize logging.
    //
    // Writing logs to the terminal corrupts the TUI (alternate screen), so an
    // interactive session logs to a file and a non-interactive one to stdout.
    let log_mode = std::env::var("VITALCAST_LOG_MODE").unwrap_or_else(|_| "auto".to_string());

    let interactive = std::io::stdout().is_terminal();
    let use_file = match log_mode.as_str() {
        "file" => true,
        "stdout" => false,
        // auto
        _ => interactive,
    };

    let (writer, _guard) = if use_file {
        let log_file = std::env::var("VITALCAST_LOG_FILE")
            .unwrap_or_else(|_| "data/vitalcast.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: a failure surfaces when the file is opened.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        "Starting Vitalcast (data {:?}, models {:?}, variant {})",
        config.data_path,
        config.model_dir,
        config.model_variant
    );

    let mut app = App::new(&config);
    app.run()?;

    tracing::info!("Vitalcast shutdown complete.");
    Ok(())
}
