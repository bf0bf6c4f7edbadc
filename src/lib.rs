//! # Vitalcast
//!
//! Next-vitals forecasting for a clinical monitoring dashboard.
//!
//! This crate provides:
//! - A flat-file vitals store and a supervised frame builder (one-step shift per patient)
//! - A multi-output random-forest forecaster with plain and compressed artifacts
//! - Inference with by-name feature validation, threshold alerts and injected sinks
//! - Terminal UI for local monitoring
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (VitalRecord, TrainingPair, PredictionResult, alerts, slots)
//! - `ports`: Trait definitions for external operations
//! - `adapters`: Concrete implementations (CSV store, forest model, file registry, sinks)
//! - `application`: Use cases orchestrating domain and ports
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

use std::path::PathBuf;

pub use domain::{PredictionResult, VitalField, VitalReading, VitalRecord, Vitals};

/// Result type for Vitalcast operations
pub type Result<T> = std::result::Result<T, VitalcastError>;

/// Main error type for Vitalcast
#[derive(Debug, thiserror::Error)]
pub enum VitalcastError {
    #[error("Vitals data not found at {}", path.display())]
    MissingData { path: PathBuf },

    #[error("Not enough data to train: {0}")]
    InsufficientData(String),

    #[error("Model artifact not found at {}", path.display())]
    ModelNotFound { path: PathBuf },

    #[error("Missing required features: {}", missing.join(", "))]
    MissingFeature { missing: Vec<String> },

    #[error("Prediction failed: {0}")]
    Prediction(#[from] ports::ForecastError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    Validation(String),
}

impl From<serde_json::Error> for VitalcastError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for VitalcastError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
