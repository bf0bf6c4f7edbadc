//! Inference service: Orchestrates next-vitals prediction.
//!
//! This service coordinates:
//! - By-name validation of the five required features
//! - Model invocation through the `Forecaster` port
//! - Labeling of the forecast for display and alerting
//!
//! It holds no mutable state; every call is a pure function of the injected
//! model and the input.

use std::sync::Arc;

use crate::adapters::flatfile::UploadTable;
use crate::domain::{PredictionResult, VitalReading, VitalRecord};
use crate::ports::Forecaster;
use crate::{Result, VitalcastError};

/// Service for running next-vitals inference.
pub struct InferenceService<F>
where
    F: Forecaster,
{
    model: Arc<F>,
}

impl<F> InferenceService<F>
where
    F: Forecaster,
{
    /// Create a new inference service around a loaded model.
    pub fn new(model: Arc<F>) -> Self {
        Self { model }
    }

    #[must_use]
    pub fn model(&self) -> &Arc<F> {
        &self.model
    }

    /// Forecast the next vitals from a patient's latest reading.
    ///
    /// # Errors
    /// Returns `MissingFeature` naming every absent field, or `Prediction` if
    /// the model rejects the input.
    pub fn predict_next(&self, latest: &VitalReading) -> Result<PredictionResult> {
        let features = latest
            .require_vitals()
            .map_err(|missing| VitalcastError::MissingFeature { missing })?;

        let predicted = self.model.predict(&features)?;
        tracing::debug!("Forecast computed for patient {:?}", latest.patient_id);

        Ok(PredictionResult::new(latest.patient_id, predicted))
    }

    /// Forecast from a stored record.
    ///
    /// # Errors
    /// Returns `Prediction` if the model rejects the input.
    pub fn predict_record(&self, record: &VitalRecord) -> Result<PredictionResult> {
        self.predict_next(&VitalReading::from(record))
    }

    /// Forecast every row of an uploaded table.
    ///
    /// The header is checked once for the full required column set before any
    /// row is touched.
    ///
    /// # Errors
    /// Returns `MissingFeature` listing absent columns, `Validation` naming the
    /// first row with an empty or unparseable required cell, or `Prediction`.
    pub fn predict_batch(&self, table: &UploadTable) -> Result<Vec<PredictionResult>> {
        let missing = table.missing_columns();
        if !missing.is_empty() {
            return Err(VitalcastError::MissingFeature { missing });
        }

        let readings = table.readings()?;
        tracing::info!("Predicting {} uploaded rows", readings.len());

        readings
            .iter()
            .enumerate()
            .map(|(i, reading)| {
                let missing = reading.missing_fields();
                if !missing.is_empty() {
                    return Err(VitalcastError::Validation(format!(
                        "row {}: missing {}",
                        i + 1,
                        missing.join(", ")
                    )));
                }
                self.predict_next(reading)
            })
            .collect()
    }
}
