//! Forecaster port: Trait for next-vitals prediction.
//!
//! This trait abstracts the trained regression model from the application logic.

use crate::domain::Vitals;

/// Errors raised by a model at prediction time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForecastError {
    #[error("Input contains non-finite value for {0}")]
    NonFinite(&'static str),

    #[error("Model produced {got} outputs, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Model is empty: {0}")]
    EmptyModel(String),

    #[error("Model output is non-finite for {0}")]
    NonFiniteOutput(&'static str),
}

/// Trait for next-step vitals prediction.
///
/// Implementations must be deterministic for a given trained state and input.
pub trait Forecaster: Send + Sync {
    /// Predict the next vitals from the current ones.
    ///
    /// # Errors
    /// Returns `ForecastError` if the input or the model state is unusable.
    fn predict(&self, features: &Vitals) -> Result<Vitals, ForecastError>;

    /// Number of training pairs the model was fitted on (for status display).
    fn training_pairs(&self) -> usize;
}

impl<F: Forecaster + ?Sized> Forecaster for std::sync::Arc<F> {
    fn predict(&self, features: &Vitals) -> Result<Vitals, ForecastError> {
        (**self).predict(features)
    }

    fn training_pairs(&self) -> usize {
        (**self).training_pairs()
    }
}
