//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod alerting;
mod inference;
mod training;

pub use alerting::{AlertOutcome, AlertService, MailSettings};
pub use inference::InferenceService;
pub use training::{TrainingReport, TrainingService};
