//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (flat files, the trained
//! model, mail and speech collaborators).

mod forecaster;
mod model_registry;
mod sinks;
mod vitals_store;

pub use forecaster::{ForecastError, Forecaster};
pub use model_registry::{ArtifactVariant, ModelRegistry};
pub use sinks::{announce, MailSink, NoopMailSink, NoopSpeechSink, SinkError, SpeechSink};
pub use vitals_store::VitalsStore;
