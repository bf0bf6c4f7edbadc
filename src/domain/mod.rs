//! Domain layer: Core types and pure logic.
//!
//! No I/O happens here. Records are validated at the boundary and carried as
//! named-field types from then on.

pub mod alert;
pub mod appointment;
mod forecast;
pub mod frame;
pub mod vitals;

pub use alert::{
    Alert, AlertEmail, Comparison, MailCredential, Threshold, ThresholdTable, Violation,
    ALERT_SUBJECT,
};
pub use appointment::{book_slot, suggest_slots, Appointment};
pub use forecast::PredictionResult;
pub use frame::{build_pairs, TrainingPair};
pub use vitals::{
    SortOrder, VitalField, VitalReading, VitalRecord, Vitals, FEATURE_COUNT, FEATURE_NAMES,
};
