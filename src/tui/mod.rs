//! TUI module: Terminal User Interface using Ratatui.
//!
//! Provides a medical-themed monitoring interface for:
//! - Dashboard with latest vitals, forecast and alert status
//! - Per-patient vitals history chart
//! - Appointment slot booking

mod app;
mod styles;
mod ui;

pub use app::{App, Screen};
pub use styles::MedicalTheme;
