//! Adapters layer: Concrete implementations of ports.
//!
//! - `flatfile`: CSV vitals table and upload decoding
//! - `forest`: random-forest forecaster
//! - `registry`: model artifacts on disk (plain + gzip)
//! - `notify`: mail outbox and speech sinks
//! - `sanitize`: log scrubbing

pub mod flatfile;
pub mod forest;
pub mod notify;
pub mod registry;
pub mod sanitize;
