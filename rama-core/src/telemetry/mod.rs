//! Rama telemetry modules.

#[macro_use]
pub mod tracing;
