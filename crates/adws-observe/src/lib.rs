//! Observability layer for ADWS: tracing subscriber setup with optional
//! OpenTelemetry span export.

pub mod tracing_setup;
