//! Observability setup for Keepsake.

pub mod tracing_setup;
