//! Tracing/logging setup shared by binaries.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide logging for the given run mode (`prod`/`production`
/// log JSON at `info`, anything else logs text at `debug`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(mode: &str) {
    tracing::init(LogFormat::from_mode(mode));
}
