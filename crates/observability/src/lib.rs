//! Tracing and logging setup shared by the binaries.
//!
//! The format is chosen by the caller (the API reads it from `LOG_FORMAT` as part of
//! its configuration); filtering always follows `RUST_LOG`.

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use tracing::{LogFormat, ParseLogFormatError, init};
