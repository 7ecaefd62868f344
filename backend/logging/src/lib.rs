//! Structured logging for pdfmetrics.
//!
//! Console output on stderr (stdout carries the result table), an optional
//! daily-rolling NDJSON file, and secret scrubbing for text that may echo
//! credentials back from the remote service.

pub mod logger;
pub mod redact;

pub use logger::{init_logger, LogSettings};
pub use redact::redact_sensitive_data;
