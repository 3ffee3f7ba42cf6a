//! Error handling module for backup runs.
//!
//! This module provides:
//! - A single crate-wide error type wrapping the per-area error kinds
//! - A coarse classification of errors (transient service, local resource, ...)
//! - A structured JSON error report for logging and process exit output
//!
//! # Example
//!
//! ```rust,no_run
//! use csbackup::error::{BackupError, ErrorReport, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(BackupError::Generic("something went wrong".to_string()))
//! }
//!
//! if let Err(e) = example_operation() {
//!     println!("{}", ErrorReport::from_error(&e).to_json_pretty().unwrap());
//! }
//! ```

pub mod kinds;
pub mod report;

// Re-export commonly used types
pub use kinds::{
    BackupError, BufferError, ConfigError, ErrorKind, Result, SearchError, StorageError,
};
pub use report::ErrorReport;
