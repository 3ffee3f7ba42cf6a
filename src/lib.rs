//! Search Index Backup Library
//!
//! This library exports the full document set of a search index to object
//! storage, either as one consolidated JSON array or as a sequence of batch
//! objects plus a manifest.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `export`: Export engine, output strategies and run summary
//! - `naming`: Object key naming
//! - `search`: Paginated search access
//! - `storage`: Object storage access
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use csbackup::{BackupConfig, backup};
//! use csbackup::search::CloudSearchClient;
//! use csbackup::storage::ObjectStoreBackend;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = BackupConfig::default();
//!     config.target.bucket = "backups".to_string();
//!     config.search.endpoint = "search-docs.us-east-1.cloudsearch.amazonaws.com".to_string();
//!
//!     let search = Arc::new(CloudSearchClient::from_config(&config)?);
//!     let store = Arc::new(ObjectStoreBackend::s3("us-east-1"));
//!
//!     println!("{}", backup(config, search, store).await?);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod naming;
pub mod search;
pub mod storage;

// Re-export commonly used types
pub use config::BackupConfig;
pub use error::{BackupError, Result};
pub use export::{BackupSummary, ExportEngine, backup};
pub use naming::NamingPolicy;
pub use search::{PageFetcher, SearchGateway};
pub use storage::ObjectStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}
