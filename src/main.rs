//! csbackup - search index backup
//!
//! Exports every document of a search index to object storage in a single
//! invocation, then exits. Intended to be run on demand or from a scheduler.
//!
//! # Usage
//!
//! ```bash
//! # Time-partitioned single-file backup
//! BUCKET_NAME=backups DOCUMENT_ENDPOINT=search-docs.example.com csbackup
//!
//! # One object per batch plus a manifest
//! csbackup --endpoint search-docs.example.com --bucket backups --single-file 0
//!
//! # Write to a local directory instead of S3
//! csbackup --store local --store-root /var/backups
//! ```
//!
//! Search requests are sent unsigned, so the search domain's access policy
//! must allow the caller without SigV4 signing.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use csbackup::cli::CliInterface;
use csbackup::error::{ErrorReport, Result};
use csbackup::search::CloudSearchClient;
use csbackup::storage::ObjectStoreBackend;

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        match ErrorReport::from_error(&e).to_json_pretty() {
            Ok(report) => eprintln!("{}", report),
            Err(_) => eprintln!("Error: {}", e),
        }
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle subcommands or run one backup
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_subcommand()? {
        return Ok(());
    }

    let config = cli.config().clone();
    let search = Arc::new(CloudSearchClient::from_config(&config)?);
    let store = Arc::new(ObjectStoreBackend::from_config(&config));

    let token = csbackup::backup(config, search, store).await?;
    println!("{}", token);
    Ok(())
}

/// Initialize logging on stderr
///
/// `RUST_LOG` wins when set; otherwise the level comes from the verbosity
/// flags or the configuration.
fn initialize_logging(cli: &CliInterface) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().as_str().to_lowercase()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
