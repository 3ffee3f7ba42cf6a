//! Command-line interface for csbackup
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Reading the deployment environment variables (`BUCKET_NAME`, ...)
//! - Configuration loading and layering
//! - Subcommands that inspect the configuration
//!
//! Every setting can come from a flag, an environment variable, or the
//! configuration file, in that order of precedence.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::Level;

use crate::config::{BackupConfig, OutputMode, RunMode, StoreKind};
use crate::error::Result;

/// Interpret a deployment flag. Only `true`, `TRUE` and `1` enable it.
fn parse_flag(value: &str) -> std::result::Result<bool, String> {
    Ok(matches!(value.trim(), "true" | "TRUE" | "1"))
}

/// Parse an object storage provider name.
fn parse_store(value: &str) -> std::result::Result<StoreKind, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "s3" => Ok(StoreKind::S3),
        "local" => Ok(StoreKind::Local),
        other => Err(format!("unknown store '{other}', expected 's3' or 'local'")),
    }
}

/// Back up a search index to object storage
#[derive(Parser, Debug)]
#[command(
    name = "csbackup",
    version,
    about = "Back up a search index to object storage",
    long_about = "Exports every document of a search index domain, page by page, either as
one JSON array or as one object per batch plus a manifest."
)]
pub struct CliArgs {
    /// Destination bucket name
    #[arg(long, env = "BUCKET_NAME", value_name = "NAME")]
    pub bucket: Option<String>,

    /// Search endpoint of the index domain (queried without SigV4 signing)
    #[arg(long, env = "DOCUMENT_ENDPOINT", value_name = "HOST")]
    pub endpoint: Option<String>,

    /// Region of the bucket, also recorded in the backup summary
    #[arg(long, env = "REGION", value_name = "REGION")]
    pub region: Option<String>,

    /// Fallback for --region
    #[arg(long = "aws-region", env = "AWS_REGION", hide = true)]
    pub aws_region: Option<String>,

    /// Write to a fixed key instead of a date/time prefix
    #[arg(long, env = "ONE_SHOT", value_name = "FLAG", value_parser = parse_flag)]
    pub one_shot: Option<bool>,

    /// Maximum number of documents per page
    #[arg(long, env = "BATCH_SIZE", value_name = "N")]
    pub batch_size: Option<u32>,

    /// Name of the backup file or manifest
    #[arg(long, env = "BACKUP_INDEX_NAME", value_name = "NAME")]
    pub index_name: Option<String>,

    /// Text encoding of the produced objects
    #[arg(long, env = "ENCODING", value_name = "ENCODING")]
    pub encoding: Option<String>,

    /// Produce one JSON array instead of one object per batch
    #[arg(long, env = "SINGLE_FILE", value_name = "FLAG", value_parser = parse_flag)]
    pub single_file: Option<bool>,

    /// Object storage provider: s3 or local
    #[arg(long, env = "BACKUP_STORE", value_name = "STORE", value_parser = parse_store)]
    pub store: Option<StoreKind>,

    /// Root directory of the local object store
    #[arg(long, env = "BACKUP_STORE_ROOT", value_name = "DIR")]
    pub store_root: Option<PathBuf>,

    /// Directory for the local scratch buffer
    #[arg(long, env = "BACKUP_SCRATCH_DIR", value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", env = "BACKUP_CONFIG", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Show a progress spinner
    #[arg(long)]
    pub progress: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for csbackup
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version,

    /// Inspect the effective configuration
    Config {
        /// Print the effective configuration as TOML
        #[arg(long)]
        show: bool,

        /// Validate the effective configuration
        #[arg(long)]
        validate: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Effective configuration
    config: BackupConfig,
}

impl CliInterface {
    /// Parse the process arguments and load the configuration
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Build the interface from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and apply arguments on top
    fn load_config(args: &CliArgs) -> Result<BackupConfig> {
        let mut config = BackupConfig::load_from_file(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, args);
        Ok(config)
    }

    /// Override configuration values with arguments where provided
    fn apply_args_to_config(config: &mut BackupConfig, args: &CliArgs) {
        if let Some(bucket) = &args.bucket {
            config.target.bucket = bucket.clone();
        }
        if let Some(region) = args.region.as_ref().or(args.aws_region.as_ref()) {
            config.target.region = region.clone();
        }
        if let Some(store) = args.store {
            config.target.store = store;
        }
        if let Some(root) = &args.store_root {
            config.target.store_root = root.clone();
        }

        if let Some(endpoint) = &args.endpoint {
            config.search.endpoint = endpoint.clone();
        }
        if let Some(size) = args.batch_size {
            config.search.page_size = size;
        }

        if let Some(one_shot) = args.one_shot {
            config.export.run_mode = if one_shot {
                RunMode::OneShot
            } else {
                RunMode::TimePartitioned
            };
        }
        if let Some(single_file) = args.single_file {
            config.export.output_mode = if single_file {
                OutputMode::SingleFile
            } else {
                OutputMode::PerBatch
            };
        }
        if let Some(name) = &args.index_name {
            config.export.file_name = name.clone();
        }
        if let Some(encoding) = &args.encoding {
            config.export.encoding = encoding.clone();
        }
        if let Some(dir) = &args.scratch_dir {
            config.export.scratch_dir = Some(dir.clone());
        }
        if args.progress {
            config.export.show_progress = true;
        }
    }

    /// Handle subcommands
    ///
    /// # Returns
    /// * `Result<bool>` - true if a subcommand ran and the backup should be skipped
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            None => Ok(false),
            Some(Commands::Version) => {
                println!("csbackup {}", crate::VERSION);
                Ok(true)
            }
            Some(Commands::Config { show, validate }) => {
                if *validate || !*show {
                    self.config.validate()?;
                    println!("Configuration is valid");
                }
                if *show {
                    print!("{}", self.config.to_toml()?);
                }
                Ok(true)
            }
        }
    }

    /// Log level chosen by flags, falling back to the configuration
    pub fn log_level(&self) -> Level {
        if self.args.very_verbose {
            Level::TRACE
        } else if self.args.verbose {
            Level::DEBUG
        } else if self.args.quiet {
            Level::ERROR
        } else {
            self.config.logging.level.to_tracing_level()
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Path of the configuration file, if one was given
    pub fn config_path(&self) -> Option<&Path> {
        self.args.config_file.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};
    use std::io::Write;

    /// Parse `args` with environment fallbacks disabled, so variables set
    /// on the machine running the tests cannot leak in.
    fn parse(args: &[&str]) -> CliArgs {
        let matches = CliArgs::command()
            .mut_args(|arg| arg.env(None::<&str>))
            .try_get_matches_from(std::iter::once("csbackup").chain(args.iter().copied()))
            .unwrap();
        CliArgs::from_arg_matches(&matches).unwrap()
    }

    #[test]
    fn test_parse_flag() {
        for value in ["true", "TRUE", "1"] {
            assert_eq!(parse_flag(value), Ok(true));
        }
        for value in ["0", "false", "True", "yes", ""] {
            assert_eq!(parse_flag(value), Ok(false));
        }
    }

    #[test]
    fn test_parse_store() {
        assert_eq!(parse_store("s3"), Ok(StoreKind::S3));
        assert_eq!(parse_store("LOCAL"), Ok(StoreKind::Local));
        assert!(parse_store("gcs").is_err());

        let cli = CliInterface::from_args(parse(&["--store", "local", "--store-root", "/srv"]))
            .unwrap();
        assert_eq!(cli.config().target.store, StoreKind::Local);
        assert_eq!(cli.config().target.store_root, PathBuf::from("/srv"));
    }

    #[test]
    fn test_environment_is_ignored_by_test_parser() {
        let args = parse(&[]);
        assert!(args.bucket.is_none());
        assert!(args.region.is_none());
        assert!(args.aws_region.is_none());
        assert!(args.config_file.is_none());
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = CliInterface::from_args(parse(&[
            "--bucket",
            "my-backups",
            "--endpoint",
            "search-docs.example.com",
            "--one-shot",
            "1",
            "--single-file",
            "0",
            "--batch-size",
            "500",
            "--index-name",
            "index.json",
        ]))
        .unwrap();

        let config = cli.config();
        assert_eq!(config.target.bucket, "my-backups");
        assert_eq!(config.search.endpoint, "search-docs.example.com");
        assert_eq!(config.export.run_mode, RunMode::OneShot);
        assert_eq!(config.export.output_mode, OutputMode::PerBatch);
        assert_eq!(config.search.page_size, 500);
        assert_eq!(config.export.file_name, "index.json");
    }

    #[test]
    fn test_region_falls_back_to_aws_region() {
        let cli = CliInterface::from_args(parse(&["--aws-region", "eu-west-1"])).unwrap();
        assert_eq!(cli.config().target.region, "eu-west-1");

        let cli = CliInterface::from_args(parse(&[
            "--aws-region",
            "eu-west-1",
            "--region",
            "us-east-2",
        ]))
        .unwrap();
        assert_eq!(cli.config().target.region, "us-east-2");
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[target]\nbucket = \"from-file\"\n\n[search]\npage_size = 250\n"
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let cli = CliInterface::from_args(parse(&["-c", path, "--bucket", "from-flag"])).unwrap();
        assert_eq!(cli.config().target.bucket, "from-flag");
        assert_eq!(cli.config().search.page_size, 250);
        assert_eq!(cli.config_path(), Some(file.path()));
    }

    #[test]
    fn test_log_level() {
        let cli = CliInterface::from_args(parse(&["-v"])).unwrap();
        assert_eq!(cli.log_level(), Level::DEBUG);

        let cli = CliInterface::from_args(parse(&["--vv"])).unwrap();
        assert_eq!(cli.log_level(), Level::TRACE);

        let cli = CliInterface::from_args(parse(&["-q"])).unwrap();
        assert_eq!(cli.log_level(), Level::ERROR);
    }

    #[test]
    fn test_config_subcommand() {
        let args = parse(&["config", "--show"]);
        assert!(matches!(
            args.command,
            Some(Commands::Config { show: true, validate: false })
        ));
    }
}
