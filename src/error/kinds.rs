use std::{fmt, io};

/// Crate-wide `Result` type using [`BackupError`] as the error.
pub type Result<T> = std::result::Result<T, BackupError>;

/// Top-level error type for backup runs.
///
/// Every failure aborts the run; there is no partial-success variant.
#[derive(Debug)]
pub enum BackupError {
    /// Search service errors.
    Search(SearchError),

    /// Object storage errors.
    Storage(StorageError),

    /// Local scratch buffer errors.
    Buffer(BufferError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// JSON serialization errors.
    Serialization(serde_json::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Coarse classification used for logging and exit reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A query or storage call failed. Not retried internally.
    TransientService,

    /// Opening, writing or flushing the local buffer failed.
    LocalResource,

    /// Invalid or missing configuration.
    Configuration,

    /// Anything else.
    Internal,
}

/// Search-service errors.
#[derive(Debug)]
pub enum SearchError {
    /// The request never produced a response (network, TLS, timeout).
    RequestFailed(String),

    /// The service answered with a non-success status.
    ServiceError { status: u16, message: String },

    /// The response body could not be decoded.
    InvalidResponse(String),

    /// A non-empty page arrived without a continuation cursor.
    MissingCursor { batch_hits: usize },

    /// The configured endpoint is not a usable URL.
    InvalidEndpoint(String),
}

/// Object-storage errors.
#[derive(Debug)]
pub enum StorageError {
    /// A single-shot put failed.
    PutFailed { key: String, message: String },

    /// A streamed upload failed.
    UploadFailed { key: String, message: String },

    /// The key cannot be mapped onto the store.
    InvalidKey(String),

    /// No client could be opened for the bucket.
    BucketUnavailable { bucket: String, message: String },
}

/// Local append-buffer errors.
#[derive(Debug)]
pub enum BufferError {
    /// Creating the scratch file failed.
    OpenFailed(String),

    /// Appending to the scratch file failed.
    WriteFailed(String),

    /// Flushing or closing the scratch file failed.
    FlushFailed(String),

    /// The buffer was already finished.
    AlreadyFinished,
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Only UTF-8 output is produced.
    UnsupportedEncoding(String),
}

impl BackupError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackupError::Search(_) | BackupError::Storage(_) => ErrorKind::TransientService,
            BackupError::Buffer(_) | BackupError::Io(_) => ErrorKind::LocalResource,
            BackupError::Config(_) => ErrorKind::Configuration,
            BackupError::Serialization(_) | BackupError::Generic(_) => ErrorKind::Internal,
        }
    }
}

impl ErrorKind {
    /// Stable identifier used in error reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransientService => "transient_service",
            ErrorKind::LocalResource => "local_resource",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Internal => "internal",
        }
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupError::Search(e) => write!(f, "Search error: {e}"),
            BackupError::Storage(e) => write!(f, "Storage error: {e}"),
            BackupError::Buffer(e) => write!(f, "Buffer error: {e}"),
            BackupError::Config(e) => write!(f, "Configuration error: {e}"),
            BackupError::Io(e) => write!(f, "I/O error: {e}"),
            BackupError::Serialization(e) => write!(f, "Serialization error: {e}"),
            BackupError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::RequestFailed(msg) => write!(f, "Request failed: {msg}"),
            SearchError::ServiceError { status, message } => {
                write!(f, "Service returned {status}: {message}")
            }
            SearchError::InvalidResponse(msg) => write!(f, "Invalid response: {msg}"),
            SearchError::MissingCursor { batch_hits } => {
                write!(f, "Page of {batch_hits} records carried no cursor")
            }
            SearchError::InvalidEndpoint(endpoint) => write!(f, "Invalid endpoint: {endpoint}"),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::PutFailed { key, message } => {
                write!(f, "Failed to put object '{key}': {message}")
            }
            StorageError::UploadFailed { key, message } => {
                write!(f, "Failed to upload object '{key}': {message}")
            }
            StorageError::InvalidKey(key) => write!(f, "Invalid object key: {key}"),
            StorageError::BucketUnavailable { bucket, message } => {
                write!(f, "Cannot open bucket '{bucket}': {message}")
            }
        }
    }
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::OpenFailed(msg) => write!(f, "Failed to open buffer: {msg}"),
            BufferError::WriteFailed(msg) => write!(f, "Failed to write buffer: {msg}"),
            BufferError::FlushFailed(msg) => write!(f, "Failed to flush buffer: {msg}"),
            BufferError::AlreadyFinished => write!(f, "Buffer already finished"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::UnsupportedEncoding(enc) => {
                write!(f, "Unsupported encoding '{enc}', only UTF-8 is supported")
            }
        }
    }
}

impl std::error::Error for BackupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackupError::Io(e) => Some(e),
            BackupError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}
impl std::error::Error for SearchError {}
impl std::error::Error for StorageError {}
impl std::error::Error for BufferError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to BackupError ========================= */

impl From<io::Error> for BackupError {
    fn from(err: io::Error) -> Self {
        BackupError::Io(err)
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        BackupError::Serialization(err)
    }
}

impl From<reqwest::Error> for BackupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackupError::Search(SearchError::InvalidResponse(err.to_string()))
        } else {
            BackupError::Search(SearchError::RequestFailed(err.to_string()))
        }
    }
}

impl From<SearchError> for BackupError {
    fn from(err: SearchError) -> Self {
        BackupError::Search(err)
    }
}

impl From<StorageError> for BackupError {
    fn from(err: StorageError) -> Self {
        BackupError::Storage(err)
    }
}

impl From<BufferError> for BackupError {
    fn from(err: BufferError) -> Self {
        BackupError::Buffer(err)
    }
}

impl From<ConfigError> for BackupError {
    fn from(err: ConfigError) -> Self {
        BackupError::Config(err)
    }
}

impl From<String> for BackupError {
    fn from(msg: String) -> Self {
        BackupError::Generic(msg)
    }
}

impl From<&str> for BackupError {
    fn from(msg: &str) -> Self {
        BackupError::Generic(msg.to_owned())
    }
}
