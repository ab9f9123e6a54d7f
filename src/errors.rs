use thiserror::Error;

/// Application-wide error type - single point of truth
#[derive(Error, Debug)]
pub enum AppError {
    /// Stream source operations
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// File I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading and export
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration issues
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bucket width must be strictly positive
    #[error("Invalid granularity: {0}")]
    InvalidGranularity(String),

    /// Conflicting or inverted time-range options
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    /// Caller passed an argument outside its contract
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Data validation/parsing
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Invalid message record in a dump file
    #[error("Invalid message record at line {line}: {reason}")]
    InvalidRecord { line: usize, reason: String },

    /// Query server failures
    #[error("Server error: {0}")]
    Server(String),
}

/// Stream source error types
#[derive(Error, Debug)]
pub enum SourceError {
    /// Source could not be opened or reached
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Requested stream does not exist on the source
    #[error("Stream not found: {name}")]
    StreamNotFound { name: String },

    /// Stream exists but is not governed by limits retention
    #[error("Stream {name:?} has {policy} retention policy, not limits")]
    NotLimitsRetention { name: String, policy: String },

    /// A batch request failed
    #[error("Batch fetch failed: {stream} - {message}")]
    FetchFailed { stream: String, message: String },

    /// Retry limit exceeded for a source operation
    #[error("Max retries exceeded: {operation}")]
    MaxRetriesExceeded { operation: String },

    /// Source request timed out
    #[error("Request timeout: {timeout_seconds}s for {operation}")]
    Timeout {
        timeout_seconds: u64,
        operation: String,
    },
}

/// Application-wide result type - single point of truth
pub type AppResult<T> = Result<T, AppError>;

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidData(format!("JSON error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<hyper::Error> for AppError {
    fn from(err: hyper::Error) -> Self {
        AppError::Server(err.to_string())
    }
}
