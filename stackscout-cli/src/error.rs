//! CLI-specific error types and exit code mapping

use stackscout_collector::CollectorError;
use stackscout_core::error::StackscoutError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The registry has no such package or image.
    #[error("not found: {0}")]
    NotFound(String),

    /// A scan job finished as FAILED or did not finish in time.
    #[error("scan error: {0}")]
    Scan(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from stackscout-core.
    #[error("{0}")]
    Core(#[from] StackscoutError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                              |
    /// |------|--------------------------------------|
    /// | 0    | Success                              |
    /// | 1    | General / command error              |
    /// | 2    | Configuration error                  |
    /// | 3    | Package or image not found           |
    /// | 4    | Scan job failed or timed out         |
    /// | 10   | IO error                             |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::NotFound(_) => 3,
            Self::Scan(_) => 4,
            Self::Io(_) => 10,
            Self::Core(StackscoutError::Config(_)) => 2,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<CollectorError> for CliError {
    fn from(e: CollectorError) -> Self {
        match e {
            CollectorError::NotFound { .. } => Self::NotFound(e.to_string()),
            CollectorError::Config { .. } => Self::Config(e.to_string()),
            other => Self::Command(other.to_string()),
        }
    }
}
