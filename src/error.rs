//! Huginn error types

/// Huginn error types
///
/// `Clone` because a single executor failure may be delivered to every
/// request of a combined group.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HuginnError {
    // Caller-side errors
    #[error("request cancelled")]
    Cancelled,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Executor errors
    #[error("execution failed: {0}")]
    Execution(String),

    #[error("command not supported: {0}")]
    Unsupported(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Lifecycle errors
    /// Background machinery is gone, or a request was dropped without
    /// being fulfilled.
    #[error("optimizer is shut down")]
    Shutdown,
}

impl HuginnError {
    /// Whether this error came from the caller's own cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
