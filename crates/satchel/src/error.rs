//! Error types for session store operations.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A get/set/save was attempted before `start` completed.
    #[error("Session not started: {0}")]
    NotStarted(String),

    /// Error reported by a persistence handler.
    #[error("Handler error: {0}")]
    Handler(String),

    /// IO error from a filesystem-backed handler.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encode or decode failure other than running out of input.
    #[error("Codec error: {0}")]
    Codec(String),

    /// A cached value was read back as a different type than it was stored with.
    #[error("Type mismatch for key {key}: cached value is not a {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
    },
}

impl Error {
    /// Build a handler error from any displayable cause.
    pub fn handler(cause: impl std::fmt::Display) -> Self {
        Self::Handler(cause.to_string())
    }

    /// Whether this error signals caller-ordering misuse rather than a fault.
    pub fn is_not_started(&self) -> bool {
        matches!(self, Self::NotStarted(_))
    }
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
