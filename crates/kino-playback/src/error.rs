//! Error types for Kino Playback
//!
//! The normalizer itself never fails: disorder in the raw event stream is
//! absorbed silently. Errors only arise at the edges, when parsing event
//! names, validating configuration, loading traces or driving a subscription.

use thiserror::Error;

/// Result type alias for playback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Playback error types
#[derive(Error, Debug)]
pub enum Error {
    // Vocabulary errors
    #[error("Unknown media event: {name}")]
    UnknownEvent { name: String },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Trace errors
    #[error("Invalid trace: {0}")]
    Trace(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Subscription errors
    #[error("Subscription task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an unknown event error
    pub fn unknown_event(name: impl Into<String>) -> Self {
        Error::UnknownEvent { name: name.into() }
    }

    /// Returns the error code for logs and tooling
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::UnknownEvent { .. } => "UNKNOWN_EVENT",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Trace(_) => "INVALID_TRACE",
            Error::Json(_) => "JSON",
            Error::Join(_) => "SUBSCRIPTION",
            Error::Io(_) => "IO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::unknown_event("foo").error_code(), "UNKNOWN_EVENT");
        assert_eq!(Error::InvalidConfig("x".into()).error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_error_display() {
        let err = Error::unknown_event("rewind");
        assert_eq!(err.to_string(), "Unknown media event: rewind");
    }
}
