//! Error types for threadmark operations.
//!
//! Most failures inside an extraction attempt never surface here: strategies
//! degrade to a short result and the orchestrator falls back. [`ThreadmarkError`]
//! covers the conditions a caller actually has to handle, the terminal
//! "no content found" outcome included.
//!
//! # Example
//!
//! ```rust
//! use threadmark_core::{ThreadmarkError, Result};
//!
//! fn require_turns(count: usize) -> Result<()> {
//!     if count < 2 {
//!         return Err(ThreadmarkError::NoContent);
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for export operations.
#[derive(Error, Debug)]
pub enum ThreadmarkError {
    /// Every configured strategy produced fewer than two turns.
    #[error("No conversation content could be found on the page")]
    NoContent,

    /// A selector in the markup profile is not valid CSS.
    #[error("Invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// The intercepted export payload never arrived.
    #[error("Export capture timed out after {timeout_ms} ms")]
    CaptureTimeout { timeout_ms: u64 },

    /// The capture bridge could not patch the page.
    #[error("Capture bridge failed: {0}")]
    CaptureBridge(String),

    /// A captured payload could not be decoded to UTF-8 text.
    #[error("Failed to decode captured payload: {0}")]
    Decode(String),

    /// The strategy priority list is not a permutation of the three strategies.
    #[error("Invalid strategy priority: {0}")]
    InvalidPriority(String),

    /// Preference or settings errors.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File I/O errors.
    #[error("Failed to write to file: {0}")]
    WriteError(#[from] std::io::Error),

    /// Preference files are JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for ThreadmarkError.
pub type Result<T> = std::result::Result<T, ThreadmarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ThreadmarkError::NoContent;
        assert!(err.to_string().contains("No conversation content"));
    }

    #[test]
    fn test_capture_timeout_error() {
        let err = ThreadmarkError::CaptureTimeout { timeout_ms: 8000 };
        assert!(err.to_string().contains("8000"));
    }

    #[test]
    fn test_invalid_selector_error() {
        let err = ThreadmarkError::InvalidSelector { selector: "[[x".to_string(), reason: "unexpected token".to_string() };
        let msg = err.to_string();
        assert!(msg.contains("[[x"));
        assert!(msg.contains("unexpected token"));
    }

    #[test]
    fn test_json_error_conversion() {
        let err: ThreadmarkError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ThreadmarkError::Json(_)));
    }
}
