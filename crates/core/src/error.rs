//! Error types for the document store
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Policy: `load()` failures never surface here — they degrade to schema
//! defaults inside the store. `save()` failures always surface; a failed
//! save means nothing was written.

use std::io;
use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error types for the document store
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Backing file unreadable or not valid JSON
    #[error("parse error: {0}")]
    Parse(String),

    /// Document could not be serialized
    #[error("encode error: {0}")]
    Encode(String),

    /// Serialized document failed a sanity check
    #[error("validation failed: {0}")]
    Validation(String),

    /// Temp-file or final-file write incomplete
    #[error("write incomplete: {0}")]
    Write(String),

    /// Exclusive lock on the backing file not obtainable
    #[error("lock unavailable: {0}")]
    Lock(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let err = StoreError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        let msg = err.to_string();
        assert!(msg.contains("I/O error"));
    }

    #[test]
    fn test_error_display_parse() {
        let err = StoreError::Parse("unexpected end of input".to_string());
        let msg = err.to_string();
        assert!(msg.contains("parse error"));
        assert!(msg.contains("unexpected end of input"));
    }

    #[test]
    fn test_error_display_encode() {
        let err = StoreError::Encode("key must be a string".to_string());
        assert!(err.to_string().contains("encode error"));
    }

    #[test]
    fn test_error_display_validation() {
        let err = StoreError::Validation("serialized document suspiciously small".to_string());
        let msg = err.to_string();
        assert!(msg.contains("validation failed"));
        assert!(msg.contains("suspiciously small"));
    }

    #[test]
    fn test_error_display_write() {
        let err = StoreError::Write("wrote 12 of 4096 bytes".to_string());
        assert!(err.to_string().contains("write incomplete"));
    }

    #[test]
    fn test_error_display_lock() {
        let err = StoreError::Lock("held by another process".to_string());
        assert!(err.to_string().contains("lock unavailable"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(7)
        }

        fn returns_error() -> Result<i32> {
            Err(StoreError::Lock("test".to_string()))
        }

        assert_eq!(returns_result().unwrap(), 7);
        assert!(returns_error().is_err());
    }
}
