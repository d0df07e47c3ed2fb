//! Core error types and definitions

use std::sync::Arc;
use thiserror::Error;

/// Core error type with context propagation support
///
/// Cloning is an `Arc` bump, which is what allows a terminal fault to be
/// handed to every reader that observes it.
#[derive(Debug, Clone)]
pub struct Error {
    pub(super) inner: Arc<ErrorInner>,
}

#[derive(Debug)]
pub(super) struct ErrorInner {
    pub kind: ErrorKind,
    pub context: Option<String>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    #[cfg(feature = "full-backtrace")]
    pub backtrace: backtrace::Backtrace,
}

/// Different kinds of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// The operation observed a cancellation signal
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O related errors
    #[error("I/O error")]
    Io,

    /// Configuration errors
    #[error("Configuration error")]
    Configuration,

    /// Validation errors
    #[error("Validation error")]
    Validation,

    /// Operation timeout
    #[error("Operation timed out")]
    Timeout,

    /// Internal error
    #[error("Internal error")]
    Internal,

    /// Other error with custom message
    #[error("{0}")]
    Other(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;
