//! Error handling with context propagation
//!
//! Provides the shared error type used across the workspace:
//! - Error chaining and context preservation
//! - Backtrace capture (feature `full-backtrace`)
//! - Structured error kinds with thiserror
//! - Cheap cloning, so one fault can be observed by many readers

pub mod constructors;
pub mod display;
pub mod extensions;
pub mod logging;
pub mod macros;
pub mod types;

pub use extensions::ResultExt;
pub use logging::LoggingTransformer;
pub use types::{Error, ErrorKind, Result};
