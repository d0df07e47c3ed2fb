//! Common infrastructure shared by the conduit crates
//!
//! This crate provides:
//! - A cheaply cloneable [`Error`] with kind, context and source chaining
//! - An `err!` macro for building kind + context errors in one line
//! - [`LoggingTransformer`], the one place logging gets initialized

pub mod error;

pub use error::*;
