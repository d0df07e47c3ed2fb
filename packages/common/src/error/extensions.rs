//! Extension trait for attaching context to foreign results

use super::types::{Error, ErrorKind, Result};
use std::fmt;

/// Attach context while converting a foreign error into [`Error`]
pub trait ResultExt<T> {
    /// Wrap the error with `kind` and a context message
    ///
    /// # Errors
    ///
    /// Returns the wrapped error if `self` is `Err`.
    fn with_kind<C: fmt::Display>(self, kind: ErrorKind, context: C) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_kind<C: fmt::Display>(self, kind: ErrorKind, context: C) -> Result<T> {
        self.map_err(|e| Error::with_source(kind, e).context(context))
    }
}
