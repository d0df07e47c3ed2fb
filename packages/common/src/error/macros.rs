//! Error construction shorthand

/// Build an [`Error`](crate::Error) from a constructor name and an optional
/// formatted context
///
/// `err!(validation, "capacity {} is too large", n)` is
/// `Error::validation().context(format!("capacity {} is too large", n))`.
#[macro_export]
macro_rules! err {
    ($kind:ident) => {
        $crate::error::Error::$kind()
    };
    ($kind:ident, $($fmt:tt)+) => {
        $crate::error::Error::$kind().context(format!($($fmt)+))
    };
}
