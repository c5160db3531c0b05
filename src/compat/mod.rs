//! Conversions from other error handling libraries.
//!
//! Any [`core::error::Error`] converts with [`NativeError::from_error`]. The
//! report types of `anyhow` and `eyre` do not implement that trait, so their
//! submodules implement [`IntoNativeError`] and [`IntoException`] instead:
//!
//! - `anyhow1` for `anyhow` 1.x (feature `compat-anyhow1`)
//! - `eyre06` for `eyre` 0.6.x (feature `compat-eyre06`)
//!
//! In both cases the error chain becomes the cause chain of the resulting
//! [`NativeError`], outermost first, and the stack is captured at conversion.
//!
//! The other direction needs no help: [`Exception`] implements
//! [`core::error::Error`] and is `Send + Sync + 'static`, so `?` converts it
//! into an `anyhow::Error` or an `eyre::Report` directly.
//!
//! ```
//! # #[cfg(feature = "compat-anyhow1")] {
//! use blunder::compat::IntoException;
//!
//! fn legacy() -> anyhow::Result<u16> {
//!     anyhow::bail!("port missing");
//! }
//!
//! let exception = legacy().into_exception().unwrap_err();
//! assert_eq!(exception.message(), "port missing");
//! # }
//! ```
//!
//! [`Exception`]: crate::Exception

use crate::value::NativeError;

/// Converts a foreign error report into a [`NativeError`].
pub trait IntoNativeError {
    /// Performs the conversion.
    fn into_native_error(self) -> NativeError;
}

/// Converts a foreign error, or a `Result` carrying one, into this crate's
/// types.
pub trait IntoException {
    /// [`Exception`](crate::Exception) for errors, `Result<T, Exception>` for
    /// results.
    type Output;

    /// Performs the conversion. Errors are wrapped by
    /// [`Exception::from_value`](crate::Exception::from_value) after
    /// [`into_native_error`](IntoNativeError::into_native_error).
    fn into_exception(self) -> Self::Output;
}

#[cfg(feature = "compat-anyhow1")]
#[cfg_attr(docsrs, doc(cfg(feature = "compat-anyhow1")))]
pub mod anyhow1;

#[cfg(feature = "compat-eyre06")]
#[cfg_attr(docsrs, doc(cfg(feature = "compat-eyre06")))]
pub mod eyre06;
