//! Integration with [`eyre`] 0.6.x.
//!
//! ```
//! use blunder::{Value, compat::IntoNativeError};
//!
//! let error = eyre::eyre!("disk full").wrap_err("saving settings");
//! let native = error.into_native_error();
//! assert_eq!(native.message(), "saving settings");
//! assert_eq!(
//!     native.cause().as_ref().and_then(Value::as_error).map(|cause| cause.message().to_owned()),
//!     Some("disk full".to_owned())
//! );
//! ```

use super::{IntoException, IntoNativeError};
use crate::{
    exception::{Exception, Options},
    value::{NativeError, Value},
};

impl IntoNativeError for eyre::Report {
    fn into_native_error(self) -> NativeError {
        let error: &(dyn core::error::Error + Send + Sync + 'static) = self.as_ref();
        NativeError::from_chain("Error", error.to_string(), error.source())
    }
}

impl IntoException for eyre::Report {
    type Output = Exception;

    fn into_exception(self) -> Self::Output {
        Exception::from_value(self.into_native_error(), Options::new())
    }
}

impl<T> IntoException for eyre::Result<T> {
    type Output = Result<T, Exception>;

    fn into_exception(self) -> Self::Output {
        self.map_err(IntoException::into_exception)
    }
}

impl From<eyre::Report> for Value {
    fn from(error: eyre::Report) -> Self {
        Value::Error(error.into_native_error())
    }
}
