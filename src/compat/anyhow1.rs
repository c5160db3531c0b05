//! Integration with [`anyhow`] 1.x.
//!
//! ```
//! use blunder::{Value, compat::IntoNativeError};
//!
//! let error = anyhow::anyhow!("disk full").context("saving settings");
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

impl IntoNativeError for anyhow::Error {
    fn into_native_error(self) -> NativeError {
        let error: &(dyn core::error::Error + Send + Sync + 'static) = self.as_ref();
        NativeError::from_chain("Error", error.to_string(), error.source())
    }
}

impl IntoException for anyhow::Error {
    type Output = Exception;

    fn into_exception(self) -> Self::Output {
        Exception::from_value(self.into_native_error(), Options::new())
    }
}

impl<T> IntoException for anyhow::Result<T> {
    type Output = Result<T, Exception>;

    fn into_exception(self) -> Self::Output {
        self.map_err(IntoException::into_exception)
    }
}

impl From<anyhow::Error> for Value {
    fn from(error: anyhow::Error) -> Self {
        Value::Error(error.into_native_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_becomes_causes() {
        let error = anyhow::anyhow!("root").context("middle").context("top");
        let native = error.into_native_error();
        assert_eq!(native.name(), "Error");
        assert_eq!(native.message(), "top");

        let middle = native.cause().and_then(|cause| cause.as_error().cloned()).unwrap();
        assert_eq!(middle.message(), "middle");
        let root = middle.cause().and_then(|cause| cause.as_error().cloned()).unwrap();
        assert_eq!(root.message(), "root");
        assert_eq!(root.stack(), "Error: root");
        assert!(root.cause().is_none());
    }

    #[test]
    fn results_keep_their_ok_value() {
        let ok: anyhow::Result<u8> = Ok(7);
        assert_eq!(ok.into_exception().unwrap(), 7);

        let failed: anyhow::Result<u8> = Err(anyhow::anyhow!("nope"));
        let exception = failed.into_exception().unwrap_err();
        assert_eq!(exception.to_string(), "Exception: nope");
        assert!(exception.source().and_then(Value::as_error).is_some());
    }

    #[test]
    fn exceptions_convert_into_anyhow() {
        fn inner() -> crate::Result<()> {
            Err(Exception::new("from blunder"))
        }
        fn outer() -> anyhow::Result<()> {
            inner()?;
            Ok(())
        }
        let error = outer().unwrap_err();
        assert_eq!(error.to_string(), "Exception: from blunder");
        assert!(error.downcast_ref::<Exception>().is_some());
    }
}
