/// Creates an [`Exception`](crate::Exception).
///
/// With a literal or a format string and arguments, the message is formatted
/// the same way as [`format!()`](std::format) and a new exception of the root
/// kind is created. Any other single expression is normalized with
/// [`Exception::from_value`](crate::Exception::from_value), so existing
/// exceptions come back unchanged and native errors are wrapped.
///
/// # Examples
///
/// ```
/// use blunder::{NativeError, exception};
///
/// let user = "alice";
/// let exception = exception!("no account for {user}");
/// assert_eq!(exception.to_string(), "Exception: no account for alice");
///
/// let exception = exception!("{} retries left", 3);
/// assert_eq!(exception.message(), "3 retries left");
///
/// let error = NativeError::with_name("TypeError", "not a function");
/// let exception = exception!(error.clone());
/// assert_eq!(exception.stack(), error.stack());
/// ```
#[macro_export]
macro_rules! exception {
    ($msg:literal $(,)?) => {
        $crate::Exception::new($crate::__private::format!($msg))
    };
    ($value:expr $(,)?) => {
        $crate::Exception::from_value($value, $crate::Options::new())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Exception::new($crate::__private::format!($fmt, $($arg)*))
    };
}

/// Return early with an exception.
///
/// This is equivalent to writing `return Err(exception!(...).into());`.
///
/// # Examples
///
/// ```
/// use blunder::{Exception, bail};
///
/// fn parse_port(raw: &str) -> Result<u16, Exception> {
///     match raw.parse() {
///         Ok(port) => Ok(port),
///         Err(_) => bail!("invalid port {raw:?}"),
///     }
/// }
///
/// assert_eq!(parse_port("8080").unwrap(), 8080);
/// assert_eq!(parse_port("http").unwrap_err().message(), "invalid port \"http\"");
/// ```
#[macro_export]
macro_rules! bail {
    ($($args:tt)*) => {
        return $crate::__private::Err($crate::exception!($($args)*).into())
    };
}

/// Declares static [`ExceptionKind`](crate::ExceptionKind)s.
///
/// A kind without `extends` is a direct child of
/// [`EXCEPTION`](crate::EXCEPTION).
///
/// ```
/// use blunder::{EXCEPTION, exception_kind};
///
/// exception_kind! {
///     /// Anything that went wrong on the network.
///     pub static NETWORK_ERROR: "NetworkError";
///     pub static TIMEOUT_ERROR: "TimeoutError" extends NETWORK_ERROR;
/// }
///
/// assert!(TIMEOUT_ERROR.is_a(&NETWORK_ERROR));
/// assert!(TIMEOUT_ERROR.is_a(&EXCEPTION));
/// assert!(!NETWORK_ERROR.is_a(&TIMEOUT_ERROR));
/// ```
#[macro_export]
macro_rules! exception_kind {
    () => {};
    (
        $(#[$meta:meta])*
        $vis:vis static $ident:ident: $name:literal extends $parent:path;
        $($rest:tt)*
    ) => {
        $(#[$meta])*
        $vis static $ident: $crate::ExceptionKind =
            $crate::ExceptionKind::new($name, ::core::option::Option::Some(&$parent));
        $crate::exception_kind!($($rest)*);
    };
    (
        $(#[$meta:meta])*
        $vis:vis static $ident:ident: $name:literal;
        $($rest:tt)*
    ) => {
        $(#[$meta])*
        $vis static $ident: $crate::ExceptionKind =
            $crate::ExceptionKind::new($name, ::core::option::Option::Some(&$crate::EXCEPTION));
        $crate::exception_kind!($($rest)*);
    };
}

/// Builds an [`Object`](crate::Object) from `key => value` pairs, in order.
///
/// ```
/// use blunder::{Value, object};
///
/// let data = object! { "requestId" => "a1b2", "attempt" => 2 };
/// assert_eq!(data.keys(), ["requestId", "attempt"]);
/// assert_eq!(data.get("attempt"), Some(Value::from(2)));
/// assert!(object! {}.is_empty());
/// ```
#[macro_export]
macro_rules! object {
    () => {
        $crate::Object::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let object = $crate::Object::new();
        $(
            object.insert($key, $value);
        )+
        object
    }};
}

#[cfg(test)]
mod tests {
    use crate::{Exception, NativeError, Options, Value};

    exception_kind! {
        static PARENT: "Parent";
        static CHILD: "Child" extends PARENT;
    }

    #[test]
    fn exception_from_literal_and_format() {
        let retries = 2;
        assert_eq!(exception!("plain").message(), "plain");
        assert_eq!(exception!("left: {retries}").message(), "left: 2");
        assert_eq!(exception!("{}-{}", "a", 1).message(), "a-1");
    }

    #[test]
    fn exception_from_expression_normalizes() {
        let existing = Exception::new("kept");
        assert!(exception!(existing.clone()).ptr_eq(&existing));

        let error = NativeError::new("wrapped");
        let wrapped = exception!(error.clone());
        assert_eq!(wrapped.message(), "wrapped");
        assert_eq!(wrapped.source(), Some(&Value::from(error)));
    }

    #[test]
    fn bail_returns_early() {
        fn check(value: i32) -> crate::Result<i32> {
            if value < 0 {
                bail!("negative: {value}");
            }
            Ok(value)
        }
        assert_eq!(check(1).unwrap(), 1);
        assert_eq!(check(-1).unwrap_err().message(), "negative: -1");
    }

    #[test]
    fn kinds_default_to_the_root_parent() {
        assert!(PARENT.parent().is_some_and(|parent| core::ptr::eq(parent, &crate::EXCEPTION)));
        assert!(CHILD.parent().is_some_and(|parent| core::ptr::eq(parent, &PARENT)));
        assert_eq!(CHILD.create("", Options::new()).name(), "Child");
    }

    #[test]
    fn object_keeps_insertion_order() {
        let data = object! { "b" => 1, "a" => "two", };
        assert_eq!(data.keys(), ["b", "a"]);
        assert_eq!(data.get("a"), Some(Value::from("two")));
    }
}
