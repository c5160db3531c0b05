//! The dynamic value model.
//!
//! A failure can be any value at all, and so can the contextual data that
//! travels with it. [`Value`] is the closed set of shapes blunder knows how
//! to normalize and serialize. Composite values ([`Array`], [`Object`],
//! [`NativeError`] and [`Exception`]) are shared handles: cloning one never
//! copies the node behind it, and two handles are equal only when they point
//! at the same node.
//!
//! # Examples
//!
//! ```
//! use blunder::{Array, Object, Value};
//!
//! let tags = Array::from(vec![Value::from("db"), Value::from(3)]);
//! let context = Object::new().with("tags", tags.clone());
//!
//! assert_eq!(context.get("tags"), Some(Value::from(tags)));
//! assert_eq!(Value::from(context).to_string(), "[object Object]");
//! ```

mod array;
mod error;
mod function;
mod object;

use alloc::{borrow::Cow, string::String, vec::Vec};
use core::fmt::{self, Write as _};

use chrono::{DateTime, Utc};

pub use self::{array::Array, error::NativeError, function::Function, object::Object};
pub(crate) use self::{error::header_line, function::short_type_name};
use crate::exception::Exception;

/// Values that carry no stable meaning outside the process that created them.
///
/// They are accepted everywhere a [`Value`] is, coerce to `[object <Tag>]`
/// and are dropped by the serializer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opaque {
    /// A pending computation.
    Promise,
    /// A compiled regular expression.
    RegExp,
    /// A raw binary buffer.
    ArrayBuffer,
    /// A platform event object.
    Event,
    /// A unique symbol.
    Symbol,
    /// A keyed collection.
    Map,
    /// A set collection.
    Set,
    /// A weakly keyed collection.
    WeakMap,
    /// A weak set collection.
    WeakSet,
}

impl Opaque {
    /// The tag used when the value is coerced to a string.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Opaque::Promise => "Promise",
            Opaque::RegExp => "RegExp",
            Opaque::ArrayBuffer => "ArrayBuffer",
            Opaque::Event => "Event",
            Opaque::Symbol => "Symbol",
            Opaque::Map => "Map",
            Opaque::Set => "Set",
            Opaque::WeakMap => "WeakMap",
            Opaque::WeakSet => "WeakSet",
        }
    }
}

/// Any value a failure or a piece of contextual data may take.
#[derive(Clone, Default)]
pub enum Value {
    /// The absence of a value.
    #[default]
    Undefined,
    /// An explicit empty value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A string.
    String(String),
    /// A point in time.
    Date(DateTime<Utc>),
    /// A callable, known only by its name.
    Function(Function),
    /// A shared ordered list.
    Array(Array),
    /// A shared key/value container.
    Object(Object),
    /// A foreign error-like value.
    Error(NativeError),
    /// A canonical exception.
    Exception(Exception),
    /// A value without a portable representation.
    Opaque(Opaque),
}

impl Value {
    /// Returns `true` for [`Value::Undefined`].
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns `true` for [`Value::Undefined`] and [`Value::Null`].
    #[must_use]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns the string slice if this is a [`Value::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is a [`Value::Number`].
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the array handle if this is a [`Value::Array`].
    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Returns the object handle if this is a [`Value::Object`].
    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Returns the error handle if this is a [`Value::Error`].
    #[must_use]
    pub fn as_error(&self) -> Option<&NativeError> {
        match self {
            Value::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the exception handle if this is a [`Value::Exception`].
    #[must_use]
    pub fn as_exception(&self) -> Option<&Exception> {
        match self {
            Value::Exception(exception) => Some(exception),
            _ => None,
        }
    }

    fn coerce_into(&self, out: &mut String, seen: &mut Vec<usize>) {
        match self {
            Value::Undefined => out.push_str("undefined"),
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => push_number(out, *n),
            Value::String(s) => out.push_str(s),
            Value::Date(date) => out.push_str(&date_to_string(date)),
            Value::Function(function) => {
                let _ = write!(out, "{function}");
            }
            Value::Array(array) => {
                let addr = array.addr();
                if seen.contains(&addr) {
                    return;
                }
                seen.push(addr);
                for (index, item) in array.to_vec().iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    if !item.is_nullish() {
                        item.coerce_into(out, seen);
                    }
                }
                seen.pop();
            }
            Value::Object(_) => out.push_str("[object Object]"),
            Value::Error(error) => {
                let _ = write!(out, "{error}");
            }
            Value::Exception(exception) => {
                let _ = write!(out, "{exception}");
            }
            Value::Opaque(opaque) => {
                let _ = write!(out, "[object {}]", opaque.tag());
            }
        }
    }
}

fn push_number(out: &mut String, n: f64) {
    if n.is_nan() {
        out.push_str("NaN");
    } else if n.is_infinite() {
        out.push_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    } else if n == 0.0 {
        out.push('0');
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let start = out.len();
        let _ = write!(out, "{n:e}");
        if let Some(at) = out[start..].find('e') {
            let exponent = start + at + 1;
            if !out[exponent..].starts_with('-') {
                out.insert(exponent, '+');
            }
        }
    } else {
        let _ = write!(out, "{n}");
    }
}

/// Formats a date in the long, locale-independent form used for string
/// coercion and JSON output.
///
/// ```
/// use chrono::{TimeZone, Utc};
///
/// let date = Utc.with_ymd_and_hms(2026, 10, 14, 9, 30, 0).unwrap();
/// assert_eq!(
///     blunder::value::date_to_string(&date),
///     "Wed Oct 14 2026 09:30:00 GMT+0000 (Coordinated Universal Time)"
/// );
/// ```
#[must_use]
pub fn date_to_string(date: &DateTime<Utc>) -> String {
    date.format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)")
        .to_string()
}

/// String coercion.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.coerce_into(&mut out, &mut Vec::new());
        f.write_str(&out)
    }
}

/// Shallow: composite values print their handle, not their contents, so
/// cyclic graphs stay printable.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Date(date) => f.debug_tuple("Date").field(date).finish(),
            Value::Function(function) => fmt::Debug::fmt(function, f),
            Value::Array(array) => fmt::Debug::fmt(array, f),
            Value::Object(object) => fmt::Debug::fmt(object, f),
            Value::Error(error) => fmt::Debug::fmt(error, f),
            Value::Exception(exception) => fmt::Debug::fmt(exception, f),
            Value::Opaque(opaque) => f.debug_tuple("Opaque").field(opaque).finish(),
        }
    }
}

/// Primitives compare by value, composites by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Error(a), Value::Error(b)) => a.ptr_eq(b),
            (Value::Exception(a), Value::Exception(b)) => a.ptr_eq(b),
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Undefined
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                #[allow(clippy::cast_precision_loss, clippy::cast_lossless, reason = "numbers are f64")]
                fn from(value: $ty) -> Self {
                    Value::Number(value as f64)
                }
            }
        )*
    };
}

from_number!(f64, f32, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<Cow<'_, str>> for Value {
    fn from(value: Cow<'_, str>) -> Self {
        Value::String(value.into_owned())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

impl From<Function> for Value {
    fn from(value: Function) -> Self {
        Value::Function(value)
    }
}

impl From<Array> for Value {
    fn from(value: Array) -> Self {
        Value::Array(value)
    }
}

impl From<&Array> for Value {
    fn from(value: &Array) -> Self {
        Value::Array(value.clone())
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

impl From<&Object> for Value {
    fn from(value: &Object) -> Self {
        Value::Object(value.clone())
    }
}

impl From<NativeError> for Value {
    fn from(value: NativeError) -> Self {
        Value::Error(value)
    }
}

impl From<&NativeError> for Value {
    fn from(value: &NativeError) -> Self {
        Value::Error(value.clone())
    }
}

impl From<Exception> for Value {
    fn from(value: Exception) -> Self {
        Value::Exception(value)
    }
}

impl From<&Exception> for Value {
    fn from(value: &Exception) -> Self {
        Value::Exception(value.clone())
    }
}

impl From<Opaque> for Value {
    fn from(value: Opaque) -> Self {
        Value::Opaque(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    static_assertions::assert_impl_all!(Value: Send, Sync);
    static_assertions::assert_impl_all!(Opaque: Copy, Send, Sync);

    #[test]
    fn primitives_coerce_like_script_strings() {
        assert_eq!(Value::Undefined.to_string(), "undefined");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::from(-0.0).to_string(), "0");
        assert_eq!(Value::from(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::from(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::from("foo").to_string(), "foo");
        assert_eq!(Value::from(Opaque::RegExp).to_string(), "[object RegExp]");
    }

    #[test]
    fn extreme_numbers_use_exponent_form() {
        assert_eq!(Value::from(1e21).to_string(), "1e+21");
        assert_eq!(Value::from(-1.5e300).to_string(), "-1.5e+300");
        assert_eq!(Value::from(1e-7).to_string(), "1e-7");
        assert_eq!(Value::from(2.5e-8).to_string(), "2.5e-8");
        assert_eq!(Value::from(0.000001).to_string(), "0.000001");
        assert_eq!(Value::from(1e20).to_string(), "100000000000000000000");
    }

    #[test]
    fn composites_coerce_like_script_strings() {
        let date = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            Value::from(date).to_string(),
            "Thu Jan 02 2020 03:04:05 GMT+0000 (Coordinated Universal Time)"
        );

        let array = Array::from(vec![
            Value::from(1),
            Value::Null,
            Value::from("two"),
            Value::Undefined,
        ]);
        assert_eq!(Value::from(&array).to_string(), "1,,two,");

        array.push(array.clone());
        assert_eq!(Value::from(&array).to_string(), "1,,two,,");

        assert_eq!(Value::from(Object::new()).to_string(), "[object Object]");
        assert_eq!(
            Value::from(Function::named("foo")).to_string(),
            "function foo() { [native code] }"
        );
    }

    #[test]
    fn composites_compare_by_identity() {
        let a = Object::new().with("x", 1);
        let b = Object::new().with("x", 1);
        assert_eq!(Value::from(&a), Value::from(a.clone()));
        assert_ne!(Value::from(&a), Value::from(&b));
        assert_eq!(Value::from("x"), Value::from(String::from("x")));
        assert_ne!(Value::from(f64::NAN), Value::from(f64::NAN));
    }

    #[test]
    fn options_and_vectors_convert() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::from("a"));
        let Value::Array(array) = Value::from(vec![1, 2, 3]) else {
            panic!("expected an array");
        };
        assert_eq!(array.len(), 3);
        assert_eq!(array.get(2), Some(Value::from(3)));
    }

    #[test]
    fn debug_is_shallow_for_cycles() {
        let object = Object::new();
        object.insert("self", object.clone());
        let rendered = format!("{:?}", Value::from(&object));
        assert!(rendered.starts_with("Object"));
    }
}
