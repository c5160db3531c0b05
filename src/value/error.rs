use alloc::{
    borrow::Cow,
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};
use core::fmt;

use spin::RwLock;

use super::{Value, short_type_name};
use crate::stacktrace;

struct ErrorData {
    name: Cow<'static, str>,
    message: String,
    stack: String,
    cause: RwLock<Option<Value>>,
    errors: Option<Vec<Value>>,
}

/// A foreign error-like value.
///
/// This is the shape failures take before they are normalized into an
/// [`Exception`](crate::Exception): a name, a message, raw stack text, an
/// optional cause and, for aggregate failures, the list of inner errors.
///
/// # Examples
///
/// ```
/// use blunder::{NativeError, Value};
///
/// let error = NativeError::with_name("TypeError", "x is not a function");
/// assert_eq!(error.to_string(), "TypeError: x is not a function");
/// assert!(error.stack().starts_with("TypeError: x is not a function"));
///
/// let aggregate = NativeError::aggregate([error.clone()], "one failed");
/// assert_eq!(aggregate.name(), "AggregateError");
/// assert_eq!(aggregate.errors(), Some(&[Value::from(error)][..]));
/// ```
#[derive(Clone)]
pub struct NativeError(Arc<ErrorData>);

impl NativeError {
    /// Creates an error named `Error`, capturing the current stack.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_name("Error", message)
    }

    /// Creates an error with a custom name, capturing the current stack.
    #[must_use]
    pub fn with_name(name: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::captured(name.into(), message.into(), None)
    }

    /// Creates an `AggregateError` wrapping several errors.
    #[must_use]
    pub fn aggregate<I>(errors: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let errors = errors.into_iter().map(Into::into).collect();
        Self::captured("AggregateError".into(), message.into(), Some(errors))
    }

    /// Creates an error from existing parts without capturing anything.
    #[must_use]
    pub fn from_parts(
        name: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
        stack: impl Into<String>,
    ) -> Self {
        Self::build(name.into(), message.into(), stack.into(), None)
    }

    /// Converts any [`core::error::Error`].
    ///
    /// The name is the error's type name, the message its `Display` output and
    /// the [`source`](core::error::Error::source) chain becomes the cause
    /// chain. Only the outermost error gets a captured stack; the errors of the
    /// chain carry only their header line.
    ///
    /// ```
    /// use blunder::NativeError;
    ///
    /// let parse_error = "x".parse::<u8>().unwrap_err();
    /// let error = NativeError::from_error(&parse_error);
    /// assert_eq!(error.name(), "ParseIntError");
    /// assert_eq!(error.message(), "invalid digit found in string");
    /// ```
    #[must_use]
    pub fn from_error<E>(error: &E) -> Self
    where
        E: core::error::Error + ?Sized,
    {
        let name = short_type_name(core::any::type_name::<E>()).unwrap_or("Error");
        Self::from_chain(name, error.to_string(), error.source())
    }

    pub(crate) fn from_chain(
        name: &'static str,
        message: String,
        mut source: Option<&(dyn core::error::Error + 'static)>,
    ) -> Self {
        let head = Self::captured(name.into(), message, None);
        let mut tail = head.clone();
        while let Some(error) = source {
            let message = error.to_string();
            let stack = header_line("Error", &message);
            let next = Self::build("Error".into(), message, stack, None);
            tail.set_cause(Some(Value::Error(next.clone())));
            tail = next;
            source = error.source();
        }
        head
    }

    fn captured(name: Cow<'static, str>, message: String, errors: Option<Vec<Value>>) -> Self {
        let stack = stacktrace::capture_text(&header_line(&name, &message));
        Self::build(name, message, stack, errors)
    }

    fn build(
        name: Cow<'static, str>,
        message: String,
        stack: String,
        errors: Option<Vec<Value>>,
    ) -> Self {
        Self(Arc::new(ErrorData {
            name,
            message,
            stack,
            cause: RwLock::new(None),
            errors,
        }))
    }

    /// Builder form of [`NativeError::set_cause`].
    #[must_use]
    pub fn with_cause(self, cause: impl Into<Value>) -> Self {
        self.set_cause(Some(cause.into()));
        self
    }

    /// Replaces the cause.
    pub fn set_cause(&self, cause: Option<Value>) {
        *self.0.cause.write() = cause;
    }

    /// The error's name, such as `TypeError`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The error's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0.message
    }

    /// The raw stack text.
    #[must_use]
    pub fn stack(&self) -> &str {
        &self.0.stack
    }

    /// The cause, if one was set.
    #[must_use]
    pub fn cause(&self) -> Option<Value> {
        self.0.cause.read().clone()
    }

    /// The inner errors of an aggregate error.
    #[must_use]
    pub fn errors(&self) -> Option<&[Value]> {
        self.0.errors.as_deref()
    }

    /// Returns `true` if both handles point at the same error.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).addr()
    }
}

/// The first line of a stack: `Name: message`, or `Name` alone.
pub(crate) fn header_line(name: &str, message: &str) -> String {
    if message.is_empty() {
        name.to_string()
    } else {
        alloc::format!("{name}: {message}")
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&header_line(self.name(), self.message()))
    }
}

impl fmt::Debug for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeError")
            .field("name", &self.name())
            .field("message", &self.message())
            .field("errors", &self.0.errors.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

impl core::error::Error for NativeError {}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(NativeError: Send, Sync, core::error::Error);

    #[derive(Debug, thiserror::Error)]
    #[error("config could not be loaded")]
    struct LoadError {
        #[source]
        source: ReadError,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("file is missing")]
    struct ReadError;

    #[test]
    fn display_uses_header_line() {
        assert_eq!(NativeError::new("boom").to_string(), "Error: boom");
        assert_eq!(NativeError::new("").to_string(), "Error");
    }

    #[test]
    fn stack_starts_with_header_line() {
        let error = NativeError::with_name("RangeError", "too far");
        assert_eq!(error.stack().lines().next(), Some("RangeError: too far"));
    }

    #[test]
    fn from_parts_keeps_stack_verbatim() {
        let error = NativeError::from_parts("Error", "x", "Error: x\n    at foo (file.js:1:2)");
        assert_eq!(error.stack(), "Error: x\n    at foo (file.js:1:2)");
        assert_eq!(error.cause(), None);
        assert_eq!(error.errors(), None);
    }

    #[test]
    fn cause_is_replaceable() {
        let root = NativeError::new("root");
        let error = NativeError::new("outer").with_cause(root.clone());
        assert_eq!(error.cause(), Some(Value::from(&root)));
        error.set_cause(None);
        assert_eq!(error.cause(), None);
    }

    #[test]
    fn from_error_walks_the_source_chain() {
        let error = NativeError::from_error(&LoadError { source: ReadError });
        assert_eq!(error.name(), "LoadError");
        assert_eq!(error.message(), "config could not be loaded");

        let Some(Value::Error(cause)) = error.cause() else {
            panic!("expected an error cause");
        };
        assert_eq!(cause.name(), "Error");
        assert_eq!(cause.message(), "file is missing");
        assert_eq!(cause.stack(), "Error: file is missing");
        assert_eq!(cause.cause(), None);
    }
}
