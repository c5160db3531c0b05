//! The canonical exception type.
//!
//! Every failure handled by this crate ends up as an [`Exception`]: a name, a
//! message, raw stack text, an optional cause, a bag of contextual data and,
//! when it was produced by normalizing a foreign error, a reference to that
//! error.
//!
//! Exception variants are static [`ExceptionKind`] descriptors rather than
//! separate types. A kind reports its own name while sharing everything else
//! with its parents, and normalizing through a kind keeps instances of that
//! kind (or any kind below it) as they are.
//!
//! # Examples
//!
//! ```
//! use blunder::{exception_kind, Exception, NativeError, Options, Value};
//!
//! exception_kind! {
//!     /// Failures talking to the database.
//!     pub static DATABASE_ERROR: "DatabaseError";
//! }
//!
//! let error = NativeError::new("connection reset");
//! let exception = DATABASE_ERROR.from_value(error.clone(), Options::new().with("table", "users"));
//!
//! assert_eq!(exception.to_string(), "DatabaseError: connection reset");
//! assert_eq!(exception.stack(), error.stack());
//! assert_eq!(exception.source(), Some(&Value::from(error)));
//!
//! // Normalizing again returns the very same instance.
//! let again = Exception::from_value(exception.clone(), Options::new().with("retry", true));
//! assert!(again.ptr_eq(&exception));
//! assert_eq!(exception.data().keys(), ["table", "retry"]);
//! ```

use alloc::{
    string::{String, ToString},
    sync::{Arc, Weak},
    vec::Vec,
};
use core::fmt;

use indexmap::IndexMap;
use spin::RwLock;

use crate::{
    serialize::serialize,
    stacktrace::{self, Frame},
    value::{Array, NativeError, Object, Value},
};

/// Describes one exception variant.
///
/// Kinds are compared by address, so they live in `static`s, usually
/// declared with [`exception_kind!`](crate::exception_kind).
#[allow(
    missing_copy_implementations,
    reason = "kinds are identified by their address"
)]
pub struct ExceptionKind {
    name: &'static str,
    parent: Option<&'static ExceptionKind>,
    serializable: Option<fn(&Exception) -> Value>,
}

/// The root kind. Every other kind descends from it.
pub static EXCEPTION: ExceptionKind = ExceptionKind::new("Exception", None);

impl ExceptionKind {
    /// Creates a kind below `parent`.
    #[must_use]
    pub const fn new(name: &'static str, parent: Option<&'static ExceptionKind>) -> Self {
        Self {
            name,
            parent,
            serializable: None,
        }
    }

    /// Replaces the serializable view of exceptions of this kind and of the
    /// kinds below it that do not set their own.
    ///
    /// ```
    /// use blunder::{EXCEPTION, Exception, ExceptionKind, Object, Value};
    ///
    /// fn terse(exception: &Exception) -> Value {
    ///     Object::new().with("message", exception.message()).into()
    /// }
    ///
    /// static TERSE: ExceptionKind = ExceptionKind::new("Terse", Some(&EXCEPTION)).with_serializable(terse);
    ///
    /// let exception = TERSE.create("short", Default::default());
    /// assert_eq!(exception.to_json(), serde_json::json!({"message": "short"}));
    /// ```
    #[must_use]
    pub const fn with_serializable(mut self, view: fn(&Exception) -> Value) -> Self {
        self.serializable = Some(view);
        self
    }

    /// The name reported by exceptions of this kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The kind this one descends from.
    #[must_use]
    pub const fn parent(&self) -> Option<&'static ExceptionKind> {
        self.parent
    }

    /// Returns `true` if this kind is `other` or descends from it.
    #[must_use]
    pub fn is_a(&self, other: &ExceptionKind) -> bool {
        core::iter::successors(Some(self), |kind| kind.parent)
            .any(|kind| core::ptr::eq(kind, other))
    }

    fn serializable_view(&self) -> Option<fn(&Exception) -> Value> {
        core::iter::successors(Some(self), |kind| kind.parent).find_map(|kind| kind.serializable)
    }

    /// Creates an exception of this kind, capturing the current stack.
    #[must_use]
    pub fn create(&'static self, message: impl Into<String>, options: Options) -> Exception {
        let message = message.into();
        let stack = stacktrace::capture_text(&crate::value::header_line(self.name, &message));
        Exception::build(self, message, stack, options, None)
    }

    /// Normalizes any value into an exception of this kind.
    ///
    /// - An exception of this kind, or of a kind below it, is returned as
    ///   the same instance. The data of `options` is merged into its data and
    ///   a cause in `options` replaces its cause.
    /// - A native error, or an exception of an unrelated kind, is wrapped: the
    ///   new exception copies its message and stack and keeps it as
    ///   [`Exception::source`]. The inner errors of an aggregate error become
    ///   the cause, a single one directly and several as a sequence.
    /// - Anything else becomes the message of a new exception.
    #[must_use]
    pub fn from_value(&'static self, value: impl Into<Value>, options: Options) -> Exception {
        match value.into() {
            Value::Exception(exception) if exception.kind().is_a(self) => {
                exception.merge(options);
                exception
            }
            Value::Exception(exception) => {
                let message = exception.message().to_string();
                let stack = exception.stack().to_string();
                Exception::build(self, message, stack, options, Some(Value::Exception(exception)))
            }
            Value::Error(error) => {
                let mut options = options;
                if let Some(errors) = error.errors() {
                    options.cause = Some(match errors {
                        [single] => Cause::Single(single.clone()),
                        errors => Cause::Many(errors.to_vec()),
                    });
                }
                let message = error.message().to_string();
                let stack = error.stack().to_string();
                Exception::build(self, message, stack, options, Some(Value::Error(error)))
            }
            other => self.create(other.to_string(), options),
        }
    }
}

impl fmt::Debug for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionKind")
            .field("name", &self.name)
            .field("parent", &self.parent.map(ExceptionKind::name))
            .finish_non_exhaustive()
    }
}

/// What caused an exception.
#[derive(Clone, Debug, PartialEq)]
pub enum Cause {
    /// One upstream failure.
    Single(Value),
    /// Several upstream failures, in order.
    Many(Vec<Value>),
}

impl Cause {
    /// Interprets a value as a cause. Arrays become [`Cause::Many`] and empty
    /// values are no cause at all.
    #[must_use]
    pub fn from_value(value: impl Into<Value>) -> Option<Self> {
        match value.into() {
            Value::Undefined | Value::Null => None,
            Value::Array(array) => Some(Cause::Many(array.to_vec())),
            value => Some(Cause::Single(value)),
        }
    }

    /// The cause as a value. A sequence becomes a new array.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Cause::Single(value) => value.clone(),
            Cause::Many(values) => Value::Array(Array::from(values.clone())),
        }
    }

    /// The first upstream failure.
    #[must_use]
    pub fn first(&self) -> Option<&Value> {
        match self {
            Cause::Single(value) => Some(value),
            Cause::Many(values) => values.first(),
        }
    }

    /// Iterates over the upstream failures.
    pub fn iter(&self) -> core::slice::Iter<'_, Value> {
        match self {
            Cause::Single(value) => core::slice::from_ref(value).iter(),
            Cause::Many(values) => values.iter(),
        }
    }
}

/// The options an exception is created or normalized with.
///
/// The key `cause` is never stored as data: inserting it sets the
/// [`cause`](Options::cause) instead.
///
/// ```
/// use blunder::{Cause, NativeError, Options, Value};
///
/// let root = NativeError::new("root");
/// let options = Options::new().with("cause", root.clone()).with("attempt", 3);
///
/// assert_eq!(options.cause(), Some(&Cause::Single(Value::from(root))));
/// assert_eq!(options.data().len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Options {
    cause: Option<Cause>,
    data: IndexMap<String, Value>,
}

impl Options {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits an object into cause and data.
    #[must_use]
    pub fn from_object(object: &Object) -> Self {
        object.entries().into_iter().collect()
    }

    /// Builder form of [`Options::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets the cause.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<Value>) -> Self {
        self.cause = Cause::from_value(cause);
        self
    }

    /// Adds a data entry, or sets the cause when `key` is `cause`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if key == "cause" {
            self.cause = Cause::from_value(value);
        } else {
            self.data.insert(key, value.into());
        }
    }

    /// The cause, if one was supplied.
    #[must_use]
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// The data entries.
    #[must_use]
    pub fn data(&self) -> &IndexMap<String, Value> {
        &self.data
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Options::new();
        for (key, value) in iter {
            options.insert(key, value);
        }
        options
    }
}

impl From<Object> for Options {
    fn from(object: Object) -> Self {
        Options::from_object(&object)
    }
}

pub(crate) struct ExceptionData {
    kind: &'static ExceptionKind,
    message: String,
    stack: String,
    cause: RwLock<Option<Cause>>,
    data: Object,
    source: Option<Value>,
    stacktrace: RwLock<Option<Arc<[Frame]>>>,
}

/// A captured failure.
///
/// `Exception` is a shared handle: clones refer to the same instance, and
/// [`Exception::ptr_eq`] tells instances apart. The name, message and stack
/// never change; the data can be merged into and the cause replaced.
#[derive(Clone)]
pub struct Exception(Arc<ExceptionData>);

impl Exception {
    /// Creates an exception of the root kind.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        EXCEPTION.create(message, Options::new())
    }

    /// Creates an exception of the root kind with a cause and data.
    ///
    /// ```
    /// use blunder::{Exception, Options};
    ///
    /// let cause = Exception::new("inner");
    /// let exception = Exception::with_options("outer", Options::new().with_cause(cause).with("foo", 100));
    /// assert!(exception.cause().is_some());
    /// assert_eq!(exception.data().keys(), ["foo"]);
    /// ```
    #[must_use]
    pub fn with_options(message: impl Into<String>, options: Options) -> Self {
        EXCEPTION.create(message, options)
    }

    /// Normalizes any value into an exception, see
    /// [`ExceptionKind::from_value`].
    #[must_use]
    pub fn from_value(value: impl Into<Value>, options: Options) -> Self {
        EXCEPTION.from_value(value, options)
    }

    fn build(
        kind: &'static ExceptionKind,
        message: String,
        stack: String,
        options: Options,
        source: Option<Value>,
    ) -> Self {
        let Options { cause, data } = options;
        let object = Object::new();
        object.extend(data);
        Self(Arc::new(ExceptionData {
            kind,
            message,
            stack,
            cause: RwLock::new(cause),
            data: object,
            source,
            stacktrace: RwLock::new(None),
        }))
    }

    fn merge(&self, options: Options) {
        let Options { cause, data } = options;
        self.0.data.extend(data);
        if cause.is_some() {
            self.set_cause(cause);
        }
    }

    /// The kind of this exception.
    #[must_use]
    pub fn kind(&self) -> &'static ExceptionKind {
        self.0.kind
    }

    /// Returns `true` if this exception is of `kind` or of a kind below it.
    #[must_use]
    pub fn is(&self, kind: &ExceptionKind) -> bool {
        self.0.kind.is_a(kind)
    }

    /// The name of the kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0.kind.name
    }

    /// The message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0.message
    }

    /// The raw stack text.
    #[must_use]
    pub fn stack(&self) -> &str {
        &self.0.stack
    }

    /// The cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<Cause> {
        self.0.cause.read().clone()
    }

    /// Replaces the cause.
    pub fn set_cause(&self, cause: Option<Cause>) {
        *self.0.cause.write() = cause;
    }

    /// A copy of the contextual data. Never contains the key `cause`.
    ///
    /// Changes to the returned object do not reach the exception; use
    /// [`Exception::insert_data`] or [`Exception::from_value`] instead.
    #[must_use]
    pub fn data(&self) -> Object {
        self.0.data.entries().into_iter().collect()
    }

    /// Adds a data entry, or replaces the cause when `key` is `cause`.
    ///
    /// ```
    /// use blunder::{Cause, Exception, Value};
    ///
    /// let exception = Exception::new("failed");
    /// exception.insert_data("attempt", 2);
    /// exception.insert_data("cause", "timeout");
    ///
    /// assert_eq!(exception.data().keys(), ["attempt"]);
    /// assert_eq!(exception.cause(), Some(Cause::Single(Value::from("timeout"))));
    /// ```
    pub fn insert_data(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if key == "cause" {
            self.set_cause(Cause::from_value(value));
        } else {
            self.0.data.insert(key, value);
        }
    }

    /// The foreign value this exception was normalized from.
    #[must_use]
    pub fn source(&self) -> Option<&Value> {
        self.0.source.as_ref()
    }

    /// The parsed frames of [`Exception::stack`].
    ///
    /// The stack is parsed on first access; later calls return the cached
    /// frames.
    #[must_use]
    pub fn stacktrace(&self) -> Arc<[Frame]> {
        if let Some(frames) = self.0.stacktrace.read().as_ref() {
            return Arc::clone(frames);
        }
        let mut cache = self.0.stacktrace.write();
        Arc::clone(cache.get_or_insert_with(|| stacktrace::parse(&self.0.stack).into()))
    }

    /// The value the serializer walks in place of this exception.
    ///
    /// This is the view set on the kind with
    /// [`ExceptionKind::with_serializable`], or `{name, message, stack, cause,
    /// data}`.
    #[must_use]
    pub fn serializable(&self) -> Value {
        match self.0.kind.serializable_view() {
            Some(view) => view(self),
            None => self.default_view(),
        }
    }

    /// The `{name, message, stack, cause, data}` view.
    #[must_use]
    pub fn default_view(&self) -> Value {
        Object::new()
            .with("name", self.name())
            .with("message", self.message())
            .with("stack", self.stack())
            .with(
                "cause",
                self.cause().map_or(Value::Null, |cause| cause.to_value()),
            )
            .with("data", self.data())
            .into()
    }

    /// Serializes the exception into JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serialize(&Value::from(self)).to_json()
    }

    /// Returns `true` if both handles refer to the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).addr()
    }

    pub(crate) fn downgrade(&self) -> Weak<ExceptionData> {
        Arc::downgrade(&self.0)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::value::header_line(self.name(), self.message()))
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exception")
            .field("name", &self.name())
            .field("message", &self.message())
            .field("data", &self.0.data)
            .finish_non_exhaustive()
    }
}

impl core::error::Error for Exception {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match &self.0.source {
            Some(Value::Error(error)) => Some(error),
            Some(Value::Exception(exception)) => Some(exception),
            _ => None,
        }
    }
}

impl serde::Serialize for Exception {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&serialize(&Value::from(self)), serializer)
    }
}

impl From<Value> for Exception {
    fn from(value: Value) -> Self {
        Exception::from_value(value, Options::new())
    }
}

impl From<NativeError> for Exception {
    fn from(error: NativeError) -> Self {
        Exception::from_value(error, Options::new())
    }
}

impl From<&str> for Exception {
    fn from(message: &str) -> Self {
        Exception::new(message)
    }
}

impl From<String> for Exception {
    fn from(message: String) -> Self {
        Exception::new(message)
    }
}
