//! Circular-safe structural serialization.
//!
//! [`serialize`] walks a [`Value`] depth-first and produces a [`Serialized`]
//! tree that can always be written as JSON:
//!
//! - exceptions are replaced by their [serializable view](Exception::serializable),
//! - functions become `"[Function: <name>]"`,
//! - arrays, objects and errors are copied field by field, except that a
//!   reference back to a node that is still being walked becomes
//!   `"[Circular]"`,
//! - opaque values are dropped.
//!
//! A node is only "being walked" while its own fields are, so a node that is
//! reachable along two separate paths is written out in full both times.
//!
//! ```
//! use blunder::{Object, serialize};
//!
//! let shared = Object::new().with("id", 1);
//! let root = Object::new().with("left", shared.clone()).with("right", shared);
//! root.insert("self", root.clone());
//!
//! assert_eq!(
//!     serialize(&root.into()).to_json(),
//!     serde_json::json!({"left": {"id": 1}, "right": {"id": 1}, "self": "[Circular]"}),
//! );
//! ```

use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};

use chrono::{DateTime, Utc};
use hashbrown::HashSet;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::ser::{SerializeMap, SerializeSeq};

use crate::{
    exception::Exception,
    value::{NativeError, Value, date_to_string},
};

/// The placeholder written in place of a reference to an ancestor.
pub const CIRCULAR: &str = "[Circular]";

/// A JSON-safe tree produced by [`serialize`].
#[derive(Clone, Debug, PartialEq)]
pub enum Serialized {
    /// Omitted from objects, `null` elsewhere when written as JSON.
    Undefined,
    /// `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. Non-finite numbers are written as `null`.
    Number(f64),
    /// A string.
    String(String),
    /// A date, written in its long string form.
    Date(DateTime<Utc>),
    /// An ordered list.
    Array(Vec<Serialized>),
    /// Key/value pairs in insertion order.
    Object(IndexMap<String, Serialized>),
}

impl Serialized {
    /// Returns `true` for [`Serialized::Undefined`].
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Serialized::Undefined)
    }

    /// Converts the tree into a JSON value.
    ///
    /// ```
    /// use blunder::serialize::Serialized;
    /// use indexmap::IndexMap;
    ///
    /// let tree = Serialized::Object(IndexMap::from([
    ///     ("kept".to_string(), Serialized::Number(3.0)),
    ///     ("dropped".to_string(), Serialized::Undefined),
    ///     ("list".to_string(), Serialized::Array(vec![Serialized::Undefined])),
    /// ]));
    /// assert_eq!(tree.to_json(), serde_json::json!({"kept": 3, "list": [null]}));
    /// ```
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Serialized::Undefined | Serialized::Null => Json::Null,
            Serialized::Bool(b) => Json::Bool(*b),
            Serialized::Number(n) => number_to_json(*n),
            Serialized::String(s) => Json::String(s.clone()),
            Serialized::Date(date) => Json::String(date_to_string(date)),
            Serialized::Array(items) => Json::Array(items.iter().map(Serialized::to_json).collect()),
            Serialized::Object(entries) => Json::Object(
                entries
                    .iter()
                    .filter(|(_, value)| !value.is_undefined())
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[allow(clippy::cast_possible_truncation, reason = "range checked")]
fn integral(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER).then(|| n as i64)
}

fn number_to_json(n: f64) -> serde_json::Value {
    if let Some(int) = integral(n) {
        serde_json::Value::from(int)
    } else {
        serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

impl serde::Serialize for Serialized {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Serialized::Undefined | Serialized::Null => serializer.serialize_unit(),
            Serialized::Bool(b) => serializer.serialize_bool(*b),
            Serialized::Number(n) => match integral(*n) {
                Some(int) => serializer.serialize_i64(int),
                None if n.is_finite() => serializer.serialize_f64(*n),
                None => serializer.serialize_unit(),
            },
            Serialized::String(s) => serializer.serialize_str(s),
            Serialized::Date(date) => serializer.serialize_str(&date_to_string(date)),
            Serialized::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Serialized::Object(entries) => {
                let mut map = serializer.serialize_map(None)?;
                for (key, value) in entries.iter().filter(|(_, value)| !value.is_undefined()) {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Serializes a value graph, replacing references to ancestors with
/// [`CIRCULAR`].
#[must_use]
pub fn serialize(value: &Value) -> Serialized {
    Serializer::default().serialize(value)
}

#[derive(Default)]
struct Serializer {
    visiting: HashSet<usize, FxBuildHasher>,
}

impl Serializer {
    fn serialize(&mut self, value: &Value) -> Serialized {
        match value {
            Value::Exception(exception) => self.exception(exception),
            Value::Undefined => Serialized::Undefined,
            Value::Null => Serialized::Null,
            Value::Bool(b) => Serialized::Bool(*b),
            Value::Number(n) => Serialized::Number(*n),
            Value::String(s) => Serialized::String(s.clone()),
            Value::Date(date) => Serialized::Date(*date),
            Value::Function(function) => Serialized::String(format!(
                "[Function: {}]",
                function.name().unwrap_or("anonymous")
            )),
            Value::Array(array) => self.guarded(array.addr(), |this| {
                Serialized::Array(array.to_vec().iter().map(|item| this.serialize(item)).collect())
            }),
            Value::Object(object) => self.guarded(object.addr(), |this| {
                Serialized::Object(
                    object
                        .entries()
                        .into_iter()
                        .map(|(key, item)| {
                            let item = this.serialize(&item);
                            (key, item)
                        })
                        .collect(),
                )
            }),
            Value::Error(error) => self.error(error),
            Value::Opaque(_) => Serialized::Undefined,
        }
    }

    fn exception(&mut self, exception: &Exception) -> Serialized {
        self.guarded(exception.addr(), |this| this.serialize(&exception.serializable()))
    }

    fn error(&mut self, error: &NativeError) -> Serialized {
        self.guarded(error.addr(), |this| {
            let mut fields = IndexMap::new();
            fields.insert("name".to_string(), Serialized::String(error.name().to_string()));
            fields.insert(
                "message".to_string(),
                Serialized::String(error.message().to_string()),
            );
            fields.insert("stack".to_string(), Serialized::String(error.stack().to_string()));
            if let Some(cause) = error.cause() {
                fields.insert("cause".to_string(), this.serialize(&cause));
            }
            Serialized::Object(fields)
        })
    }

    fn guarded(&mut self, id: usize, walk: impl FnOnce(&mut Self) -> Serialized) -> Serialized {
        if !self.visiting.insert(id) {
            return Serialized::String(CIRCULAR.to_string());
        }
        let serialized = walk(self);
        self.visiting.remove(&id);
        serialized
    }
}
