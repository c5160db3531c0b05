//! A snapshot of the environment the process runs in.
//!
//! Nothing in this crate attaches the snapshot on its own; pass it along as
//! data when it is useful:
//!
//! ```
//! use blunder::{Exception, Options, metadata};
//!
//! let exception = Exception::with_options(
//!     "sync failed",
//!     Options::new().with("metadata", metadata::snapshot()),
//! );
//! assert!(exception.data().contains_key("metadata"));
//! ```

use chrono::Utc;

use crate::value::{Object, Value, date_to_string};

/// Collects the current environment.
///
/// | key          | value |
/// |--------------|-------|
/// | `datetime`   | current time in the long date form |
/// | `timestamp`  | milliseconds since the Unix epoch |
/// | `os`         | `std::env::consts::OS` |
/// | `arch`       | `std::env::consts::ARCH` |
/// | `family`     | `std::env::consts::FAMILY` |
/// | `pid`        | the process id |
/// | `thread`     | the current thread's name, or `<unnamed>` |
/// | `executable` | path of the running binary, when known |
/// | `cwd`        | working directory, when known |
/// | `language`   | the `LANG` environment variable, when set |
#[must_use]
pub fn snapshot() -> Object {
    let now = Utc::now();
    let object = Object::new()
        .with("datetime", date_to_string(&now))
        .with("timestamp", now.timestamp_millis())
        .with("os", std::env::consts::OS)
        .with("arch", std::env::consts::ARCH)
        .with("family", std::env::consts::FAMILY)
        .with("pid", std::process::id())
        .with(
            "thread",
            std::thread::current().name().unwrap_or("<unnamed>"),
        );

    if let Ok(executable) = std::env::current_exe() {
        object.insert("executable", executable.display().to_string());
    }
    if let Ok(cwd) = std::env::current_dir() {
        object.insert("cwd", cwd.display().to_string());
    }
    if let Some(language) = std::env::var("LANG").ok().filter(|lang| !lang.is_empty()) {
        object.insert("language", Value::String(language));
    }

    object
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_has_the_fixed_keys() {
        let snapshot = snapshot();
        for key in ["datetime", "timestamp", "os", "arch", "family", "pid", "thread"] {
            assert!(snapshot.contains_key(key), "missing {key}");
        }
        assert_eq!(snapshot.get("os"), Some(Value::from(std::env::consts::OS)));
        assert_eq!(snapshot.get("pid"), Some(Value::from(std::process::id())));
    }

    #[test]
    fn host_paths_are_recorded_when_available() {
        let snapshot = snapshot();
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            snapshot.get("cwd"),
            Some(Value::from(cwd.display().to_string()))
        );
        assert_eq!(
            snapshot.contains_key("executable"),
            std::env::current_exe().is_ok()
        );
    }

    #[test]
    fn datetime_is_the_long_form() {
        let snapshot = snapshot();
        let datetime = snapshot.get("datetime").unwrap();
        assert!(
            datetime
                .as_str()
                .is_some_and(|text| text.ends_with("GMT+0000 (Coordinated Universal Time)"))
        );
        assert!(snapshot.get("timestamp").and_then(|value| value.as_number()).is_some_and(|ms| ms > 0.0));
    }

    #[test]
    fn snapshots_serialize_to_json_objects() {
        let json = crate::serialize(&Value::from(snapshot())).to_json();
        assert!(json.is_object());
        assert!(json["timestamp"].is_i64() || json["timestamp"].is_u64());
    }
}
