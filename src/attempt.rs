//! Running fallible code and dispatching its failure.

use crate::{
    bus::Bus,
    exception::{Exception, Options},
    value::Value,
};

/// Runs `f` and, if it fails, normalizes the error with `options`, dispatches
/// it on `bus` and returns it.
///
/// # Examples
///
/// ```
/// use blunder::{Bus, NativeError, Options, attempt};
///
/// let bus = Bus::new();
/// let result: Result<u8, _> = attempt(&bus, Options::new().with("step", "parse"), || {
///     "300".parse::<u8>().map_err(|error| NativeError::from_error(&error))
/// });
///
/// let exception = result.unwrap_err();
/// assert_eq!(exception.message(), "number too large to fit in target type");
/// assert!(bus.has_delivered(&exception));
/// ```
pub fn attempt<T, E, F>(bus: &Bus, options: Options, f: F) -> Result<T, Exception>
where
    E: Into<Value>,
    F: FnOnce() -> Result<T, E>,
{
    f().map_err(|error| bus.dispatch(error, options))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn ok_values_are_returned_without_dispatch() {
        let bus = Bus::new();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        bus.subscribe(move |_| *counter.lock().unwrap() += 1);

        let value = attempt(&bus, Options::new(), || Ok::<_, &str>(5)).unwrap();
        assert_eq!(value, 5);
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn errors_are_dispatched_with_options() {
        let bus = Bus::new();
        let seen: Arc<Mutex<Vec<Exception>>> = Arc::default();
        let sink = Arc::clone(&seen);
        bus.subscribe(move |exception| sink.lock().unwrap().push(exception.clone()));

        let exception = attempt(&bus, Options::new().with("job", "sync"), || {
            Err::<(), _>("queue unavailable")
        })
        .unwrap_err();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].ptr_eq(&exception));
        assert_eq!(exception.message(), "queue unavailable");
        assert_eq!(exception.data().get("job"), Some(Value::from("sync")));
    }

    #[test]
    fn delivered_exceptions_are_not_dispatched_twice() {
        let bus = Bus::new();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        bus.subscribe(move |_| *counter.lock().unwrap() += 1);

        let first = attempt(&bus, Options::new(), || Err::<(), _>("once")).unwrap_err();
        let second = attempt(&bus, Options::new(), || Err::<(), _>(first.clone())).unwrap_err();

        assert!(second.ptr_eq(&first));
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
