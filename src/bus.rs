//! Dispatch-once publish/subscribe.
//!
//! A [`Bus`] normalizes whatever is dispatched on it into an [`Exception`]
//! and hands it to every subscriber, at most once per exception instance.
//! The bus remembers delivered instances through weak references only, so
//! it never keeps an exception alive.
//!
//! ```
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! use blunder::{Bus, Options};
//!
//! let bus = Bus::new();
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&calls);
//! let subscription = bus.subscribe(move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! let exception = bus.dispatch("first", Options::new());
//! bus.dispatch(exception, Options::new());
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//!
//! subscription.unsubscribe();
//! bus.dispatch("second", Options::new());
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! ```

use alloc::{
    sync::{Arc, Weak},
    vec::Vec,
};
use core::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use spin::RwLock;

use crate::{
    exception::{Exception, ExceptionData, Options},
    value::Value,
};

type Subscriber = Arc<dyn Fn(&Exception) + Send + Sync>;

#[derive(Default)]
struct Registry {
    subscribers: RwLock<Vec<(u64, Subscriber)>>,
    delivered: RwLock<HashMap<usize, Weak<ExceptionData>, FxBuildHasher>>,
    next_id: AtomicU64,
}

/// A registry of subscribers.
///
/// Cloning a `Bus` clones the handle; all clones share the same subscribers
/// and the same record of delivered exceptions.
#[derive(Clone, Default)]
pub struct Bus(Arc<Registry>);

impl Bus {
    /// Creates a bus without subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber. Subscribers are notified in the order they
    /// subscribed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Exception) + Send + Sync + 'static,
    {
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        self.0.subscribers.write().push((id, Arc::new(callback)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.0),
        }
    }

    /// Normalizes `value` and notifies every subscriber, unless this exact
    /// exception instance has already been delivered.
    ///
    /// Subscribers are called outside of any lock, on a snapshot of the
    /// subscriber list taken before the first call, so they may subscribe and
    /// unsubscribe freely. A panicking subscriber panics the caller.
    pub fn dispatch(&self, value: impl Into<Value>, options: Options) -> Exception {
        let exception = Exception::from_value(value, options);

        if !self.mark_delivered(&exception) {
            tracing::debug!(
                name = exception.name(),
                message = exception.message(),
                "exception already delivered, skipping"
            );
            return exception;
        }

        let subscribers: Vec<Subscriber> = self
            .0
            .subscribers
            .read()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();

        tracing::debug!(
            name = exception.name(),
            message = exception.message(),
            subscribers = subscribers.len(),
            "dispatching exception"
        );

        for subscriber in &subscribers {
            subscriber(&exception);
        }

        exception
    }

    /// Returns `true` if `exception` has been delivered by this bus.
    #[must_use]
    pub fn has_delivered(&self, exception: &Exception) -> bool {
        self.0
            .delivered
            .read()
            .get(&exception.addr())
            .is_some_and(|marker| marker.strong_count() > 0)
    }

    /// The number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.subscribers.read().len()
    }

    /// Returns `true` when nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.subscribers.read().is_empty()
    }

    /// Records `exception` as delivered. Returns `false` if it already was.
    fn mark_delivered(&self, exception: &Exception) -> bool {
        let mut delivered = self.0.delivered.write();
        // Addresses of dropped exceptions may be reused.
        delivered.retain(|_, marker| marker.strong_count() > 0);
        if delivered.contains_key(&exception.addr()) {
            return false;
        }
        delivered.insert(exception.addr(), exception.downgrade());
        true
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("subscribers", &self.len())
            .finish_non_exhaustive()
    }
}

/// A registration on a [`Bus`], returned by [`Bus::subscribe`].
///
/// Dropping a `Subscription` does not unsubscribe.
#[derive(Clone, Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Removes exactly this registration.
    ///
    /// Calling it again, or after the bus is gone, does nothing.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .subscribers
                .write()
                .retain(|(id, _)| *id != self.id);
        }
    }

    /// Returns `true` while the subscriber is registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|registry| {
            registry
                .subscribers
                .read()
                .iter()
                .any(|(id, _)| *id == self.id)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;
    use crate::value::NativeError;

    static_assertions::assert_impl_all!(Bus: Send, Sync, Clone);
    static_assertions::assert_impl_all!(Subscription: Send, Sync);

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&Exception) + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |label: &str| -> Box<dyn Fn(&Exception) + Send + Sync> {
            let sink = Arc::clone(&sink);
            let label = label.to_string();
            Box::new(move |exception: &Exception| {
                sink.lock().unwrap().push(format!("{label}:{}", exception.message()));
            })
        };
        (log, make)
    }

    #[test]
    fn notifies_subscribers_in_order() {
        let bus = Bus::new();
        let (log, make) = recorder();
        bus.subscribe(make("a"));
        bus.subscribe(make("b"));

        bus.dispatch(NativeError::new("boom"), Options::new());
        assert_eq!(*log.lock().unwrap(), ["a:boom", "b:boom"]);
        assert_eq!(bus.len(), 2);
    }

    #[test]
    fn unsubscribe_removes_only_that_registration() {
        let bus = Bus::new();
        let (log, make) = recorder();
        let a = bus.subscribe(make("a"));
        let _b = bus.subscribe(make("b"));

        a.unsubscribe();
        a.unsubscribe();
        assert!(!a.is_active());

        bus.dispatch("x", Options::new());
        assert_eq!(*log.lock().unwrap(), ["b:x"]);
    }

    #[test]
    fn unsubscribe_after_bus_is_dropped_is_a_no_op() {
        let bus = Bus::new();
        let subscription = bus.subscribe(|_| {});
        drop(bus);
        subscription.unsubscribe();
        assert!(!subscription.is_active());
    }

    #[test]
    fn delivers_each_instance_once() {
        let bus = Bus::new();
        let (log, make) = recorder();
        bus.subscribe(make("a"));

        let exception = bus.dispatch("once", Options::new());
        let again = bus.dispatch(exception.clone(), Options::new().with("extra", 1));

        assert!(again.ptr_eq(&exception));
        assert!(bus.has_delivered(&exception));
        assert_eq!(*log.lock().unwrap(), ["a:once"]);
        assert_eq!(exception.data().get("extra"), Some(Value::from(1)));
    }

    #[test]
    fn self_removal_does_not_skip_others() {
        let bus = Bus::new();
        let (log, make) = recorder();
        let own: Arc<OnceLock<Subscription>> = Arc::new(OnceLock::new());

        let handle = Arc::clone(&own);
        let first = make("first");
        let subscription = bus.subscribe(move |exception| {
            first(exception);
            if let Some(subscription) = handle.get() {
                subscription.unsubscribe();
            }
        });
        own.set(subscription).unwrap();
        bus.subscribe(make("second"));

        bus.dispatch("one", Options::new());
        bus.dispatch("two", Options::new());

        assert_eq!(
            *log.lock().unwrap(),
            ["first:one", "second:one", "second:two"]
        );
    }

    #[test]
    fn removing_a_later_subscriber_mid_dispatch_still_notifies_it_once() {
        let bus = Bus::new();
        let (log, make) = recorder();
        let later: Arc<OnceLock<Subscription>> = Arc::new(OnceLock::new());

        let handle = Arc::clone(&later);
        bus.subscribe(move |_| {
            if let Some(subscription) = handle.get() {
                subscription.unsubscribe();
            }
        });
        later.set(bus.subscribe(make("later"))).unwrap();

        bus.dispatch("one", Options::new());
        bus.dispatch("two", Options::new());
        assert_eq!(*log.lock().unwrap(), ["later:one"]);
    }

    #[test]
    fn normalizes_strings_and_passes_data() {
        let bus = Bus::new();
        let seen: Arc<Mutex<Option<Exception>>> = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        bus.subscribe(move |exception| {
            *sink.lock().unwrap() = Some(exception.clone());
        });

        let returned = bus.dispatch("error message", Options::new().with("foo", 1));
        let seen = seen.lock().unwrap().clone().unwrap();
        assert!(seen.ptr_eq(&returned));
        assert_eq!(seen.name(), "Exception");
        assert_eq!(seen.message(), "error message");
        assert_eq!(seen.data().get("foo"), Some(Value::from(1)));
    }

    #[test]
    fn delivered_markers_do_not_keep_exceptions_alive() {
        let bus = Bus::new();
        let exception = bus.dispatch("short lived", Options::new());
        let marker = exception.downgrade();
        drop(exception);
        assert_eq!(marker.strong_count(), 0);

        bus.dispatch("next", Options::new());
        assert_eq!(bus.0.delivered.read().len(), 1);
    }

    #[test]
    fn dispatch_and_skip_are_traced() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let bus = Bus::new();
            let exception = bus.dispatch("traced", Options::new());
            let again = bus.dispatch(exception.clone(), Options::new());
            assert!(again.ptr_eq(&exception));
        });
    }

    #[test]
    #[should_panic(expected = "subscriber failed")]
    fn subscriber_panics_propagate() {
        let bus = Bus::new();
        bus.subscribe(|_| panic!("subscriber failed"));
        bus.dispatch("x", Options::new());
    }
}
