//! Forwarding panics to a [`Bus`].
//!
//! [`monitor`] installs a process-wide panic hook that turns every panic into
//! a [`NativeError`] named `Panic` and dispatches it on a bus, with the panic
//! location and thread name as data. There is only one panic hook per
//! process, so there is at most one monitor at a time.
//!
//! ```no_run
//! use blunder::{Bus, MonitorOptions, monitor};
//!
//! let bus = Bus::new();
//! bus.subscribe(|exception| eprintln!("captured: {exception}"));
//!
//! let handle = monitor(&bus, MonitorOptions::default());
//! // ...
//! handle.stop();
//! ```

use alloc::{boxed::Box, format, sync::Arc};
use core::sync::atomic::{AtomicU64, Ordering};
use std::panic::PanicHookInfo;

use crate::{bus::Bus, exception::Options, value::NativeError};

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static>;

struct Installed {
    generation: u64,
    previous: Arc<PanicHook>,
}

static INSTALLED: spin::Mutex<Option<Installed>> = spin::Mutex::new(None);
static GENERATION: AtomicU64 = AtomicU64::new(1);

/// What a monitor forwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Install the panic hook.
    pub panics: bool,
    /// Also run the hook that was installed before, after dispatching.
    pub chain_previous: bool,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            panics: true,
            chain_previous: true,
        }
    }
}

/// A handle to an installed monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Monitor {
    generation: u64,
}

/// Starts forwarding panics to `bus`.
///
/// If a monitor is already installed, nothing is added and a handle to the
/// installed monitor is returned.
///
/// Subscribers run inside the panic hook. A subscriber that panics there
/// aborts the process.
pub fn monitor(bus: &Bus, options: MonitorOptions) -> Monitor {
    if !options.panics {
        return Monitor { generation: 0 };
    }

    let mut installed = INSTALLED.lock();
    if let Some(current) = installed.as_ref() {
        tracing::debug!("panic monitor already installed");
        return Monitor {
            generation: current.generation,
        };
    }

    let previous: Arc<PanicHook> = Arc::new(std::panic::take_hook());
    let chained = Arc::clone(&previous);
    let chain_previous = options.chain_previous;
    let bus = bus.clone();
    std::panic::set_hook(Box::new(move |info| {
        let message = info.payload_as_str().unwrap_or("Box<dyn Any>");
        let error = NativeError::with_name("Panic", message);
        let mut data = Options::new().with(
            "thread",
            std::thread::current().name().unwrap_or("<unnamed>"),
        );
        if let Some(location) = info.location() {
            data.insert(
                "location",
                format!("{}:{}:{}", location.file(), location.line(), location.column()),
            );
        }
        bus.dispatch(error, data);
        if chain_previous {
            chained(info);
        }
    }));

    let generation = GENERATION.fetch_add(1, Ordering::Relaxed);
    *installed = Some(Installed {
        generation,
        previous,
    });
    tracing::debug!(generation, "panic monitor installed");

    Monitor { generation }
}

impl Monitor {
    /// Uninstalls the monitor and restores the panic hook that was installed
    /// before it. Does nothing if this monitor is no longer installed.
    pub fn stop(&self) {
        let mut installed = INSTALLED.lock();
        if installed
            .as_ref()
            .is_none_or(|current| current.generation != self.generation)
        {
            return;
        }
        let Some(Installed { previous, .. }) = installed.take() else {
            return;
        };

        drop(std::panic::take_hook());
        match Arc::try_unwrap(previous) {
            Ok(hook) => std::panic::set_hook(hook),
            Err(shared) => std::panic::set_hook(Box::new(move |info| shared(info))),
        }
        tracing::debug!(generation = self.generation, "panic monitor stopped");
    }

    /// Returns `true` while this monitor is installed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        INSTALLED
            .lock()
            .as_ref()
            .is_some_and(|current| current.generation == self.generation)
    }
}
