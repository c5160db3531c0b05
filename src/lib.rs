#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unsafe_code,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Capture, normalize, serialize and dispatch errors.
//!
//! ## Overview
//!
//! blunder turns any failure value into one canonical [`Exception`], keeps
//! the contextual data and causal chain that came with it, parses its stack
//! text into structured [`Frame`]s, serializes it (and anything reachable
//! from it, cycles included) into a JSON-safe tree, and hands it exactly once
//! to every interested observer.
//!
//! ## Quick Example
//!
//! ```
//! use blunder::prelude::*;
//!
//! let bus = Bus::new();
//! let _subscription = bus.subscribe(|exception| {
//!     let payload = serialize(&Value::from(exception)).to_json();
//!     assert_eq!(payload["message"], "disk full");
//! });
//!
//! let failure = NativeError::new("disk full");
//! let exception = bus.dispatch(failure, Options::new().with("requestId", "a1b2"));
//! assert_eq!(exception.name(), "Exception");
//! assert_eq!(exception.data().get("requestId"), Some(Value::from("a1b2")));
//! ```
//!
//! ## Core Concepts
//!
//! A failure can show up as many different shapes: a canonical exception, a
//! foreign error object (possibly wrapping several errors at once), a plain
//! string, or anything else. All of these are represented by the closed
//! [`Value`] model, and [`Exception::from_value`] is the one entry point that
//! turns any of them into an [`Exception`]:
//!
//! - An [`Exception`] of the requested kind is returned as the **same
//!   instance**, with new contextual data merged into it.
//! - A foreign error ([`NativeError`]) is wrapped. Its message and stack are
//!   copied verbatim and an aggregate error's inner errors become the cause.
//! - Anything else is converted to its string form and becomes the message.
//!
//! Exception variants are described by static [`ExceptionKind`]s declared
//! with [`exception_kind!`]. A kind reports its own name while sharing the
//! behavior of its parent kinds.
//!
//! The [`serialize`](serialize::serialize) function walks a value graph and
//! replaces every reference back to an ancestor with `"[Circular]"`, so
//! self-referencing errors and data still produce a finite payload.
//!
//! The [`Bus`] delivers each exception instance to its subscribers at most
//! once, however many code paths end up dispatching it.
//!
//! ## Ecosystem
//!
//! - **[`blunder-report`]** posts serialized exceptions to a collection
//!   endpoint.
//!
//! [`blunder-report`]: https://docs.rs/blunder-report
//!
//! ## Features
//!
//! - `backtrace` (default): capture the current call stack when an exception
//!   or native error is created. Without it, stacks contain only the header
//!   line.
//! - `compat-anyhow1`, `compat-eyre06`: convert [`anyhow`] and [`eyre`] errors
//!   into [`NativeError`]s, see [`compat`].
//!
//! [`anyhow`]: https://docs.rs/anyhow
//! [`eyre`]: https://docs.rs/eyre

extern crate alloc;

#[macro_use]
mod macros;

pub mod attempt;
pub mod bus;
pub mod compat;
pub mod exception;
pub mod metadata;
pub mod monitor;
pub mod prelude;
pub mod serialize;
pub mod stacktrace;
pub mod value;

pub use self::{
    attempt::attempt,
    bus::{Bus, Subscription},
    exception::{Cause, EXCEPTION, Exception, ExceptionKind, Options},
    monitor::{Monitor, MonitorOptions, monitor},
    serialize::{Serialized, serialize},
    stacktrace::{Frame, stacktrace},
    value::{Array, Function, NativeError, Object, Opaque, Value},
};

/// A [`Result`](core::result::Result) type alias where the error is an
/// [`Exception`].
///
/// # Examples
///
/// ```
/// fn might_fail() -> blunder::Result<String> {
///     Ok("success".to_string())
/// }
/// ```
pub type Result<T, E = Exception> = core::result::Result<T, E>;

// Not public API. Referenced by macro-generated code.
#[doc(hidden)]
pub mod __private {
    #[doc(hidden)]
    pub use alloc::format;
    #[doc(hidden)]
    pub use core::result::Result::Err;
}
