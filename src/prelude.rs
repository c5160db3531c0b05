//! Commonly used items for convenient importing.
//!
//! ```rust
//! use blunder::prelude::*;
//!
//! fn divide(a: i32, b: i32) -> Result<i32, Exception> {
//!     if b == 0 {
//!         bail!("cannot divide {a} by zero");
//!     }
//!     Ok(a / b)
//! }
//!
//! let bus = Bus::new();
//! let failure = attempt(&bus, Options::new(), || divide(1, 0)).unwrap_err();
//! assert_eq!(failure.to_string(), "Exception: cannot divide 1 by zero");
//! ```
//!
//! # What's Included
//!
//! - **[`Exception`]**, **[`ExceptionKind`]**, **[`Options`]** and **[`Cause`]**
//! - **[`Value`]** and **[`NativeError`]**
//! - **[`Bus`]**, **[`attempt`]** and **[`serialize`]**
//! - **[`exception!`]**, **[`bail!`]**, **[`exception_kind!`]** and **[`object!`]**

pub use crate::{
    Bus, Cause, Exception, ExceptionKind, NativeError, Options, Value, attempt, bail, exception,
    exception_kind, object, serialize,
};
