//! Stack trace parsing and capture.
//!
//! Stack text comes in two broad families. Call-site-first lines look like
//! `    at name (location:line:column)` and function-at-location lines look
//! like `name@location:line:column`. [`parse`] recognizes both, line by line,
//! and silently drops every line that matches neither (headers, messages,
//! blank lines).
//!
//! Stacks captured by this crate are written in the call-site-first form, so
//! they parse back into the same frames they were rendered from.
//!
//! # Examples
//!
//! ```
//! use blunder::stacktrace::{self, Frame};
//!
//! let frames = stacktrace::parse(
//!     "TypeError: boom\n    at load (http://example.com/app.js:10:4)\ninit@http://example.com/app.js:2",
//! );
//! assert_eq!(
//!     frames,
//!     [
//!         Frame::new("load", "http://example.com/app.js", Some(10), Some(4)),
//!         Frame::new("init", "http://example.com/app.js", Some(2), None),
//!     ]
//! );
//! ```

use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::{NativeError, exception::Exception};

/// The function name used when a frame does not name its function.
pub const UNKNOWN_FUNCTION: &str = "<unknown>";

const CALL_SITE_FIRST: &str = r"(?i)^\s*at\s(?:(.*?)\s\(|\()?((?:file|https?|blob|chrome-extension|native|eval|webpack|<anonymous>|/|[a-z]:\\|\\\\).*?)(?::([0-9]+))?(?::([0-9]+))?\)?\s*$";
const FUNCTION_AT_LOCATION: &str = r"(?i)^\s*(.*?)?(?:^|@)((?:file|https?|blob|chrome|webpack|resource|\[native).*?|[^@]*bundle)(?::([0-9]+))?(?::([0-9]+))?\s*$";

/// One parsed stack entry.
///
/// Serializes as `{functionName, fileName, lineNumber, columnNumber}` with
/// `null` for absent fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// The function name, or [`UNKNOWN_FUNCTION`].
    pub function_name: String,
    /// The file or URL the frame points at.
    pub file_name: Option<String>,
    /// The 1-based line number.
    pub line_number: Option<u32>,
    /// The 1-based column number.
    pub column_number: Option<u32>,
}

impl Frame {
    /// Creates a frame pointing at a file.
    #[must_use]
    pub fn new(
        function_name: impl Into<String>,
        file_name: impl Into<String>,
        line_number: Option<u32>,
        column_number: Option<u32>,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            file_name: Some(file_name.into()),
            line_number,
            column_number,
        }
    }

    // Numbers too large for a `u32` saturate; absent ones stay `None`.
    fn from_captures(captures: &Captures<'_>) -> Self {
        let number = |index| {
            captures
                .get(index)
                .map(|digits| digits.as_str().parse().unwrap_or(u32::MAX))
        };
        Self {
            function_name: captures
                .get(1)
                .map(|name| name.as_str())
                .filter(|name| !name.is_empty())
                .unwrap_or(UNKNOWN_FUNCTION)
                .to_string(),
            file_name: captures.get(2).map(|file| file.as_str().to_string()),
            line_number: number(3),
            column_number: number(4),
        }
    }
}

/// Where [`stacktrace`] reads its stack from.
#[derive(Clone, Copy, Debug)]
pub enum StackSource<'a> {
    /// Raw stack text.
    Text(&'a str),
    /// The stack of a native error.
    Error(&'a NativeError),
    /// The stack of an exception.
    Exception(&'a Exception),
    /// A fresh capture of the current thread, starting at the caller.
    Capture,
}

impl<'a> From<&'a str> for StackSource<'a> {
    fn from(text: &'a str) -> Self {
        StackSource::Text(text)
    }
}

impl<'a> From<&'a String> for StackSource<'a> {
    fn from(text: &'a String) -> Self {
        StackSource::Text(text)
    }
}

impl<'a> From<&'a NativeError> for StackSource<'a> {
    fn from(error: &'a NativeError) -> Self {
        StackSource::Error(error)
    }
}

impl<'a> From<&'a Exception> for StackSource<'a> {
    fn from(exception: &'a Exception) -> Self {
        StackSource::Exception(exception)
    }
}

fn patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(CALL_SITE_FIRST).expect("call-site-first pattern is valid"),
            Regex::new(FUNCTION_AT_LOCATION).expect("function-at-location pattern is valid"),
        ]
    })
}

/// Parses stack text into frames, in the order the lines appear.
#[must_use]
pub fn parse(stack: &str) -> Vec<Frame> {
    let [call_site_first, function_at_location] = patterns();
    stack
        .lines()
        .filter_map(|line| {
            call_site_first
                .captures(line)
                .or_else(|| function_at_location.captures(line))
        })
        .map(|captures| Frame::from_captures(&captures))
        .collect()
}

/// Parses the frames of a stack source.
///
/// ```
/// use blunder::{NativeError, stacktrace::{stacktrace, StackSource}};
///
/// let error = NativeError::from_parts("Error", "", "Error\n    at foo (http://path/to/file.js:34:27)");
/// assert_eq!(stacktrace(&error)[0].function_name, "foo");
///
/// let here = stacktrace(StackSource::Capture);
/// # let _ = here;
/// ```
#[must_use]
pub fn stacktrace<'a>(source: impl Into<StackSource<'a>>) -> Vec<Frame> {
    match source.into() {
        StackSource::Text(text) => parse(text),
        StackSource::Error(error) => parse(error.stack()),
        StackSource::Exception(exception) => parse(exception.stack()),
        StackSource::Capture => capture(),
    }
}

/// Captures the frames of the current thread, starting at the caller.
///
/// Without the `backtrace` feature this returns no frames.
#[must_use]
pub fn capture() -> Vec<Frame> {
    capture_frames(CaptureConfig::current())
        .into_iter()
        .map(|frame| Frame {
            function_name: frame.function_name,
            file_name: Some(frame.file_name),
            line_number: frame.line_number,
            column_number: frame.column_number,
        })
        .collect()
}

/// Renders a captured stack below `header` in the call-site-first form.
pub(crate) fn capture_text(header: &str) -> String {
    use core::fmt::Write as _;

    let mut text = String::from(header);
    for frame in capture_frames(CaptureConfig::current()) {
        let _ = write!(text, "\n    at {} ({}", frame.function_name, frame.file_name);
        if let Some(line) = frame.line_number {
            let _ = write!(text, ":{line}");
            if let Some(column) = frame.column_number {
                let _ = write!(text, ":{column}");
            }
        }
        text.push(')');
    }
    text
}

/// How stacks are captured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Maximum number of frames kept in a captured stack.
    pub max_frame_count: usize,
    /// Whether runtime frames (`std`, `core`, `alloc`) at the bottom of the
    /// stack are dropped.
    pub filter: bool,
    /// Symbol paths whose frames are dropped from the top of the stack,
    /// until the first frame outside all of them.
    ///
    /// An entry matches a symbol equal to it or nested below it, so
    /// `blunder` covers every function of this crate and
    /// `blunder::stacktrace::capture` covers `capture` and its closures.
    pub skipped: &'static [&'static str],
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_frame_count: 100,
            filter: true,
            skipped: INITIAL_SKIPPED,
        }
    }
}

impl CaptureConfig {
    /// Reads the configuration from the environment.
    ///
    /// `RUST_BACKTRACE=full` disables filtering and the frame cap.
    /// `BLUNDER_MAX_FRAMES` overrides the frame cap.
    #[must_use]
    pub fn from_env() -> Self {
        let rust_backtrace_full =
            std::env::var_os("RUST_BACKTRACE").is_some_and(|var| var == "full");
        let mut config = if rust_backtrace_full {
            Self {
                max_frame_count: usize::MAX,
                filter: false,
                ..Self::default()
            }
        } else {
            Self::default()
        };
        if let Some(max) = std::env::var("BLUNDER_MAX_FRAMES")
            .ok()
            .and_then(|var| var.trim().parse().ok())
        {
            config.max_frame_count = max;
        }
        config
    }

    /// The process-wide configuration, read from the environment once.
    pub fn current() -> &'static Self {
        static CURRENT: OnceLock<CaptureConfig> = OnceLock::new();
        CURRENT.get_or_init(Self::from_env)
    }

    #[cfg_attr(not(feature = "backtrace"), allow(dead_code))]
    fn skips(&self, sym: &str) -> bool {
        let path = sym.trim_start_matches('<');
        self.skipped.iter().any(|entry| {
            path.strip_prefix(*entry)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
        })
    }
}

struct CapturedFrame {
    function_name: String,
    file_name: String,
    line_number: Option<u32>,
    column_number: Option<u32>,
    crate_name: Option<String>,
}

// Some panic entry points are unmangled and carry no crate path.
const INITIAL_SKIPPED: &[&str] = &[
    "backtrace",
    "blunder",
    "std",
    "core",
    "alloc",
    "__rustc",
    "rust_begin_unwind",
];
const RUNTIME_CRATES: &[&str] = &["std", "core", "alloc"];

#[cfg(feature = "backtrace")]
fn capture_frames(config: &CaptureConfig) -> Vec<CapturedFrame> {
    let mut initial_filtering = true;
    let mut frames: Vec<CapturedFrame> = Vec::new();
    let mut total_omitted_frames = 0_usize;

    backtrace::trace(|frame| {
        backtrace::resolve_frame(frame, |symbol| {
            // Frames without symbol names or filenames carry nothing to render.
            let (Some(sym), Some(filename)) = (symbol.name(), symbol.filename()) else {
                return;
            };

            let sym_demangled = alloc::format!("{sym:#}");
            let crate_name = crate_of(&sym_demangled);

            if initial_filtering {
                if config.skips(&sym_demangled) {
                    total_omitted_frames += 1;
                    return;
                }
                initial_filtering = false;
            }

            if frames.len() >= config.max_frame_count {
                total_omitted_frames += 1;
                return;
            }

            let function_name = sym_demangled
                .rsplit_once("::")
                .map_or(sym_demangled.as_str(), |(_, sym)| sym)
                .to_string();

            let file_name = if filename.is_relative()
                && let Ok(cwd) = std::env::current_dir()
            {
                cwd.join(filename).display().to_string()
            } else {
                filename.display().to_string()
            };

            frames.push(CapturedFrame {
                function_name,
                file_name,
                line_number: symbol.lineno(),
                column_number: symbol.colno(),
                crate_name,
            });
        });

        true
    });

    if config.filter {
        while frames.last().is_some_and(|frame| {
            frame
                .crate_name
                .as_deref()
                .is_some_and(|name| RUNTIME_CRATES.contains(&name))
        }) {
            frames.pop();
            total_omitted_frames += 1;
        }
    }

    tracing::trace!(
        frames = frames.len(),
        omitted = total_omitted_frames,
        "captured stack"
    );

    frames
}

#[cfg(not(feature = "backtrace"))]
fn capture_frames(_config: &CaptureConfig) -> Vec<CapturedFrame> {
    Vec::new()
}

/// The crate a demangled symbol belongs to.
#[cfg_attr(not(feature = "backtrace"), allow(dead_code))]
fn crate_of(sym: &str) -> Option<String> {
    let name = sym.trim_start_matches('<').split("::").next()?;
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}
