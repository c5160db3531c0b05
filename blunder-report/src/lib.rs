#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Posting blunder exceptions to a collection endpoint.
//!
//! [`report`] serializes a payload with [`blunder::serialize`], posts it as
//! JSON and returns the JSON the endpoint answered with. Every failure along
//! the way comes back as an [`Exception`]:
//!
//! - the request could not be sent or its body could not be read: the
//!   exception carries the underlying error's message, and the error itself
//!   as its [`source`](Exception::source);
//! - the endpoint answered with a non-success status: the message is the
//!   status text, e.g. `Internal Server Error`;
//! - the answer was not JSON: the message is the parse error.
//!
//! # Quick Start
//!
//! ```no_run
//! use blunder::{Bus, Options};
//!
//! let bus = Bus::new();
//! bus.subscribe(|exception| {
//!     if let Err(failure) = blunder_report::report("https://example.com/errors", exception) {
//!         tracing::warn!(%failure, "could not report exception");
//!     }
//! });
//!
//! bus.dispatch("checkout failed", Options::new().with("cart", 42));
//! ```
//!
//! # Custom transports
//!
//! [`Reporter`] is generic over a [`Transport`], which is the only part that
//! talks to the network. [`HttpTransport`] is the `reqwest` implementation
//! used by [`report`]; tests and unusual environments can supply their own.

use core::time::Duration;

use blunder::{Exception, NativeError, Options, Value};
use reqwest::{
    blocking::Client,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use tracing::debug;

/// What an endpoint answered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// The HTTP status code.
    pub status: u16,
    /// The status text, e.g. `Not Found`.
    pub status_text: String,
    /// The raw response body.
    pub body: String,
}

impl Response {
    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one JSON document to a URL.
pub trait Transport {
    /// Posts `body` to `url`.
    ///
    /// # Errors
    ///
    /// Returns the error that kept the request from completing. A response
    /// with an error status is still an `Ok`.
    fn post(&self, url: &str, body: &serde_json::Value) -> Result<Response, NativeError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(&self, url: &str, body: &serde_json::Value) -> Result<Response, NativeError> {
        (**self).post(url, body)
    }
}

/// Configuration of an [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct ReportConfig {
    /// Total time allowed for one request, `None` for no limit.
    pub timeout: Option<Duration>,
    /// Headers sent with every request, in addition to `Content-Type`.
    pub headers: Vec<(String, String)>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            headers: Vec::new(),
        }
    }
}

impl ReportConfig {
    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, thiserror::Error)]
enum ReportError {
    #[error("invalid header name {0:?}")]
    HeaderName(String, #[source] reqwest::header::InvalidHeaderName),
    #[error("invalid value for header {0:?}")]
    HeaderValue(String, #[source] reqwest::header::InvalidHeaderValue),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Body(#[from] serde_json::Error),
}

impl From<ReportError> for NativeError {
    fn from(error: ReportError) -> Self {
        NativeError::from_error(&error)
    }
}

impl From<ReportError> for Exception {
    fn from(error: ReportError) -> Self {
        Exception::from_value(NativeError::from(error), Options::new())
    }
}

/// A [`Transport`] on a blocking `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a transport.
    ///
    /// # Errors
    ///
    /// Fails when a configured header is not a valid HTTP header, or when the
    /// HTTP client cannot be initialized.
    pub fn new(config: ReportConfig) -> Result<Self, Exception> {
        let mut headers = HeaderMap::new();
        for (name, value) in config.headers {
            let header_value = HeaderValue::from_str(&value)
                .map_err(|error| ReportError::HeaderValue(name.clone(), error))?;
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|error| ReportError::HeaderName(name, error))?;
            headers.insert(header_name, header_value);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ReportError::from)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post(&self, url: &str, body: &serde_json::Value) -> Result<Response, NativeError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(ReportError::from)?;
        let status = response.status();
        let status_text = status
            .canonical_reason()
            .map_or_else(|| status.as_str().to_owned(), str::to_owned);
        let body = response.text().map_err(ReportError::from)?;
        Ok(Response {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}

/// Posts payloads through a [`Transport`].
#[derive(Clone, Debug, Default)]
pub struct Reporter<T> {
    transport: T,
}

impl<T: Transport> Reporter<T> {
    /// Creates a reporter.
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The transport requests go through.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Serializes `payload`, posts it to `destination` and parses the answer.
    ///
    /// # Errors
    ///
    /// See the [crate documentation](crate) for the three ways this fails.
    pub fn report(
        &self,
        destination: &str,
        payload: impl Into<Value>,
    ) -> Result<serde_json::Value, Exception> {
        let body = blunder::serialize(&payload.into()).to_json();

        let response = self.transport.post(destination, &body).map_err(|error| {
            debug!(destination, %error, "report could not be sent");
            Exception::from_value(error, Options::new())
        })?;

        if !response.is_success() {
            debug!(destination, status = response.status, "report rejected");
            return Err(Exception::from_value(response.status_text, Options::new()));
        }

        let answer = serde_json::from_str(&response.body).map_err(|error| {
            debug!(destination, %error, "report answer is not JSON");
            Exception::from(ReportError::from(error))
        })?;
        debug!(destination, status = response.status, "report delivered");
        Ok(answer)
    }
}

/// Posts `payload` to `destination` with a default [`HttpTransport`].
///
/// # Errors
///
/// See the [crate documentation](crate) for the ways this fails.
pub fn report(
    destination: &str,
    payload: impl Into<Value>,
) -> Result<serde_json::Value, Exception> {
    Reporter::new(HttpTransport::new(ReportConfig::default())?).report(destination, payload)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use blunder::Array;

    use super::*;

    static_assertions::assert_impl_all!(HttpTransport: Send, Sync);
    static_assertions::assert_impl_all!(Reporter<HttpTransport>: Send, Sync);

    struct FakeTransport {
        answer: Result<Response, NativeError>,
        requests: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl FakeTransport {
        fn answering(status: u16, status_text: &str, body: &str) -> Self {
            Self::new(Ok(Response {
                status,
                status_text: status_text.to_owned(),
                body: body.to_owned(),
            }))
        }

        fn new(answer: Result<Response, NativeError>) -> Self {
            Self {
                answer,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl Transport for FakeTransport {
        fn post(&self, url: &str, body: &serde_json::Value) -> Result<Response, NativeError> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_owned(), body.clone()));
            self.answer.clone()
        }
    }

    #[test]
    fn posts_the_serialized_payload_and_returns_the_answer() {
        let transport = FakeTransport::answering(200, "OK", r#"{"done":true}"#);
        let reporter = Reporter::new(&transport);
        let exception = Exception::new("");

        let answer = reporter.report("/path/to/endpoint", &exception).unwrap();
        assert_eq!(answer, serde_json::json!({ "done": true }));

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "/path/to/endpoint");
        assert_eq!(requests[0].1, exception.to_json());
    }

    #[test]
    fn posts_arrays_of_exceptions() {
        let transport = FakeTransport::answering(200, "OK", "{}");
        let first = Exception::new("first");
        let second = Exception::new("second");
        let payload: Array = [Value::from(&first), Value::from(&second)].into_iter().collect();

        Reporter::new(&transport).report("/errors", payload).unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(
            requests[0].1,
            serde_json::Value::Array(vec![first.to_json(), second.to_json()])
        );
    }

    #[test]
    fn network_failures_keep_the_error_as_source() {
        let failure = NativeError::new("Could not connect");
        let transport = FakeTransport::new(Err(failure.clone()));

        let exception = Reporter::new(&transport)
            .report("/errors", Exception::new(""))
            .unwrap_err();
        assert_eq!(exception.message(), "Could not connect");
        assert_eq!(exception.source(), Some(&Value::from(failure)));
    }

    #[test]
    fn error_statuses_fail_with_the_status_text() {
        let transport = FakeTransport::answering(500, "Internal Server Error", "{}");

        let exception = Reporter::new(&transport)
            .report("/errors", Exception::new(""))
            .unwrap_err();
        assert_eq!(exception.message(), "Internal Server Error");
        assert!(exception.source().is_none());
    }

    #[test]
    fn unparsable_answers_fail_with_the_parse_error() {
        let transport = FakeTransport::answering(200, "OK", "");

        let exception = Reporter::new(&transport)
            .report("/errors", Exception::new(""))
            .unwrap_err();
        assert_eq!(
            exception.message(),
            "EOF while parsing a value at line 1 column 0"
        );
    }

    #[test]
    fn invalid_headers_are_rejected() {
        let config = ReportConfig::default().header("bad header", "value");
        let exception = HttpTransport::new(config).unwrap_err();
        assert_eq!(exception.message(), "invalid header name \"bad header\"");
    }
}
