//! Error types for the request pipeline.
//!
//! # Design
//! Three layers, one per stage that can fail:
//! - `BuildError` is local and synchronous; it never involves the network.
//! - `TransportError` is what a transport reports when it could not obtain a
//!   response at all.
//! - `RequestError<E>` is the closed set of failures a caller can observe.
//!   `E` is the caller's structured server-error payload.

use thiserror::Error;

/// The request could not be turned into an `HttpRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// `base_url` does not parse as an absolute URL.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported URL scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    /// URLs such as `mailto:` have no path component to replace.
    #[error("URL '{0}' cannot carry a path")]
    CannotBeABase(String),

    /// A body parameter could not be represented as JSON.
    #[error("body parameter '{key}' is not JSON-serializable: {reason}")]
    Body { key: String, reason: String },

    #[error("failed to serialize request body: {0}")]
    Serialize(String),
}

/// Failure reported by a transport before any response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    /// DNS, refused or reset connections, TLS failures.
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(_) => TransportError::Timeout,
            ureq::Error::HostNotFound => TransportError::Connection(err.to_string()),
            ureq::Error::Io(io_err) => match io_err.kind() {
                std::io::ErrorKind::TimedOut => TransportError::Timeout,
                std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::NotConnected => TransportError::Connection(io_err.to_string()),
                _ => TransportError::Io(io_err.to_string()),
            },
            other => TransportError::Other(other.to_string()),
        }
    }
}

/// Every way a request can fail, as delivered to the completion or the
/// custom handler.
#[derive(Debug, Error)]
pub enum RequestError<E> {
    /// Malformed URL or non-serializable body. No network activity happened.
    #[error("failed to build request: {0}")]
    BuildFailure(#[from] BuildError),

    #[error(transparent)]
    ConnectionError(#[from] TransportError),

    /// The transport returned neither a body nor a status.
    #[error("server returned an empty response")]
    EmptyServerResponse,

    /// Non-2xx status with a body that decoded as the error payload.
    #[error("server returned status {status}")]
    ServerError { status: u16, payload: E },

    /// A body was present but did not match the expected JSON shape. The raw
    /// bytes are kept for diagnostics.
    #[error("failed to decode response body: {cause}")]
    DecodeError {
        #[source]
        cause: serde_json::Error,
        raw: Vec<u8>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl<E> RequestError<E> {
    /// Whether retrying the same request might succeed. Nothing in this crate
    /// retries; this only informs caller policy.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RequestError::ConnectionError(_) | RequestError::EmptyServerResponse
        )
    }

    /// Raw response bytes, when the failure carries any.
    pub fn raw_body(&self) -> Option<&[u8]> {
        match self {
            RequestError::DecodeError { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
