//! Transport-agnostic request descriptor and raw transport outcome.
//!
//! # Design
//! `HttpRequest` is the fully resolved request a transport sends: nothing in
//! it needs further interpretation. `TransportOutcome` is the mirror image,
//! the raw `(bytes?, status?, error?)` triple a transport reports back. Every
//! field of the outcome is optional because transports disagree on what they
//! can report; deciding what a partial outcome means is the classifier's job.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::TransportError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved, transport-ready HTTP request.
///
/// Produced by [`RequestSpec::build`](crate::RequestSpec::build). Headers keep
/// insertion order and hold at most one entry per (case-insensitive) name.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
    /// Responses must not be served from, or stored in, any cache.
    /// `UreqTransport` sends `Cache-Control: no-cache` for it; pluggable
    /// clients are expected to honor it their own way.
    pub bypass_cache: bool,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status line and headers of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    pub code: u16,
    pub headers: Vec<(String, String)>,
}

impl StatusInfo {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            headers: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// What a transport reports when its operation ends.
#[derive(Debug, Default)]
pub struct TransportOutcome {
    pub body: Option<Vec<u8>>,
    pub status: Option<StatusInfo>,
    pub error: Option<TransportError>,
}

impl TransportOutcome {
    /// A response with a status code and body.
    pub fn response(code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: Some(body.into()),
            status: Some(StatusInfo::new(code)),
            error: None,
        }
    }

    /// A transport-level failure with nothing received.
    pub fn failed(error: TransportError) -> Self {
        Self {
            body: None,
            status: None,
            error: Some(error),
        }
    }
}
