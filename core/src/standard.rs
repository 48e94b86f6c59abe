//! The standard transport: ureq on the tokio blocking pool.
//!
//! # Design
//! ureq is blocking, so each send spawns an async task on the supplied runtime
//! that waits for a `spawn_blocking` call. The `TaskHandle` aborts that outer
//! task. Aborting drops the listener before it is notified, so no outcome is
//! reported for a cancelled request; the blocking call itself is released by
//! its own timeout or when the server answers.
//!
//! Every send uses a fresh `ureq::Agent`: no connections or responses are
//! reused between requests, and the per-request timeout maps directly onto
//! the agent's global timeout. Non-2xx statuses are returned as data, not
//! errors, so the classifier sees them.

use tokio::runtime::Handle;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, StatusInfo, TransportOutcome};
use crate::transport::{ResponseListener, TaskHandle, Transport};

#[derive(Debug, Clone)]
pub struct UreqTransport {
    runtime: Handle,
}

impl UreqTransport {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Bind to the runtime of the calling context, if there is one.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest, listener: ResponseListener) -> TaskHandle {
        let method = request.method;
        let url = request.url.to_string();
        let task = self.runtime.spawn(async move {
            let outcome = match tokio::task::spawn_blocking(move || execute(&request)).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => TransportOutcome::failed(TransportError::from(err)),
                Err(err) => {
                    tracing::error!(%method, %url, "transport task failed: {err}");
                    return;
                }
            };
            listener.notify_outcome(outcome);
        });
        TaskHandle::from_abort_handle(task.abort_handle())
    }
}

/// Request headers plus `Cache-Control: no-cache` for cache-bypassing
/// requests, unless the caller already chose a cache policy.
fn wire_headers(request: &HttpRequest) -> Vec<(&str, &str)> {
    let mut headers: Vec<_> = request
        .headers
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    if request.bypass_cache && request.header("cache-control").is_none() {
        headers.push(("Cache-Control", "no-cache"));
    }
    headers
}

fn execute(request: &HttpRequest) -> Result<TransportOutcome, ureq::Error> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(request.timeout))
        .build()
        .new_agent();

    let mut builder = ureq::http::Request::builder()
        .method(request.method.as_str())
        .uri(request.url.as_str());
    for (name, value) in wire_headers(request) {
        builder = builder.header(name, value);
    }

    let response = match (&request.body, request.method) {
        (Some(body), _) => agent.run(builder.body(body.clone())?)?,
        // Bodyless POST/PUT still announce an empty payload.
        (None, HttpMethod::Post | HttpMethod::Put) => agent.run(builder.body(Vec::<u8>::new())?)?,
        (None, _) => agent.run(builder.body(())?)?,
    };

    let (parts, mut body) = response.into_parts();
    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let bytes = body.read_to_vec()?;

    Ok(TransportOutcome {
        body: Some(bytes),
        status: Some(StatusInfo {
            code: parts.status.as_u16(),
            headers,
        }),
        error: None,
    })
}
