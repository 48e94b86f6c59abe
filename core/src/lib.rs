//! Single-request HTTP client core.
//!
//! # Overview
//! A request object turns a declarative [`RequestSpec`] into an
//! [`HttpRequest`], sends it through exactly one transport, and maps what
//! comes back into a typed [`ApiResult`] or a [`RequestError`]:
//!
//! ```text
//! RequestSpec --build--> HttpRequest --transport--> TransportOutcome
//!     --CallbackQueue--> classify --> completion | custom handler
//! ```
//!
//! # Design
//! - Building is pure and synchronous; a bad URL or body fails before any
//!   network activity.
//! - Transports are traits. [`Transport`] is the standard, cancellable one
//!   ([`UreqTransport`] ships as a reference); [`PluggableClient`] is an
//!   override without a cancel primitive.
//! - Every transport callback is posted to one [`CallbackQueue`], so callers
//!   never see re-entrant callbacks for a request.
//! - A lifecycle guard makes `run` idempotent and guarantees that nothing
//!   observable happens after `cancel`.
//! - No retries, pooling, or auth handling; those belong to callers.
//!
//! # Example
//!
//! ```no_run
//! use api_request::{CallbackQueue, Client, RequestSpec};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Token {
//!     access_token: String,
//! }
//!
//! #[derive(Debug, Deserialize)]
//! struct OAuthError {
//!     error: String,
//! }
//!
//! # fn main() -> std::io::Result<()> {
//! let runtime = tokio::runtime::Runtime::new()?;
//! let queue = CallbackQueue::spawn("api-callbacks")?;
//! let client = Client::with_runtime(runtime.handle().clone(), queue);
//!
//! let spec = RequestSpec::post("https://example.com")
//!     .with_path("/token")
//!     .with_body_param("grant_type", "password");
//! let request = client.request::<Token, OAuthError>(spec, |_, result| match result {
//!     Ok(token) => println!("token {}", token.value.access_token),
//!     Err(err) => eprintln!("login failed: {err}"),
//! });
//! request.run();
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod classifier;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod queue;
pub mod request;
mod sink;
pub mod standard;
pub mod transport;

pub use builder::RequestSpec;
pub use classifier::{ApiResult, Payload};
pub use client::Client;
pub use config::ClientConfig;
pub use decoder::Decoder;
pub use error::{BuildError, RequestError, TransportError};
pub use http::{HttpMethod, HttpRequest, StatusInfo, TransportOutcome};
pub use lifecycle::Lifecycle;
pub use queue::{CallbackPump, CallbackQueue};
pub use request::ApiRequest;
pub use standard::UreqTransport;
pub use transport::{PluggableClient, ResponseListener, TaskHandle, Transport};
