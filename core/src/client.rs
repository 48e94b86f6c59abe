//! Shared context that creates request objects.
//!
//! # Design
//! `Client` carries what every request needs but does not own: the
//! configuration, the standard transport, an optional pluggable client and
//! the callback queue. It holds no per-request state and is cheap to clone.
//!
//! The transport choice is copied into each request when it is created, so
//! installing or removing a pluggable client later never affects requests
//! that already exist.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::runtime::Handle;

use crate::builder::RequestSpec;
use crate::classifier::ApiResult;
use crate::config::ClientConfig;
use crate::decoder::Decoder;
use crate::error::RequestError;
use crate::queue::CallbackQueue;
use crate::request::{ApiRequest, Route};
use crate::sink::{CustomHandler, DefaultCompletion};
use crate::standard::UreqTransport;
use crate::transport::{PluggableClient, Transport};

#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    pluggable: Option<Arc<dyn PluggableClient>>,
    queue: CallbackQueue,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>, queue: CallbackQueue) -> Self {
        Self {
            config: ClientConfig::default(),
            transport,
            pluggable: None,
            queue,
        }
    }

    /// A client whose standard transport is [`UreqTransport`] on `runtime`.
    pub fn with_runtime(runtime: Handle, queue: CallbackQueue) -> Self {
        Self::new(Arc::new(UreqTransport::new(runtime)), queue)
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Route requests created from now on through `client` instead of the
    /// standard transport.
    pub fn with_pluggable_client(mut self, client: Arc<dyn PluggableClient>) -> Self {
        self.pluggable = Some(client);
        self
    }

    pub fn without_pluggable_client(mut self) -> Self {
        self.pluggable = None;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn queue(&self) -> &CallbackQueue {
        &self.queue
    }

    fn route(&self) -> Route {
        match &self.pluggable {
            Some(client) => Route::Pluggable(Arc::clone(client)),
            None => Route::Standard(Arc::clone(&self.transport)),
        }
    }

    /// A request whose outcome goes to `completion`, exactly once.
    ///
    /// `T` is the success payload, `E` the structured error payload servers
    /// send with non-2xx statuses.
    pub fn request<T, E>(
        &self,
        spec: RequestSpec,
        completion: impl FnOnce(&ApiRequest<T, E>, ApiResult<T, E>) + Send + 'static,
    ) -> Arc<ApiRequest<T, E>>
    where
        T: DeserializeOwned + Send + 'static,
        E: DeserializeOwned + Send + 'static,
    {
        ApiRequest::new(
            spec,
            self.config.clone(),
            self.route(),
            self.queue.clone(),
            Box::new(DefaultCompletion(completion)),
        )
    }

    /// A request whose outcome goes to `handler` instead of a completion.
    ///
    /// On 2xx the handler gets the raw body and the shared decoder with no
    /// error. Every failure, including build and connection failures, also
    /// goes to the handler, with whatever bytes were received.
    pub fn request_with_handler<T, E>(
        &self,
        spec: RequestSpec,
        handler: impl FnOnce(&ApiRequest<T, E>, Option<&[u8]>, &Decoder, Option<RequestError<E>>)
            + Send
            + 'static,
    ) -> Arc<ApiRequest<T, E>>
    where
        T: DeserializeOwned + Send + 'static,
        E: DeserializeOwned + Send + 'static,
    {
        ApiRequest::new(
            spec,
            self.config.clone(),
            self.route(),
            self.queue.clone(),
            Box::new(CustomHandler(handler)),
        )
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("pluggable", &self.pluggable.is_some())
            .finish_non_exhaustive()
    }
}
