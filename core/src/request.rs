//! A single request object: build, dispatch, classify, complete.
//!
//! # Design
//! `ApiRequest` owns its `RequestSpec`, its lifecycle and its outcome sink.
//! `run` builds the spec and submits it to the transport chosen when the
//! request was created. The listener handed to the transport holds an `Arc`
//! of the request, which keeps the request alive until the transport reports
//! or gives up, and is released right after.
//!
//! Transport callbacks never touch the request directly: they post to the
//! `CallbackQueue`, and the terminal transition (Running -> Completed) is
//! taken there under the lifecycle lock before anything observable happens.
//! A cancel that wins that race leaves the callback with nothing to do.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::builder::RequestSpec;
use crate::classifier::{classify, Classification};
use crate::config::ClientConfig;
use crate::decoder::Decoder;
use crate::error::RequestError;
use crate::lifecycle::{CancellationGuard, Lifecycle};
use crate::queue::CallbackQueue;
use crate::sink::OutcomeSink;
use crate::transport::{Delivery, PluggableClient, ResponseListener, Transport};

/// Transport selection, fixed for the lifetime of a request.
#[derive(Clone)]
pub(crate) enum Route {
    Standard(Arc<dyn Transport>),
    Pluggable(Arc<dyn PluggableClient>),
}

pub struct ApiRequest<T, E> {
    id: Uuid,
    spec: Mutex<RequestSpec>,
    config: ClientConfig,
    route: Route,
    queue: CallbackQueue,
    guard: CancellationGuard,
    sink: Mutex<Option<Box<dyn OutcomeSink<T, E>>>>,
}

impl<T, E> ApiRequest<T, E>
where
    T: DeserializeOwned + Send + 'static,
    E: DeserializeOwned + Send + 'static,
{
    pub(crate) fn new(
        spec: RequestSpec,
        config: ClientConfig,
        route: Route,
        queue: CallbackQueue,
        sink: Box<dyn OutcomeSink<T, E>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            spec: Mutex::new(spec),
            config,
            route,
            queue,
            guard: CancellationGuard::default(),
            sink: Mutex::new(Some(sink)),
        })
    }

    /// Build and submit the request. Only the first call on an idle request
    /// does anything; the rest, and any call after `cancel`, are no-ops.
    ///
    /// Returns without waiting for the network. A spec that fails to build is
    /// reported synchronously, before this returns, as
    /// [`RequestError::BuildFailure`].
    pub fn run(self: &Arc<Self>) {
        if !self.guard.start() {
            tracing::debug!(id = %self.id, state = ?self.guard.state(), "run ignored");
            return;
        }

        let built = lock(&self.spec).build(&self.config);
        let request = match built {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(id = %self.id, "failed to build request: {err}");
                if self.guard.complete() {
                    self.dispatch(Classification::rejected(RequestError::BuildFailure(err)));
                }
                return;
            }
        };

        tracing::debug!(
            id = %self.id,
            method = %request.method,
            url = %request.url,
            pluggable = self.uses_pluggable_client(),
            "dispatching request"
        );

        let this = Arc::clone(self);
        let queue = self.queue.clone();
        let listener = ResponseListener::new(move |delivery| {
            let id = this.id;
            if !queue.post(move || this.handle_delivery(delivery)) {
                tracing::warn!(%id, "outcome dropped, callback queue is closed");
            }
        });

        match &self.route {
            Route::Standard(transport) => {
                let task = transport.send(request, listener);
                self.guard.attach(task);
            }
            Route::Pluggable(client) => client.execute(request, listener),
        }
    }

    fn handle_delivery(&self, delivery: Delivery) {
        if !self.guard.complete() {
            tracing::debug!(id = %self.id, state = ?self.guard.state(), "discarding late outcome");
            return;
        }
        let classification = match delivery {
            Delivery::Outcome(outcome) => classify(outcome, Decoder::shared()),
            Delivery::Abandoned => Classification::rejected(RequestError::Internal(
                "transport dropped the response listener without reporting an outcome".to_string(),
            )),
        };
        self.dispatch(classification);
    }

    fn dispatch(&self, classification: Classification<E>) {
        if let Classification::Rejected { error, .. } = &classification {
            tracing::debug!(id = %self.id, "request failed: {error}");
        }
        let Some(sink) = lock(&self.sink).take() else {
            tracing::error!(id = %self.id, "outcome sink already consumed");
            return;
        };
        sink.deliver(self, classification, Decoder::shared());
    }
}

impl<T, E> ApiRequest<T, E> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> Lifecycle {
        self.guard.state()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == Lifecycle::Cancelled
    }

    pub fn uses_pluggable_client(&self) -> bool {
        matches!(self.route, Route::Pluggable(_))
    }

    /// Snapshot of the current spec.
    pub fn spec(&self) -> RequestSpec {
        lock(&self.spec).clone()
    }

    /// Edit the spec. Only applies while the request is still idle; returns
    /// whether the edit was applied.
    pub fn update_spec(&self, edit: impl FnOnce(&mut RequestSpec)) -> bool {
        let mut spec = lock(&self.spec);
        if self.guard.state() != Lifecycle::Idle {
            return false;
        }
        edit(&mut spec);
        true
    }

    /// Stop the request. No completion or custom handler runs afterwards.
    ///
    /// With the standard transport the in-flight operation is aborted. With a
    /// pluggable client the call keeps running and its result is discarded.
    pub fn cancel(&self) {
        if self.guard.cancel() {
            tracing::debug!(id = %self.id, "request cancelled");
        }
    }
}

impl<T, E> fmt::Debug for ApiRequest<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("id", &self.id)
            .field("state", &self.guard.state())
            .field("pluggable", &self.uses_pluggable_client())
            .finish_non_exhaustive()
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
