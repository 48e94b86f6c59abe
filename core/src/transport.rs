//! The two transport seams and the one-shot listener they report through.
//!
//! A request object sends through exactly one of:
//! - a standard [`Transport`], which hands back a [`TaskHandle`] so the
//!   in-flight operation can be cancelled, or
//! - a [`PluggableClient`], which has no cancel primitive. Cancelling a
//!   request that went through one only suppresses the eventual callback; the
//!   network call itself runs to completion.
//!
//! Both report through a [`ResponseListener`]. The listener is consumed by
//! `notify_outcome`, so a transport cannot report twice. Dropping it without
//! reporting is also an outcome: the request completes with an internal error
//! instead of hanging forever.

use std::fmt;

use crate::http::{HttpRequest, TransportOutcome};

/// Non-owning handle to a standard transport's pending operation.
///
/// Dropping the handle does not cancel anything; only [`cancel`](Self::cancel)
/// does.
pub struct TaskHandle {
    cancel: Box<dyn Fn() + Send + Sync>,
}

impl TaskHandle {
    pub fn new(cancel: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    pub fn from_abort_handle(handle: tokio::task::AbortHandle) -> Self {
        Self::new(move || handle.abort())
    }

    pub fn cancel(&self) {
        (self.cancel)()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").finish_non_exhaustive()
    }
}

pub(crate) enum Delivery {
    Outcome(TransportOutcome),
    /// The listener was dropped without a report.
    Abandoned,
}

type Deliver = Box<dyn FnOnce(Delivery) + Send + 'static>;

/// Callback a transport invokes once its operation has ended.
pub struct ResponseListener {
    deliver: Option<Deliver>,
}

impl ResponseListener {
    pub(crate) fn new(deliver: impl FnOnce(Delivery) + Send + 'static) -> Self {
        Self {
            deliver: Some(Box::new(deliver)),
        }
    }

    /// Report the raw outcome. May be called from any thread.
    pub fn notify_outcome(mut self, outcome: TransportOutcome) {
        if let Some(deliver) = self.deliver.take() {
            deliver(Delivery::Outcome(outcome));
        }
    }
}

impl Drop for ResponseListener {
    fn drop(&mut self) {
        if let Some(deliver) = self.deliver.take() {
            tracing::debug!("response listener dropped without an outcome");
            deliver(Delivery::Abandoned);
        }
    }
}

impl fmt::Debug for ResponseListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseListener")
            .field("pending", &self.deliver.is_some())
            .finish()
    }
}

/// The standard transport: sends asynchronously and returns a cancellable
/// handle without blocking.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest, listener: ResponseListener) -> TaskHandle;
}

/// An alternate, caller-supplied client. It must eventually call
/// `listener.notify_outcome` (or drop the listener) and must not block.
pub trait PluggableClient: Send + Sync {
    fn execute(&self, request: HttpRequest, listener: ResponseListener);
}
