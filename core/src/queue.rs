//! The single execution context all response handling runs on.
//!
//! # Design
//! Transports finish on whatever thread they like. Instead of touching the
//! request from there, they post a job to a `CallbackQueue`; the one
//! `CallbackPump` draining it runs jobs strictly one after another. Callers
//! therefore never see two callbacks for the same request run concurrently.
//!
//! The pump can be driven three ways: on a dedicated thread
//! ([`CallbackQueue::spawn`]), from an async task ([`CallbackPump::run_async`]),
//! or stepped by hand ([`CallbackPump::run_pending`]), which is what the
//! deterministic tests use.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Producer side. Cheap to clone; every clone feeds the same pump.
#[derive(Debug, Clone)]
pub struct CallbackQueue {
    sender: UnboundedSender<Job>,
}

/// Consumer side. There is exactly one per queue.
#[derive(Debug)]
pub struct CallbackPump {
    receiver: UnboundedReceiver<Job>,
}

impl CallbackQueue {
    pub fn new() -> (CallbackQueue, CallbackPump) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (CallbackQueue { sender }, CallbackPump { receiver })
    }

    /// A queue whose pump runs on its own named thread until every
    /// `CallbackQueue` clone has been dropped.
    pub fn spawn(thread_name: impl Into<String>) -> io::Result<CallbackQueue> {
        let (queue, pump) = Self::new();
        thread::Builder::new()
            .name(thread_name.into())
            .spawn(move || pump.run())?;
        Ok(queue)
    }

    /// Enqueue `job`. Returns false, dropping the job, once the pump is gone.
    pub(crate) fn post(&self, job: impl FnOnce() + Send + 'static) -> bool {
        if self.sender.send(Box::new(job)).is_err() {
            tracing::warn!("callback pump has shut down, dropping callback");
            return false;
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl CallbackPump {
    /// Run every job queued so far and return how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            run_job(job);
            ran += 1;
        }
        ran
    }

    /// Block the current thread running jobs until all producers are gone.
    ///
    /// Must not be called from inside an async runtime; use
    /// [`run_async`](Self::run_async) there.
    pub fn run(mut self) {
        while let Some(job) = self.receiver.blocking_recv() {
            run_job(job);
        }
        tracing::debug!("callback pump stopped");
    }

    pub async fn run_async(mut self) {
        while let Some(job) = self.receiver.recv().await {
            run_job(job);
        }
        tracing::debug!("callback pump stopped");
    }
}

/// A panicking callback is logged and swallowed; the pump keeps serving
/// every other request.
fn run_job(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        tracing::error!("callback panicked: {}", panic_message(payload.as_ref()));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
