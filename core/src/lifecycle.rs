//! Request lifecycle and the cancellation guard.
//!
//! ```text
//! Idle --run--> Running --response--> Completed
//!   |              |
//!   +---cancel-----+-----cancel-----> Cancelled
//! ```
//!
//! `Cancelled` and `Completed` absorb every later transition. The state and
//! the transport's task handle share one lock, so "is this handle still
//! meaningful" is always answered by the state next to it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::transport::TaskHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Running,
    Cancelled,
    Completed,
}

impl Lifecycle {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Lifecycle::Cancelled | Lifecycle::Completed)
    }
}

#[derive(Debug)]
struct GuardState {
    state: Lifecycle,
    task: Option<TaskHandle>,
}

#[derive(Debug)]
pub(crate) struct CancellationGuard {
    inner: Mutex<GuardState>,
}

impl Default for CancellationGuard {
    fn default() -> Self {
        Self {
            inner: Mutex::new(GuardState {
                state: Lifecycle::Idle,
                task: None,
            }),
        }
    }
}

impl CancellationGuard {
    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> Lifecycle {
        self.lock().state
    }

    /// Idle -> Running. False if the request already left Idle.
    pub(crate) fn start(&self) -> bool {
        let mut guard = self.lock();
        if guard.state != Lifecycle::Idle {
            return false;
        }
        guard.state = Lifecycle::Running;
        true
    }

    /// Remember the transport's handle while the request is still running.
    ///
    /// A cancel that landed between submission and this call is honoured
    /// here by cancelling the handle straight away.
    pub(crate) fn attach(&self, task: TaskHandle) {
        let mut guard = self.lock();
        match guard.state {
            Lifecycle::Running => guard.task = Some(task),
            Lifecycle::Cancelled => {
                drop(guard);
                task.cancel();
            }
            Lifecycle::Idle | Lifecycle::Completed => {}
        }
    }

    /// Move to Cancelled from any non-terminal state and cancel the attached
    /// task, if any. False when already terminal.
    pub(crate) fn cancel(&self) -> bool {
        let mut guard = self.lock();
        if guard.state.is_terminal() {
            return false;
        }
        guard.state = Lifecycle::Cancelled;
        let task = guard.task.take();
        drop(guard);
        if let Some(task) = task {
            task.cancel();
        }
        true
    }

    /// Running -> Completed. The caller may only produce an observable effect
    /// when this returns true.
    pub(crate) fn complete(&self) -> bool {
        let mut guard = self.lock();
        if guard.state != Lifecycle::Running {
            return false;
        }
        guard.state = Lifecycle::Completed;
        guard.task = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn counting_handle() -> (TaskHandle, Arc<AtomicUsize>) {
        let cancels = Arc::new(AtomicUsize::new(0));
        let counter = cancels.clone();
        let handle = TaskHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (handle, cancels)
    }

    #[test]
    fn start_only_once() {
        let guard = CancellationGuard::default();
        assert!(guard.start());
        assert!(!guard.start());
        assert_eq!(guard.state(), Lifecycle::Running);
    }

    #[test]
    fn cancel_from_idle_blocks_start() {
        let guard = CancellationGuard::default();
        assert!(guard.cancel());
        assert!(!guard.start());
        assert_eq!(guard.state(), Lifecycle::Cancelled);
    }

    #[test]
    fn cancel_aborts_attached_task() {
        let guard = CancellationGuard::default();
        let (handle, cancels) = counting_handle();
        guard.start();
        guard.attach(handle);
        assert!(guard.cancel());
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert!(!guard.cancel());
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn attach_after_cancel_cancels_immediately() {
        let guard = CancellationGuard::default();
        let (handle, cancels) = counting_handle();
        guard.start();
        guard.cancel();
        guard.attach(handle);
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn completed_is_terminal() {
        let guard = CancellationGuard::default();
        let (handle, cancels) = counting_handle();
        guard.start();
        guard.attach(handle);
        assert!(guard.complete());
        assert!(!guard.complete());
        assert!(!guard.cancel());
        assert_eq!(cancels.load(Ordering::SeqCst), 0);
        assert_eq!(guard.state(), Lifecycle::Completed);
    }

    #[test]
    fn cancelled_never_completes() {
        let guard = CancellationGuard::default();
        guard.start();
        guard.cancel();
        assert!(!guard.complete());
        assert_eq!(guard.state(), Lifecycle::Cancelled);
    }

    #[test]
    fn racing_cancel_and_complete_pick_one_winner() {
        for _ in 0..200 {
            let guard = Arc::new(CancellationGuard::default());
            guard.start();
            let canceller = {
                let guard = guard.clone();
                std::thread::spawn(move || guard.cancel())
            };
            let completed = guard.complete();
            let cancelled = canceller.join().unwrap();
            assert!(completed ^ cancelled);
        }
    }
}
