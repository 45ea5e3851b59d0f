//! Debounced autosave task
//!
//! Each call to [`Autosave::schedule`] aborts the previous task and spawns a
//! new one that runs its job after the configured delay, so only the last
//! schedule in a quiet window fires.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Single-slot cancellable delayed job
#[derive(Debug)]
pub struct Autosave {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Autosave {
    /// Create an autosave slot with the given quiet-window delay
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Quiet-window delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace any pending job with `job`, to run after the delay
    ///
    /// Outside a tokio runtime nothing is spawned and the job is dropped.
    pub fn schedule<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = self.slot();
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No async runtime available, autosave not scheduled");
            return;
        };

        let delay = self.delay;
        *slot = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            job();
        }));
    }

    /// Abort the pending job, if any
    ///
    /// Returns true if a job was waiting and has been cancelled.
    pub fn cancel(&self) -> bool {
        match self.slot().take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    /// Whether a job is scheduled and has not run yet
    pub fn is_pending(&self) -> bool {
        self.slot().as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        if self.cancel() {
            tracing::debug!("Cancelled pending autosave on drop");
        }
    }
}
