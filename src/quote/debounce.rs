use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};

/// Handle to one armed timer
#[derive(Debug, Clone)]
pub struct DebounceHandle {
    abort: AbortHandle,
}

impl DebounceHandle {
    /// Cancel this timer if it has not fired yet
    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Cancelable trailing-edge timer.
///
/// Each [`Debouncer::schedule`] cancels the previously armed timer. When a
/// timer fires its action is spawned as an independent task, so cancelling
/// later never aborts an action that already started.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            timer: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Arm the timer to run `action` once `window` passes without re-arming
    pub fn schedule<F>(&self, action: F) -> DebounceHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let window = self.window;
        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            tokio::spawn(action);
        });
        let handle = DebounceHandle {
            abort: task.abort_handle(),
        };

        if let Some(previous) = self.timer().replace(task) {
            previous.abort();
        }

        handle
    }

    /// Cancel the armed timer; returns whether one was pending
    pub fn cancel(&self) -> bool {
        match self.timer().take() {
            Some(task) => {
                let pending = !task.is_finished();
                task.abort();
                pending
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.timer().as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
