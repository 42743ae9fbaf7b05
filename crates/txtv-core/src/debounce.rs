//! Restartable one-shot timer.
//!
//! Backs the staged cache refresh (only the page still on screen after the
//! delay gets refreshed), the debounced statistics save, and the CLI's idle
//! auto-reload. At most one action is pending at a time and a superseded
//! action never runs: `start` aborts the previous task at its sleep point.

use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A delayed action that can be replaced or cancelled before it fires.
#[derive(Default)]
pub struct Debouncer {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Create an idle debouncer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` to run after `delay`, replacing any pending action.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });

        let mut pending = self.pending.lock().expect("debouncer lock poisoned");
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    /// Cancel the pending action, if any, without running it.
    pub fn stop(&self) {
        let mut pending = self.pending.lock().expect("debouncer lock poisoned");
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.stop();
    }
}
