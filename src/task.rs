//! Detached background work with an observable outcome.

use std::io;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::errors::WatchError;

/// Handle to work running on its own named thread.
///
/// The outcome is logged when the work finishes. Dropping the handle detaches
/// the thread; the log line is still emitted.
#[derive(Debug)]
pub struct DetachedTask<T> {
    label: String,
    handle: JoinHandle<Result<T, WatchError>>,
}

/// Start `work` on a named thread.
pub fn spawn_detached<T, F>(label: impl Into<String>, work: F) -> io::Result<DetachedTask<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, WatchError> + Send + 'static,
{
    let label = label.into();
    let thread_label = label.clone();
    let handle = thread::Builder::new()
        .name(format!("license-watch-{label}"))
        .spawn(move || {
            let outcome = work();
            match &outcome {
                Ok(_) => info!("[license-watch:task] {thread_label} finished"),
                Err(err) => warn!("[license-watch:task] {thread_label} failed: {err}"),
            }
            outcome
        })?;
    Ok(DetachedTask { label, handle })
}

impl<T> DetachedTask<T> {
    /// Thread name given at spawn.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// True once the closure has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the work completes and return its outcome.
    pub fn wait(self) -> Result<T, WatchError> {
        self.handle.join().unwrap_or_else(|_| {
            Err(WatchError::Io(io::Error::other(format!(
                "background task '{}' panicked",
                self.label
            ))))
        })
    }
}
