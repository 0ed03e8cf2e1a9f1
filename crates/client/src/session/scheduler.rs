// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-slot cancellable delayed task.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle to one scheduled task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    cancel: CancellationToken,
    fired: Arc<AtomicBool>,
    /// Cancelled once the spawned task has finished, fired or not.
    done: CancellationToken,
    deadline: Instant,
}

impl TaskHandle {
    /// Cancel the task if it has not fired yet. A task that already fired
    /// runs to completion.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Still waiting for its delay to elapse.
    pub fn is_pending(&self) -> bool {
        !self.cancel.is_cancelled() && !self.fired.load(Ordering::Acquire)
    }

    /// Delay has elapsed (or is about to fire) and the task was not cancelled.
    pub fn is_due(&self) -> bool {
        !self.cancel.is_cancelled() && self.deadline <= Instant::now()
    }

    /// Wait until the task has run to completion or was cancelled.
    pub async fn finished(&self) {
        self.done.cancelled().await;
    }
}

/// Holds at most one pending task: scheduling replaces the previous one.
#[derive(Debug, Default)]
pub struct Scheduler {
    pending: Mutex<Option<TaskHandle>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay`, cancelling any previously scheduled task.
    ///
    /// Returns `None` when called outside a tokio runtime; nothing is
    /// scheduled in that case.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> Option<TaskHandle>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                debug!("no async runtime, task not scheduled");
                self.cancel();
                return None;
            }
        };

        let handle = TaskHandle {
            cancel: CancellationToken::new(),
            fired: Arc::new(AtomicBool::new(false)),
            done: CancellationToken::new(),
            deadline: Instant::now() + delay,
        };
        // Install before spawning: a zero-delay task may reschedule itself
        // before `spawn` returns.
        if let Some(previous) = self.pending.lock().replace(handle.clone()) {
            previous.cancel();
        }

        let cancel = handle.cancel.clone();
        let fired = Arc::clone(&handle.fired);
        let done = handle.done.clone().drop_guard();
        runtime.spawn(async move {
            let _done = done;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    fired.store(true, Ordering::Release);
                    task.await;
                }
            }
        });
        Some(handle)
    }

    /// Cancel the pending task, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.lock().as_ref().is_some_and(TaskHandle::is_pending)
    }

    /// Wait for the pending task if its delay has already elapsed. A task
    /// that is still waiting for its delay is left alone.
    pub async fn wait_due(&self) {
        let due = self.pending.lock().clone().filter(TaskHandle::is_due);
        if let Some(handle) = due {
            handle.finished().await;
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
