//! Cancellable one-shot task scheduler.
//!
//! 可取消的一次性定时任务调度器。轮询、重试和保存重试都通过它挂载，
//! 关闭时先在同一把锁下置位取消标记，再等待所有在途任务结束。

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// Arms delayed tasks and tears them all down on shutdown.
///
/// A task is a sleep followed by a future. Cancellation interrupts the
/// sleep; a task whose future has already started runs to completion and
/// `shutdown` waits for it.
pub struct TaskScheduler {
    /// Guards the cancelled flag; tasks are only armed while holding it.
    cancelled: Mutex<bool>,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self {
            cancelled: Mutex::new(false),
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Run `task` after `delay`.
    ///
    /// Returns `false` without spawning anything once shutdown has begun.
    pub fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> bool {
        let cancelled = self.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        if *cancelled {
            debug!(delay_ms = delay.as_millis() as u64, "scheduler shut down; task dropped");
            return false;
        }

        let token = self.token.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("scheduled task cancelled before firing");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            task.await;
        });
        true
    }

    pub fn is_shut_down(&self) -> bool {
        *self.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of tasks armed or running.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Cancel every armed task and wait until running ones finish.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        {
            let mut cancelled = self.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
            *cancelled = true;
            self.token.cancel();
            self.tracker.close();
        }
        self.tracker.wait().await;
        debug!("scheduler drained");
    }
}
