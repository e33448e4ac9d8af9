use tokio::runtime::Handle;
use tracing::trace;

use super::{Duration, Scheduler, TaskHandle};
use crate::executor;

/// Real-time scheduler backed by a tokio runtime.
///
/// Timers run on the runtime; the task is posted to the executor that was
/// current when it was scheduled.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
  handle: Handle,
}

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { Self { handle } }

  /// Uses the runtime the caller is running on.
  ///
  /// # Panics
  ///
  /// Panics when called outside of a tokio runtime.
  pub fn current() -> Self { Self::new(Handle::current()) }
}

impl Scheduler for TokioScheduler {
  fn schedule<F>(&self, task: F, delay: Option<Duration>) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let handle = TaskHandle::new();
    let task_handle = handle.clone();
    let target = executor::current();
    self.handle.spawn(async move {
      if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
      }
      if task_handle.is_cancelled() {
        trace!("tokio timer elapsed after cancellation");
        return;
      }
      target.post_to_main_thread(Box::new(move || {
        if !task_handle.is_cancelled() {
          task();
        }
        task_handle.mark_finished();
      }));
    });
    handle
  }
}
