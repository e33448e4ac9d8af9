use std::sync::Arc;

use crate::executor::{self, Task, TaskExecutor, ThreadExecutorGuard};

/// Executor that treats the calling thread as the delivery context and runs
/// every posted task immediately.
///
/// Installed per thread, so tests running in parallel do not see each
/// other's executor. A task posted from a helper thread (a timer, say) runs
/// on that helper thread with the instant executor installed for the
/// duration of the task.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantTaskExecutor;

impl InstantTaskExecutor {
  /// Installs the executor for the calling thread until the guard drops.
  ///
  /// `#[rxlive::test]` does this for every test it wraps.
  pub fn install() -> ThreadExecutorGuard {
    executor::set_thread_executor(Arc::new(InstantTaskExecutor))
  }
}

impl TaskExecutor for InstantTaskExecutor {
  fn post_to_main_thread(&self, task: Task) {
    let _guard = InstantTaskExecutor::install();
    task()
  }

  #[inline]
  fn is_main_thread(&self) -> bool { true }
}
