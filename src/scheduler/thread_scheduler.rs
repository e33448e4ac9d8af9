use std::thread;

use tracing::{error, trace};

use super::{Duration, Scheduler, TaskHandle};
use crate::{executor, subscription::SubscriptionLike};

/// Real-time scheduler that waits on a fresh helper thread per task.
///
/// The task itself does not run on the helper thread: once the delay is
/// over it is posted to the executor that was current when the task was
/// scheduled, so it runs on the delivery context like every other callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
  fn schedule<F>(&self, task: F, delay: Option<Duration>) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let handle = TaskHandle::new();
    let task_handle = handle.clone();
    let target = executor::current();

    let spawned = thread::Builder::new().name("rxlive-timer".into()).spawn(move || {
      if let Some(delay) = delay {
        thread::sleep(delay);
      }
      if task_handle.is_cancelled() {
        trace!("timer elapsed after cancellation");
        return;
      }
      target.post_to_main_thread(Box::new(move || {
        if !task_handle.is_cancelled() {
          task();
        }
        task_handle.mark_finished();
      }));
    });

    if let Err(err) = spawned {
      error!(%err, "failed to spawn timer thread");
      let mut dropped = handle.clone();
      dropped.unsubscribe();
    }
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;
  use crate::executor::MainLoop;

  fn wait_for(main_loop: &MainLoop, done: impl Fn() -> bool) {
    for _ in 0..200 {
      main_loop.run_pending();
      if done() {
        return;
      }
      thread::sleep(Duration::from_millis(5));
    }
    panic!("timed out waiting for the timer thread");
  }

  #[test]
  fn runs_task_on_the_delivery_context() {
    let main_loop = Arc::new(MainLoop::new());
    main_loop.attach_current_thread();
    let _guard = executor::set_thread_executor(main_loop.clone());

    let ran_on = Arc::new(std::sync::Mutex::new(None));
    let c_ran_on = ran_on.clone();
    let handle = ThreadScheduler.schedule(
      move || *c_ran_on.lock().unwrap() = Some(thread::current().id()),
      Some(Duration::from_millis(10)),
    );

    wait_for(&main_loop, || handle.is_finished());
    assert_eq!(*ran_on.lock().unwrap(), Some(thread::current().id()));
  }

  #[test]
  fn cancelled_task_is_skipped() {
    let main_loop = Arc::new(MainLoop::new());
    main_loop.attach_current_thread();
    let _guard = executor::set_thread_executor(main_loop.clone());

    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    let mut cancelled = ThreadScheduler.schedule(
      move || {
        c_hits.fetch_add(1, Ordering::SeqCst);
      },
      Some(Duration::from_millis(20)),
    );
    cancelled.unsubscribe();

    let marker = ThreadScheduler.schedule(|| {}, Some(Duration::from_millis(40)));
    wait_for(&main_loop, || marker.is_finished());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
  }
}
