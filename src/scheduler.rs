//! Scheduling adapter for the time-based operators.
//!
//! A [`Scheduler`] runs a task after an optional delay. Real-time
//! schedulers ([`ThreadScheduler`], [`TokioScheduler`]) wait on another
//! thread and hand the task to the delivery context; the virtual-time
//! [`TestScheduler`] only runs tasks when told to advance.
//!
//! [`sleep`] turns a scheduled no-op into a future, which is what the
//! suspendable builder awaits between emissions.

use std::{
  fmt::{Debug, Formatter},
  future::Future,
  pin::Pin,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
  },
  task::{Context, Poll, Waker},
};

pub use std::time::Duration;

use tracing::trace;

use crate::{rc::lock, subscription::SubscriptionLike};

mod test_scheduler;
#[cfg(feature = "thread-scheduler")]
mod thread_scheduler;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;

pub use test_scheduler::TestScheduler;
#[cfg(feature = "thread-scheduler")]
pub use thread_scheduler::ThreadScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;

/// Orders tasks in time.
///
/// Implementations are cheap handles: operators clone the scheduler into
/// every holder they build.
pub trait Scheduler: Clone + Send + Sync + 'static {
  /// Runs `task` once `delay` has elapsed (immediately for `None`). The
  /// returned handle cancels the task if it has not started yet.
  fn schedule<F>(&self, task: F, delay: Option<Duration>) -> TaskHandle
  where
    F: FnOnce() + Send + 'static;
}

// ==================== TaskHandle ====================

struct HandleState {
  cancelled: AtomicBool,
  finished: AtomicBool,
  waker: Mutex<Option<Waker>>,
}

/// Handle to a scheduled task.
///
/// Unsubscribing cancels the task if it has not run yet. Awaiting the handle
/// completes once the task ran or was cancelled.
#[derive(Clone)]
pub struct TaskHandle {
  // `None` for tasks that were already done when the handle was created.
  inner: Option<Arc<HandleState>>,
}

impl TaskHandle {
  /// A handle for a task that already ran.
  pub fn finished() -> Self { Self { inner: None } }

  /// A handle for a task a scheduler is about to queue.
  pub fn new() -> Self {
    Self {
      inner: Some(Arc::new(HandleState {
        cancelled: AtomicBool::new(false),
        finished: AtomicBool::new(false),
        waker: Mutex::new(None),
      })),
    }
  }

  /// Called by schedulers once the task ran (or was skipped).
  pub fn mark_finished(&self) {
    if let Some(state) = &self.inner {
      state.finished.store(true, Ordering::Release);
      let waker = lock(&state.waker).take();
      if let Some(waker) = waker {
        waker.wake();
      }
    }
  }

  pub fn is_finished(&self) -> bool {
    self.inner.as_ref().is_none_or(|state| state.finished.load(Ordering::Acquire))
  }

  pub fn is_cancelled(&self) -> bool {
    self.inner.as_ref().is_some_and(|state| state.cancelled.load(Ordering::Acquire))
  }
}

impl Default for TaskHandle {
  fn default() -> Self { Self::new() }
}

impl SubscriptionLike for TaskHandle {
  fn unsubscribe(&mut self) {
    if let Some(state) = &self.inner {
      if !state.cancelled.swap(true, Ordering::AcqRel) {
        trace!("scheduled task cancelled");
      }
      let waker = lock(&state.waker).take();
      if let Some(waker) = waker {
        waker.wake();
      }
    }
  }

  fn is_closed(&self) -> bool { self.is_finished() || self.is_cancelled() }
}

impl Future for TaskHandle {
  type Output = ();

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
    let Some(state) = &self.inner else {
      return Poll::Ready(());
    };
    let mut waker = lock(&state.waker);
    if state.finished.load(Ordering::Acquire) || state.cancelled.load(Ordering::Acquire) {
      Poll::Ready(())
    } else {
      *waker = Some(cx.waker().clone());
      Poll::Pending
    }
  }
}

impl Debug for TaskHandle {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TaskHandle")
      .field("finished", &self.is_finished())
      .field("cancelled", &self.is_cancelled())
      .finish()
  }
}

// ==================== sleep ====================

/// Future returned by [`sleep`].
///
/// Dropping it before it completes cancels the underlying task.
#[must_use = "futures do nothing unless polled"]
#[derive(Debug)]
pub struct Sleep {
  handle: TaskHandle,
}

/// Completes after `duration` has elapsed on `scheduler`.
///
/// The timer starts right away, not on the first poll. A zero duration
/// completes immediately without touching the scheduler.
pub fn sleep<S: Scheduler>(scheduler: &S, duration: Duration) -> Sleep {
  if duration.is_zero() {
    return Sleep { handle: TaskHandle::finished() };
  }
  Sleep { handle: scheduler.schedule(|| {}, Some(duration)) }
}

impl Future for Sleep {
  type Output = ();

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
    Pin::new(&mut self.handle).poll(cx)
  }
}

impl Drop for Sleep {
  fn drop(&mut self) {
    if !self.handle.is_closed() {
      self.handle.unsubscribe();
    }
  }
}
