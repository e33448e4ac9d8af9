//! Suspendable holder builder.
//!
//! [`live_data`] runs an async block whenever the returned holder is
//! observed. The block emits values through its [`LiveDataScope`] and
//! suspends on the scheduler between emissions:
//!
//! - it starts when the holder gains its first observer;
//! - it is cancelled when the holder loses its last observer before the
//!   block finished, and starts over on the next activation;
//! - once it ran to completion it is never run again.
//!
//! Blocks are polled on the delivery context. Wakeups come from the
//! scheduler, which runs its tasks there too.

use std::{
  future::Future,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, TryLockError,
  },
  task::{Context, Poll},
};

use futures::{
  future::BoxFuture,
  task::{waker, ArcWake},
  FutureExt,
};
use tracing::debug;

use crate::{
  live_data::{ActivityHook, LiveData},
  mediator::{MediatorLiveData, WeakMediator},
  rc::{lock, MutArc, RcDerefMut},
  scheduler::{sleep, Duration, Scheduler, Sleep},
};

type Block<T, S> = Arc<dyn Fn(LiveDataScope<T, S>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Builds a holder whose values come from an async block.
///
/// ```rust
/// use rxlive::prelude::*;
///
/// let _instant = InstantTaskExecutor::install();
/// let scheduler = TestScheduler::new();
/// let greeting = live_data(scheduler.clone(), |scope: LiveDataScope<&str, _>| async move {
///   scope.emit("hello");
///   scope.sleep(Duration::from_secs(1)).await;
///   scope.emit("world");
/// });
///
/// let observer = greeting.test();
/// observer.assert_value(&"hello");
/// scheduler.advance_by(Duration::from_secs(1));
/// observer.assert_values(&["hello", "world"]);
/// ```
pub fn live_data<T, S, F, Fut>(scheduler: S, block: F) -> LiveData<T>
where
  T: Clone + Send + 'static,
  S: Scheduler,
  F: Fn(LiveDataScope<T, S>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = ()> + Send + 'static,
{
  let mediator = MediatorLiveData::new();
  let runner = BlockRunner {
    block: Arc::new(move |scope| block(scope).boxed()),
    scheduler,
    target: mediator.downgrade(),
    emitted: MutArc::own(None),
    current: Mutex::new(None),
    completed: Arc::new(AtomicBool::new(false)),
  };
  mediator.add_activity_hook(Arc::new(runner));
  mediator.into_live_data()
}

/// Handle passed to a [`live_data`] block.
///
/// The scope keeps the holder alive for as long as the block runs.
pub struct LiveDataScope<T, S> {
  target: MediatorLiveData<T>,
  emitted: MutArc<Option<LiveData<T>>>,
  scheduler: S,
}

impl<T: Clone + Send + 'static, S: Scheduler> LiveDataScope<T, S> {
  /// Sets the holder's value. A source added by
  /// [`LiveDataScope::emit_source`] is removed first.
  pub fn emit(&self, value: T) {
    self.clear_source();
    self.target.set_value(value);
  }

  /// Republishes every value of `source` from now on, replacing a source
  /// emitted earlier.
  pub fn emit_source(&self, source: &LiveData<T>) {
    self.clear_source();
    self.target.add_source(source, |m: &MediatorLiveData<T>, v| m.set_value(v));
    *self.emitted.rc_deref_mut() = Some(source.clone());
  }

  /// The holder's current value.
  pub fn latest_value(&self) -> Option<T> { self.target.value() }

  /// Suspends the block for `duration` on the holder's scheduler.
  pub fn sleep(&self, duration: Duration) -> Sleep { sleep(&self.scheduler, duration) }

  pub fn scheduler(&self) -> &S { &self.scheduler }

  fn clear_source(&self) {
    let previous = self.emitted.rc_deref_mut().take();
    if let Some(previous) = previous {
      self.target.remove_source(&previous);
    }
  }
}

struct BlockRunner<T, S> {
  block: Block<T, S>,
  scheduler: S,
  target: WeakMediator<T>,
  emitted: MutArc<Option<LiveData<T>>>,
  current: Mutex<Option<Arc<BlockTask>>>,
  completed: Arc<AtomicBool>,
}

impl<T: Clone + Send + 'static, S: Scheduler> ActivityHook for BlockRunner<T, S> {
  fn on_active(&self) {
    if self.completed.load(Ordering::Acquire) {
      return;
    }
    let Some(target) = self.target.upgrade() else {
      return;
    };
    let task = {
      let mut current = lock(&self.current);
      if current.is_some() {
        return;
      }
      let scope =
        LiveDataScope { target, emitted: self.emitted.clone(), scheduler: self.scheduler.clone() };
      let task = Arc::new(BlockTask {
        future: Mutex::new(Some((self.block)(scope))),
        notified: AtomicBool::new(false),
        cancelled: AtomicBool::new(false),
        completed: self.completed.clone(),
      });
      *current = Some(task.clone());
      task
    };
    debug!("builder block started");
    task.drive();
  }

  fn on_inactive(&self) {
    let task = lock(&self.current).take();
    if let Some(task) = task {
      if !self.completed.load(Ordering::Acquire) {
        debug!("builder block cancelled");
      }
      task.cancel();
    }
  }
}

/// One run of a block.
struct BlockTask {
  future: Mutex<Option<BoxFuture<'static, ()>>>,
  notified: AtomicBool,
  cancelled: AtomicBool,
  completed: Arc<AtomicBool>,
}

impl BlockTask {
  /// Polls the block until it is pending without a new wakeup. A wakeup that
  /// arrives while another call is polling is picked up by that call.
  fn drive(self: &Arc<Self>) {
    self.notified.store(true, Ordering::SeqCst);
    loop {
      let Some(mut slot) = self.try_slot() else {
        return;
      };
      if !self.notified.swap(false, Ordering::SeqCst) {
        return;
      }
      if self.cancelled.load(Ordering::SeqCst) {
        *slot = None;
        return;
      }
      let Some(future) = slot.as_mut() else {
        return;
      };

      let task_waker = waker(self.clone());
      let mut cx = Context::from_waker(&task_waker);
      match future.as_mut().poll(&mut cx) {
        Poll::Ready(()) => {
          *slot = None;
          self.completed.store(true, Ordering::Release);
          debug!("builder block completed");
          return;
        }
        Poll::Pending if self.cancelled.load(Ordering::SeqCst) => {
          *slot = None;
          return;
        }
        Poll::Pending => {}
      }
    }
  }

  fn cancel(&self) {
    self.cancelled.store(true, Ordering::SeqCst);
    // Fails only while the block is being polled; the poller drops it.
    if let Some(mut slot) = self.try_slot() {
      *slot = None;
    }
  }

  fn try_slot(&self) -> Option<MutexGuard<'_, Option<BoxFuture<'static, ()>>>> {
    match self.future.try_lock() {
      Ok(slot) => Some(slot),
      Err(TryLockError::Poisoned(poison)) => Some(poison.into_inner()),
      Err(TryLockError::WouldBlock) => None,
    }
  }
}

impl ArcWake for BlockTask {
  fn wake_by_ref(arc_self: &Arc<Self>) { arc_self.drive() }
}
