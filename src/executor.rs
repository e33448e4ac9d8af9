//! The delivery context.
//!
//! Every observer callback and every operator runs on one sequential "main"
//! context. Which thread that is, and how work posted from other threads gets
//! there, is decided by the active [`TaskExecutor`]:
//!
//! - the process-wide default is the [`MainLoop`], drained explicitly by the
//!   thread that attached itself as main;
//! - [`set_default`] swaps the process-wide executor;
//! - [`set_thread_executor`] overrides it for the calling thread only, which
//!   is how `InstantTaskExecutor` makes tests synchronous without leaking into
//!   tests running in parallel on other threads.

use std::{
  cell::RefCell,
  collections::VecDeque,
  fmt::{Debug, Formatter},
  sync::{Arc, Mutex, RwLock},
  thread::{self, ThreadId},
};

use once_cell::sync::Lazy;
use tracing::{debug, trace};

use crate::{error::LiveDataError, rc::lock};

/// Unit of work handed to the delivery context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Decides which thread is the delivery context and how to get work onto it.
pub trait TaskExecutor: Send + Sync {
  /// Queues `task` to run on the delivery context.
  fn post_to_main_thread(&self, task: Task);

  /// Whether the calling thread is the delivery context.
  fn is_main_thread(&self) -> bool;
}

static DEFAULT_EXECUTOR: Lazy<RwLock<Arc<dyn TaskExecutor>>> =
  Lazy::new(|| RwLock::new(MainLoop::global().clone()));

thread_local! {
  static THREAD_EXECUTOR: RefCell<Option<Arc<dyn TaskExecutor>>> = const { RefCell::new(None) };
}

/// Returns the executor in effect for the calling thread.
pub fn current() -> Arc<dyn TaskExecutor> {
  THREAD_EXECUTOR.with(|local| local.borrow().clone()).unwrap_or_else(|| {
    DEFAULT_EXECUTOR.read().unwrap_or_else(|poison| poison.into_inner()).clone()
  })
}

/// Replaces the process-wide executor and returns the previous one.
pub fn set_default(executor: Arc<dyn TaskExecutor>) -> Arc<dyn TaskExecutor> {
  debug!("replacing the process-wide task executor");
  let mut slot = DEFAULT_EXECUTOR.write().unwrap_or_else(|poison| poison.into_inner());
  std::mem::replace(&mut *slot, executor)
}

/// Overrides the executor for the calling thread until the returned guard is
/// dropped, at which point the previous override (if any) is restored.
pub fn set_thread_executor(executor: Arc<dyn TaskExecutor>) -> ThreadExecutorGuard {
  let previous = THREAD_EXECUTOR.with(|local| local.borrow_mut().replace(executor));
  trace!(nested = previous.is_some(), "installed thread executor override");
  ThreadExecutorGuard { previous }
}

/// Restores the previous thread executor when dropped.
#[must_use = "the override is removed as soon as the guard is dropped"]
pub struct ThreadExecutorGuard {
  previous: Option<Arc<dyn TaskExecutor>>,
}

impl Drop for ThreadExecutorGuard {
  fn drop(&mut self) {
    let previous = self.previous.take();
    THREAD_EXECUTOR.with(|local| *local.borrow_mut() = previous);
  }
}

impl Debug for ThreadExecutorGuard {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ThreadExecutorGuard").field("nested", &self.previous.is_some()).finish()
  }
}

/// Posts `task` to the delivery context through the current executor.
#[inline]
pub fn post_to_main_thread(task: Task) { current().post_to_main_thread(task) }

#[inline]
pub fn is_main_thread() -> bool { current().is_main_thread() }

pub(crate) fn ensure_main_thread(method: &'static str) -> Result<(), LiveDataError> {
  if is_main_thread() {
    Ok(())
  } else {
    Err(LiveDataError::NotOnMainThread { method })
  }
}

pub(crate) fn assert_main_thread(method: &'static str) {
  if let Err(err) = ensure_main_thread(method) {
    panic!("{err}");
  }
}

// ==================== MainLoop ====================

/// Default executor: a queue of posted tasks owned by whichever thread
/// attached itself as main.
///
/// ```rust
/// use rxlive::executor::{MainLoop, TaskExecutor};
///
/// let main_loop = MainLoop::new();
/// main_loop.attach_current_thread();
/// main_loop.post_to_main_thread(Box::new(|| println!("on main")));
/// assert_eq!(main_loop.run_pending(), 1);
/// ```
#[derive(Default)]
pub struct MainLoop {
  main_thread: Mutex<Option<ThreadId>>,
  queue: Mutex<VecDeque<Task>>,
}

static MAIN_LOOP: Lazy<Arc<MainLoop>> = Lazy::new(|| Arc::new(MainLoop::new()));

impl MainLoop {
  pub fn new() -> Self { Self::default() }

  /// The loop installed as the process-wide default executor.
  pub fn global() -> &'static Arc<MainLoop> { &MAIN_LOOP }

  /// Makes the calling thread the delivery context of this loop.
  pub fn attach_current_thread(&self) {
    let id = thread::current().id();
    let previous = lock(&self.main_thread).replace(id);
    if previous.is_some_and(|previous| previous != id) {
      debug!(?previous, current = ?id, "main loop moved to another thread");
    }
  }

  /// Number of posted tasks not yet run.
  pub fn pending_count(&self) -> usize { lock(&self.queue).len() }

  /// Runs posted tasks until the queue is empty, including tasks posted by
  /// the tasks themselves. Returns how many ran.
  ///
  /// # Panics
  ///
  /// Panics when called from a thread other than the attached main thread.
  pub fn run_pending(&self) -> usize {
    if !self.is_main_thread() {
      panic!("{}", LiveDataError::NotOnMainThread { method: "run_pending" });
    }
    let mut ran = 0;
    loop {
      let Some(task) = lock(&self.queue).pop_front() else {
        break;
      };
      task();
      ran += 1;
    }
    trace!(ran, "main loop drained");
    ran
  }
}

impl TaskExecutor for MainLoop {
  fn post_to_main_thread(&self, task: Task) { lock(&self.queue).push_back(task); }

  fn is_main_thread(&self) -> bool { *lock(&self.main_thread) == Some(thread::current().id()) }
}

impl Debug for MainLoop {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MainLoop")
      .field("main_thread", &*lock(&self.main_thread))
      .field("pending", &self.pending_count())
      .finish()
  }
}
