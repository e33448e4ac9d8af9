//! Virtual-time scheduler for deterministic tests of the time operators.
//!
//! Time only moves when the test says so. Every clone of a
//! [`TestScheduler`] shares one clock and one queue, so the scheduler handed
//! to an operator and the one the test advances are the same.
//!
//! ```rust
//! use rxlive::prelude::*;
//!
//! let _instant = InstantTaskExecutor::install();
//! let scheduler = TestScheduler::new();
//! let observer = LiveData::interval(Duration::from_millis(100), scheduler.clone()).test();
//!
//! scheduler.advance_by(Duration::from_millis(250));
//! observer.assert_values(&[0, 1]);
//! ```

use std::{cmp::Ordering, collections::BinaryHeap};

use tracing::trace;

use super::{Duration, Scheduler, TaskHandle};
use crate::rc::{MutArc, RcDeref, RcDerefMut};

#[derive(Default)]
struct TestSchedulerState {
  virtual_time: Duration,
  task_queue: BinaryHeap<ScheduledTask>,
  next_task_id: usize,
}

struct ScheduledTask {
  scheduled_time: Duration,
  task_id: usize,
  task: Box<dyn FnOnce() + Send>,
  handle: TaskHandle,
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool {
    self.scheduled_time == other.scheduled_time && self.task_id == other.task_id
  }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by task_id
    other
      .scheduled_time
      .cmp(&self.scheduled_time)
      .then_with(|| other.task_id.cmp(&self.task_id))
  }
}

/// A virtual time scheduler.
///
/// Tasks run synchronously on the thread that advances the clock, in order
/// of their due time and FIFO for equal due times.
#[derive(Clone, Default)]
pub struct TestScheduler {
  state: MutArc<TestSchedulerState>,
}

impl TestScheduler {
  /// A scheduler at virtual time zero with an empty queue.
  pub fn new() -> Self { Self::default() }

  /// The current virtual time.
  pub fn now(&self) -> Duration { self.state.rc_deref().virtual_time }

  /// Number of queued tasks, cancelled ones included.
  pub fn pending_count(&self) -> usize { self.state.rc_deref().task_queue.len() }

  pub fn is_empty(&self) -> bool { self.state.rc_deref().task_queue.is_empty() }

  fn execute_tasks_until(&self, target_time: Option<Duration>) {
    loop {
      let task = {
        let mut state = self.state.rc_deref_mut();
        let should_stop = state
          .task_queue
          .peek()
          .is_none_or(|peek| target_time.is_some_and(|limit| peek.scheduled_time > limit));
        if should_stop {
          None
        } else {
          let scheduled_task = state.task_queue.pop();
          if let Some(scheduled_task) = &scheduled_task {
            state.virtual_time = scheduled_task.scheduled_time;
          }
          scheduled_task
        }
      };

      let Some(scheduled_task) = task else {
        break;
      };
      if scheduled_task.handle.is_cancelled() {
        trace!(task_id = scheduled_task.task_id, "skipped cancelled virtual task");
        continue;
      }
      (scheduled_task.task)();
      scheduled_task.handle.mark_finished();
    }
  }

  /// Advances the clock by `duration`, running every task due up to the new
  /// time, including tasks scheduled by those tasks.
  pub fn advance_by(&self, duration: Duration) {
    let target_time = self.now() + duration;
    self.execute_tasks_until(Some(target_time));
    self.state.rc_deref_mut().virtual_time = target_time;
  }

  /// Runs the tasks due at the current time without moving the clock.
  pub fn run_pending(&self) { self.execute_tasks_until(Some(self.now())); }

  /// Runs every queued task, moving the clock to each task's due time.
  ///
  /// Never returns while a task keeps rescheduling itself, so do not flush
  /// an observed interval.
  pub fn flush(&self) { self.execute_tasks_until(None); }
}

impl Scheduler for TestScheduler {
  fn schedule<F>(&self, task: F, delay: Option<Duration>) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let handle = TaskHandle::new();
    let mut state = self.state.rc_deref_mut();
    let scheduled_time = state.virtual_time + delay.unwrap_or(Duration::ZERO);
    let task_id = state.next_task_id;
    state.next_task_id += 1;
    trace!(task_id, ?scheduled_time, "virtual task scheduled");
    state.task_queue.push(ScheduledTask {
      scheduled_time,
      task_id,
      task: Box::new(task),
      handle: handle.clone(),
    });
    handle
  }
}

impl std::fmt::Debug for TestScheduler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self.state.rc_deref();
    f.debug_struct("TestScheduler")
      .field("now", &state.virtual_time)
      .field("pending", &state.task_queue.len())
      .finish()
  }
}
