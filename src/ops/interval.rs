use std::sync::Arc;

use crate::{
  builder::{live_data, LiveDataScope},
  live_data::LiveData,
  scheduler::{Duration, Scheduler},
};

impl LiveData<usize> {
  /// Emits `0, 1, 2, ...`, waiting `period` before each value.
  ///
  /// The count starts over from zero when the holder is observed again
  /// after losing all of its observers.
  pub fn interval<S: Scheduler>(period: Duration, scheduler: S) -> LiveData<usize> {
    Self::interval_with(scheduler, move |_| period)
  }

  /// Emits `0, 1, 2, ...`, waiting `period(index)` before emitting `index`.
  pub fn interval_with<S, F>(scheduler: S, period: F) -> LiveData<usize>
  where
    S: Scheduler,
    F: Fn(usize) -> Duration + Send + Sync + 'static,
  {
    let period = Arc::new(period);
    live_data(scheduler, move |scope: LiveDataScope<usize, S>| {
      let period = period.clone();
      async move {
        for index in 0.. {
          scope.sleep(period(index)).await;
          scope.emit(index);
        }
      }
    })
  }
}
