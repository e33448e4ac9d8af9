use crate::{
  builder::{live_data, LiveDataScope},
  live_data::LiveData,
  scheduler::{Duration, Scheduler},
};

impl<T: Clone + Send + Sync + 'static> LiveData<T> {
  /// Emits a value only once `timeout` passed without a newer one.
  ///
  /// Every source value restarts the timeout; a value replaced before its
  /// timeout elapsed is dropped.
  ///
  /// ```rust
  /// use rxlive::prelude::*;
  ///
  /// let _instant = InstantTaskExecutor::install();
  /// let scheduler = TestScheduler::new();
  /// let query = MutableLiveData::new();
  /// let settled = query
  ///   .throttle_with_timeout(Duration::from_millis(300), scheduler.clone())
  ///   .test();
  ///
  /// query.set_value("r");
  /// scheduler.advance_by(Duration::from_millis(100));
  /// query.set_value("rust");
  /// scheduler.advance_by(Duration::from_millis(300));
  /// settled.assert_values(&["rust"]);
  /// ```
  pub fn throttle_with_timeout<S: Scheduler>(
    &self, timeout: Duration, scheduler: S,
  ) -> LiveData<T> {
    self.switch_map(move |value: T| {
      live_data(scheduler.clone(), move |scope: LiveDataScope<T, S>| {
        let value = value.clone();
        async move {
          scope.sleep(timeout).await;
          scope.emit(value);
        }
      })
    })
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[rxlive_macro::test]
  fn throttle_with_timeout(scheduler: TestScheduler) {
    let source = MutableLiveData::new();
    let observer = source.throttle_with_timeout(Duration::from_secs(9), scheduler.clone()).test();

    let steps = [(1, 8), (2, 8), (3, 8), (4, 10), (5, 10), (6, 8), (7, 10)];
    for (value, advance) in steps {
      source.post_value(value);
      scheduler.advance_by(Duration::from_secs(advance));
    }

    observer.assert_values(&[4, 5, 7]);
  }

  #[rxlive_macro::test]
  fn superseded_timeouts_are_cancelled(scheduler: TestScheduler) {
    let source = MutableLiveData::new();
    let observer = source.throttle_with_timeout(Duration::from_secs(1), scheduler.clone()).test();

    source.set_value(1);
    source.set_value(2);
    source.set_value(3);
    scheduler.flush();
    observer.assert_values(&[3]);
    assert_eq!(scheduler.now(), Duration::from_secs(1));
  }

  #[rxlive_macro::test]
  fn unobserved_result_drops_its_pending_value(scheduler: TestScheduler) {
    let source = MutableLiveData::new();
    let throttled = source.throttle_with_timeout(Duration::from_secs(1), scheduler.clone());

    let guard = throttled.observe(|_: i32| {});
    source.set_value(1);
    drop(guard);
    scheduler.advance_by(Duration::from_secs(1));
    assert_eq!(throttled.value(), None);
  }
}
