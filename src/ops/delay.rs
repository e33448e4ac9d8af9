use crate::{
  builder::{live_data, LiveDataScope},
  live_data::LiveData,
  scheduler::{Duration, Scheduler},
};

impl<T: Clone + Send + 'static> LiveData<T> {
  /// Starts forwarding this holder `duration` after the result is first
  /// observed.
  ///
  /// Once the delay elapsed the value the source holds at that moment is
  /// forwarded, followed by every later value. Values replaced during the
  /// delay are never seen.
  pub fn delay_start<S: Scheduler>(&self, duration: Duration, scheduler: S) -> LiveData<T> {
    let source = self.clone();
    live_data(scheduler, move |scope: LiveDataScope<T, S>| {
      let source = source.clone();
      async move {
        scope.sleep(duration).await;
        scope.emit_source(&source);
      }
    })
  }
}
