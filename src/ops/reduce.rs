use std::sync::Arc;

use super::FirstEmission;
use crate::{live_data::LiveData, mediator::MediatorLiveData};

impl<T: Clone + Send + 'static> LiveData<T> {
  /// Folds every value into an accumulator and republishes it.
  ///
  /// The first value passes through unchanged and seeds the accumulator.
  /// Every later value `x` republishes `operation(accumulator, x)`.
  ///
  /// ```rust
  /// use rxlive::prelude::*;
  ///
  /// let _instant = InstantTaskExecutor::install();
  /// let source = MutableLiveData::new();
  /// let sums = source.reduce(|a: u32, b| a + b).test();
  /// for v in 1..=4 {
  ///   source.set_value(v);
  /// }
  /// sums.assert_values(&[1, 3, 6, 10]);
  /// ```
  pub fn reduce<F>(&self, operation: F) -> LiveData<T>
  where
    F: Fn(T, T) -> T + Send + Sync + 'static,
  {
    let first = Arc::new(FirstEmission::default());
    let result = MediatorLiveData::new();
    result.add_source(self, move |result: &MediatorLiveData<T>, x| {
      if first.mark() {
        return result.set_value(x);
      }
      let next = match result.value() {
        Some(acc) => operation(acc, x),
        None => x,
      };
      result.set_value(next)
    });
    result.into_live_data()
  }
}

impl<T: Clone + Send + 'static> LiveData<Option<T>> {
  /// Like [`LiveData::reduce`], skipping `None` values.
  pub fn reduce_not_null<F>(&self, operation: F) -> LiveData<T>
  where
    F: Fn(T, T) -> T + Send + Sync + 'static,
  {
    let result = MediatorLiveData::new();
    result.add_source(self, move |result: &MediatorLiveData<T>, x: Option<T>| {
      let Some(x) = x else {
        return;
      };
      let next = match result.value() {
        Some(acc) => operation(acc, x),
        None => x,
      };
      result.set_value(next)
    });
    result.into_live_data()
  }
}
