use std::{any::Any, sync::Arc};

use crate::{live_data::LiveData, mediator::MediatorLiveData};

/// A dynamically typed value, as accepted by
/// [`LiveData::filter_is_instance`].
pub type AnyValue = Arc<dyn Any + Send + Sync>;

impl<T: Clone + Send + 'static> LiveData<T> {
  /// Republishes only the values that satisfy `predicate`.
  pub fn filter<F>(&self, predicate: F) -> LiveData<T>
  where
    F: Fn(&T) -> bool + Send + Sync + 'static,
  {
    let result = MediatorLiveData::new();
    result.add_source(self, move |result: &MediatorLiveData<T>, x| {
      if predicate(&x) {
        result.set_value(x)
      }
    });
    result.into_live_data()
  }
}

impl<T: Clone + Send + 'static> LiveData<Option<T>> {
  /// Drops `None` values and unwraps the rest.
  pub fn filter_not_null(&self) -> LiveData<T> {
    let result = MediatorLiveData::new();
    result.add_source(self, |result: &MediatorLiveData<T>, x: Option<T>| {
      if let Some(x) = x {
        result.set_value(x)
      }
    });
    result.into_live_data()
  }
}

impl LiveData<AnyValue> {
  /// Republishes only the values whose concrete type is `R`.
  ///
  /// ```rust
  /// use std::sync::Arc;
  ///
  /// use rxlive::prelude::*;
  ///
  /// let _instant = InstantTaskExecutor::install();
  /// let source = MutableLiveData::<AnyValue>::new();
  /// let numbers = source.filter_is_instance::<i32>().test();
  /// source.set_value(Arc::new(1));
  /// source.set_value(Arc::new("text"));
  /// numbers.assert_values(&[Arc::new(1)]);
  /// ```
  pub fn filter_is_instance<R>(&self) -> LiveData<Arc<R>>
  where
    R: Any + Send + Sync,
  {
    let result = MediatorLiveData::new();
    result.add_source(self, |result: &MediatorLiveData<Arc<R>>, x: AnyValue| {
      if let Ok(x) = x.downcast::<R>() {
        result.set_value(x)
      }
    });
    result.into_live_data()
  }
}
