use std::sync::Arc;

use super::FirstEmission;
use crate::{live_data::LiveData, mediator::MediatorLiveData};

impl<T: Clone + Send + 'static> LiveData<T> {
  /// Emits `default_value` to a first observer that arrives before this
  /// holder ever had a value.
  ///
  /// ```rust
  /// use rxlive::prelude::*;
  ///
  /// let _instant = InstantTaskExecutor::install();
  /// let source = MutableLiveData::new();
  /// let observer = source.default_if_empty("loading").test();
  /// source.set_value("done");
  /// observer.assert_values(&["loading", "done"]);
  /// ```
  pub fn default_if_empty(&self, default_value: T) -> LiveData<T>
  where
    T: Sync,
  {
    self.default_if_empty_with(move || default_value.clone())
  }

  /// Like [`LiveData::default_if_empty`], producing the default lazily.
  /// `producer` is never called if the source had a value by the time the
  /// result was first observed.
  pub fn default_if_empty_with<F>(&self, producer: F) -> LiveData<T>
  where
    F: Fn() -> T + Send + Sync + 'static,
  {
    let first = Arc::new(FirstEmission::default());
    let result = MediatorLiveData::new();
    let c_first = first.clone();
    result.add_source(self, move |result: &MediatorLiveData<T>, x| {
      c_first.mark();
      result.set_value(x)
    });
    result.add_source(&LiveData::constant(()), move |result: &MediatorLiveData<T>, ()| {
      if !first.has_observed() {
        result.set_value(producer())
      }
    });
    result.into_live_data()
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  const DEFAULT: &str = "default value";

  #[rxlive_macro::test]
  fn observed_before_emitted() {
    let source = MutableLiveData::new();
    let observer = source.default_if_empty(DEFAULT).test();

    source.post_value("real value 1");
    source.post_value("real value 2");

    observer.assert_values(&[DEFAULT, "real value 1", "real value 2"]);
  }

  #[rxlive_macro::test]
  fn observed_after_emitted() {
    let source = MutableLiveData::new();
    let transformed = source.default_if_empty(DEFAULT);

    source.post_value("real value 1");
    let observer = transformed.test();
    source.post_value("real value 2");

    observer.assert_values(&["real value 1", "real value 2"]);
  }

  #[rxlive_macro::test]
  fn observed_after_none_emitted() {
    let source = MutableLiveData::new();
    let transformed = source.default_if_empty(Some(DEFAULT));

    source.post_value(None);
    let observer = transformed.test();
    source.post_value(Some("real value 2"));

    observer.assert_values(&[None, Some("real value 2")]);
  }

  #[rxlive_macro::test]
  fn applied_after_emitted() {
    let source = MutableLiveData::new();
    source.post_value("real value 1");

    let observer = source.default_if_empty(DEFAULT).test();
    source.post_value("real value 2");

    observer.assert_values(&["real value 1", "real value 2"]);
  }

  #[rxlive_macro::test]
  fn producer_observed_before_emitted() {
    let source = MutableLiveData::new();
    let observer = source.default_if_empty_with(|| DEFAULT.to_owned()).test();

    source.post_value("real value 1".to_owned());
    observer.assert_values(&[DEFAULT.to_owned(), "real value 1".to_owned()]);
  }

  #[rxlive_macro::test]
  fn producer_not_called_after_emitted() {
    let source = MutableLiveData::new();
    let transformed = source.default_if_empty_with(|| panic!("producer called"));

    source.post_value("real value 1");
    let observer = transformed.test();
    source.post_value("real value 2");

    observer.assert_values(&["real value 1", "real value 2"]);
  }

  #[rxlive_macro::test]
  fn producer_not_called_after_none_emitted() {
    let source = MutableLiveData::<Option<&str>>::new();
    let transformed = source.default_if_empty_with(|| panic!("producer called"));

    source.post_value(None);
    let observer = transformed.test();
    source.post_value(Some("real value 2"));

    observer.assert_values(&[None, Some("real value 2")]);
  }

  #[rxlive_macro::test]
  fn producer_not_called_when_applied_after_emitted() {
    let source = MutableLiveData::new();
    source.post_value("real value 1");

    let observer = source.default_if_empty_with(|| panic!("producer called")).test();
    source.post_value("real value 2");

    observer.assert_values(&["real value 1", "real value 2"]);
  }
}
