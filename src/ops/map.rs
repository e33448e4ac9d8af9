use crate::{live_data::LiveData, mediator::MediatorLiveData};

impl<T: Clone + Send + 'static> LiveData<T> {
  /// Applies `transform` to every value.
  pub fn map<R, F>(&self, transform: F) -> LiveData<R>
  where
    R: Clone + Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
  {
    let result = MediatorLiveData::new();
    result.add_source(self, move |result: &MediatorLiveData<R>, x| result.set_value(transform(x)));
    result.into_live_data()
  }

  /// Applies `transform` to every value and republishes only `Some`
  /// results. A `None` result leaves the current value untouched.
  ///
  /// ```rust
  /// use rxlive::prelude::*;
  ///
  /// let _instant = InstantTaskExecutor::install();
  /// let input = MutableLiveData::new();
  /// let parsed = input.map_not_null(|s: &str| s.parse::<i32>().ok()).test();
  /// input.set_value("1");
  /// input.set_value("one");
  /// input.set_value("2");
  /// parsed.assert_values(&[1, 2]);
  /// ```
  pub fn map_not_null<R, F>(&self, transform: F) -> LiveData<R>
  where
    R: Clone + Send + 'static,
    F: Fn(T) -> Option<R> + Send + Sync + 'static,
  {
    let result = MediatorLiveData::new();
    result.add_source(self, move |result: &MediatorLiveData<R>, x| {
      if let Some(y) = transform(x) {
        result.set_value(y)
      }
    });
    result.into_live_data()
  }
}

#[cfg(test)]
mod test {
  use float_cmp::approx_eq;

  use crate::prelude::*;

  #[rxlive_macro::test]
  fn map_every_value() {
    let source = MutableLiveData::new();
    let observer = source.map(|v: i32| v * 2).test();

    source.post_value(1);
    source.post_value(2);
    observer.assert_values(&[2, 4]);
  }

  #[rxlive_macro::test]
  fn map_to_other_type() {
    let celsius = MutableLiveData::with_value(100.);
    let fahrenheit = celsius.map(|c: f64| c * 1.8 + 32.);
    let observer = fahrenheit.test();

    celsius.set_value(-40.);
    let values = observer.values();
    assert_eq!(values.len(), 2);
    assert!(approx_eq!(f64, values[0], 212.));
    assert!(approx_eq!(f64, values[1], -40.));
  }

  #[rxlive_macro::test]
  fn map_not_null_skips_absent_results() {
    let source = MutableLiveData::<Option<i32>>::new();
    let observer = source.map_not_null(|x| x.map(|v| v.to_string())).test();

    source.post_value(Some(1));
    source.post_value(None);
    source.post_value(Some(2));
    source.post_value(None);
    source.post_value(Some(3));

    observer.assert_values(&["1".to_owned(), "2".to_owned(), "3".to_owned()]);
  }

  #[rxlive_macro::test]
  fn chained_operators_stay_alive_while_observed() {
    let source = MutableLiveData::new();
    let observer = source.map(|v: i32| v + 1).map(|v| v * 10).test();
    source.set_value(1);
    observer.assert_value(&20);
  }

  #[test]
  fn bench() { do_bench(); }

  bencher::benchmark_group!(do_bench, bench_map);

  fn bench_map(b: &mut bencher::Bencher) {
    let _instant = InstantTaskExecutor::install();
    let source = MutableLiveData::new();
    let _guard = source.map(|v: usize| v * 2).observe(|_: usize| {});
    let mut i = 0;
    b.iter(|| {
      i += 1;
      source.set_value(i)
    });
  }
}
