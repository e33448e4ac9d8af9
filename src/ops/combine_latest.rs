//! Latest-value combination of several holders.
//!
//! Every source update produces one emission built from the latest value of
//! each source. Sources that did not emit yet show up as `None`.

use std::sync::Arc;

use crate::{live_data::LiveData, mediator::MediatorLiveData};

impl<A: Clone + Send + 'static> LiveData<A> {
  /// Pairs the latest values of `self` and `other`.
  ///
  /// ```rust
  /// use rxlive::prelude::*;
  ///
  /// let _instant = InstantTaskExecutor::install();
  /// let name = MutableLiveData::new();
  /// let age = MutableLiveData::new();
  /// let observer = name.combine_latest(&age).test();
  /// name.set_value("Ada");
  /// age.set_value(36);
  /// observer.assert_values(&[(Some("Ada"), None), (Some("Ada"), Some(36))]);
  /// ```
  pub fn combine_latest<B>(&self, other: &LiveData<B>) -> LiveData<(Option<A>, Option<B>)>
  where
    B: Clone + Send + 'static,
  {
    let result = MediatorLiveData::new();
    result.add_source(self, |result: &MediatorLiveData<(Option<A>, Option<B>)>, a| {
      let b = result.value().and_then(|(_, b)| b);
      result.set_value((Some(a), b))
    });
    result.add_source(other, |result: &MediatorLiveData<(Option<A>, Option<B>)>, b| {
      let a = result.value().and_then(|(a, _)| a);
      result.set_value((a, Some(b)))
    });
    result.into_live_data()
  }

  /// Triples of the latest values of `self`, `second` and `third`.
  #[allow(clippy::type_complexity)]
  pub fn combine_latest3<B, C>(
    &self, second: &LiveData<B>, third: &LiveData<C>,
  ) -> LiveData<(Option<A>, Option<B>, Option<C>)>
  where
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
  {
    let result = MediatorLiveData::new();
    result.add_source(self, |result: &MediatorLiveData<(Option<A>, Option<B>, Option<C>)>, a| {
      let (_, b, c) = result.value().unwrap_or((None, None, None));
      result.set_value((Some(a), b, c))
    });
    result.add_source(second, |result: &MediatorLiveData<(Option<A>, Option<B>, Option<C>)>, b| {
      let (a, _, c) = result.value().unwrap_or((None, None, None));
      result.set_value((a, Some(b), c))
    });
    result.add_source(third, |result: &MediatorLiveData<(Option<A>, Option<B>, Option<C>)>, c| {
      let (a, b, _) = result.value().unwrap_or((None, None, None));
      result.set_value((a, b, Some(c)))
    });
    result.into_live_data()
  }

  /// Applies `combine` to the latest values of `self` and `other`.
  ///
  /// The value of the source that did not trigger the update is read from
  /// that source directly.
  pub fn combine_latest_with<B, R, F>(&self, other: &LiveData<B>, combine: F) -> LiveData<R>
  where
    B: Clone + Send + 'static,
    R: Clone + Send + 'static,
    F: Fn(Option<A>, Option<B>) -> R + Send + Sync + 'static,
  {
    let combine = Arc::new(combine);
    let result = MediatorLiveData::new();
    let (c_other, c_combine) = (other.clone(), combine.clone());
    result.add_source(self, move |result: &MediatorLiveData<R>, a| {
      result.set_value(c_combine(Some(a), c_other.value()))
    });
    let first = self.clone();
    result.add_source(other, move |result: &MediatorLiveData<R>, b| {
      result.set_value(combine(first.value(), Some(b)))
    });
    result.into_live_data()
  }

  /// Applies `combine` to the latest values of three holders.
  pub fn combine_latest3_with<B, C, R, F>(
    &self, second: &LiveData<B>, third: &LiveData<C>, combine: F,
  ) -> LiveData<R>
  where
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
    R: Clone + Send + 'static,
    F: Fn(Option<A>, Option<B>, Option<C>) -> R + Send + Sync + 'static,
  {
    let combine = Arc::new(combine);
    let result = MediatorLiveData::new();

    let (c_second, c_third, c_combine) = (second.clone(), third.clone(), combine.clone());
    result.add_source(self, move |result: &MediatorLiveData<R>, a| {
      result.set_value(c_combine(Some(a), c_second.value(), c_third.value()))
    });
    let (c_first, c_third, c_combine) = (self.clone(), third.clone(), combine.clone());
    result.add_source(second, move |result: &MediatorLiveData<R>, b| {
      result.set_value(c_combine(c_first.value(), Some(b), c_third.value()))
    });
    let (c_first, c_second) = (self.clone(), second.clone());
    result.add_source(third, move |result: &MediatorLiveData<R>, c| {
      result.set_value(combine(c_first.value(), c_second.value(), Some(c)))
    });
    result.into_live_data()
  }

  /// Lists of the latest values of every holder in `sources`, in source
  /// order.
  ///
  /// # Panics
  ///
  /// Panics if the same holder appears twice in `sources`.
  pub fn combine_latest_all<I>(sources: I) -> LiveData<Vec<Option<A>>>
  where
    I: IntoIterator,
    I::Item: AsRef<LiveData<A>>,
  {
    let sources: Vec<LiveData<A>> = sources.into_iter().map(|s| s.as_ref().clone()).collect();
    let len = sources.len();
    let result = MediatorLiveData::new();
    for (index, source) in sources.iter().enumerate() {
      result.add_source(source, move |result: &MediatorLiveData<Vec<Option<A>>>, x| {
        let mut items = result.value().unwrap_or_else(|| vec![None; len]);
        items[index] = Some(x);
        result.set_value(items)
      });
    }
    result.into_live_data()
  }

  /// Applies `combine` to the latest values of every holder in `sources`.
  ///
  /// # Panics
  ///
  /// Panics if the same holder appears twice in `sources`.
  pub fn combine_latest_all_with<I, R, F>(sources: I, combine: F) -> LiveData<R>
  where
    I: IntoIterator,
    I::Item: AsRef<LiveData<A>>,
    R: Clone + Send + 'static,
    F: Fn(Vec<Option<A>>) -> R + Send + Sync + 'static,
  {
    let sources: Arc<[LiveData<A>]> =
      sources.into_iter().map(|s| s.as_ref().clone()).collect();
    let combine = Arc::new(combine);
    let result = MediatorLiveData::new();
    for (index, source) in sources.iter().enumerate() {
      let (c_sources, c_combine) = (sources.clone(), combine.clone());
      result.add_source(source, move |result: &MediatorLiveData<R>, x| {
        let mut x = Some(x);
        let items = c_sources
          .iter()
          .enumerate()
          .map(|(i, source)| if i == index { x.take() } else { source.value() })
          .collect();
        result.set_value(c_combine(items))
      });
    }
    result.into_live_data()
  }
}
