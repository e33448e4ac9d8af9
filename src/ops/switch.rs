//! Flattening of holders of holders.

use std::sync::Arc;

use crate::{
  live_data::LiveData,
  mediator::MediatorLiveData,
  rc::{MutArc, RcDerefMut},
};

impl<T: Clone + Send + 'static> LiveData<LiveData<T>> {
  /// Follows the most recently emitted inner holder.
  ///
  /// Emitting a new inner holder stops forwarding the previous one. Only
  /// values the new holder receives after the switch are republished; the
  /// value it already holds is not.
  pub fn switch(&self) -> LiveData<T> {
    let active: MutArc<Option<LiveData<T>>> = MutArc::own(None);
    let result = MediatorLiveData::new();
    result.add_source(self, move |result: &MediatorLiveData<T>, inner: LiveData<T>| {
      let previous = {
        let mut active = active.rc_deref_mut();
        if active.as_ref().is_some_and(|old| old.ptr_eq(&inner)) {
          return;
        }
        active.replace(inner.clone())
      };
      if let Some(previous) = previous {
        result.remove_source(&previous);
      }
      let forward = |result: &MediatorLiveData<T>, v: T| result.set_value(v);
      result.add_source_skipping_current(&inner, forward);
    });
    result.into_live_data()
  }
}

impl<T: Clone + Send + 'static> LiveData<T> {
  /// Maps every value to a holder and forwards the latest one, including
  /// the value that holder already carries.
  pub fn switch_map<R, F>(&self, transform: F) -> LiveData<R>
  where
    R: Clone + Send + 'static,
    F: Fn(T) -> LiveData<R> + Send + Sync + 'static,
  {
    let transform = Arc::new(transform);
    let active: MutArc<Option<LiveData<R>>> = MutArc::own(None);
    let result = MediatorLiveData::new();
    result.add_source(self, move |result: &MediatorLiveData<R>, x: T| {
      let inner = transform(x);
      let previous = {
        let mut active = active.rc_deref_mut();
        if active.as_ref().is_some_and(|old| old.ptr_eq(&inner)) {
          return;
        }
        active.replace(inner.clone())
      };
      if let Some(previous) = previous {
        result.remove_source(&previous);
      }
      result.add_direct_source(&inner);
    });
    result.into_live_data()
  }
}
