//! Observer trait
//!
//! The consumer side of a holder. Holders only ever push values; there is no
//! error or completion channel, so the trait has a single method.

/// Receives every value a holder delivers, synchronously, on the delivery
/// context.
///
/// Implemented for every `Fn(T) + Send + Sync` closure, so most call sites
/// pass a closure directly:
///
/// ```rust
/// use rxlive::prelude::*;
///
/// let _instant = InstantTaskExecutor::install();
/// let source = MutableLiveData::with_value(1);
/// source.observe_forever(|v: i32| println!("got {v}"));
/// ```
pub trait Observer<T>: Send + Sync {
  fn next(&self, value: T);
}

impl<T, F> Observer<T> for F
where
  F: Fn(T) + Send + Sync,
{
  #[inline]
  fn next(&self, value: T) { self(value) }
}
