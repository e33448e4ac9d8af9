//! Test harness: a recording observer and a synchronous delivery context.
//!
//! ```rust
//! use rxlive::prelude::*;
//!
//! let _instant = InstantTaskExecutor::install();
//! let source = MutableLiveData::new();
//! let observer = source.filter(|v: &i32| v % 2 == 0).test();
//! for v in 1..=4 {
//!   source.set_value(v);
//! }
//! observer.assert_values(&[2, 4]);
//! ```

mod instant_executor;
mod test_observer;

pub use instant_executor::InstantTaskExecutor;
pub use test_observer::TestObserver;

use crate::{live_data::LiveData, observer::Observer};

impl<T: Clone + Send + 'static> LiveData<T> {
  /// Observes this holder forever with a new [`TestObserver`].
  ///
  /// # Panics
  ///
  /// Panics off the delivery context.
  pub fn test(&self) -> TestObserver<T> {
    let observer = TestObserver::create();
    self.observe_forever(observer.clone());
    observer
  }

  /// Like [`LiveData::test`], forwarding every value to `downstream`.
  pub fn test_with<O>(&self, downstream: O) -> TestObserver<T>
  where
    O: Observer<T> + 'static,
  {
    let observer = TestObserver::with_downstream(downstream);
    self.observe_forever(observer.clone());
    observer
  }
}
