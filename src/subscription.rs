use std::fmt::{Debug, Formatter};

/// Handle that allows detaching from a holder or cancelling a scheduled task
/// before it runs.
pub trait SubscriptionLike {
  fn unsubscribe(&mut self);

  fn is_closed(&self) -> bool;
}

impl Debug for Box<dyn SubscriptionLike + Send> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Box<dyn SubscriptionLike>").field("is_closed", &self.is_closed()).finish()
  }
}

impl<T: ?Sized> SubscriptionLike for Box<T>
where
  T: SubscriptionLike,
{
  #[inline]
  fn unsubscribe(&mut self) {
    let s = &mut **self;
    s.unsubscribe()
  }

  #[inline]
  fn is_closed(&self) -> bool {
    let s = &**self;
    s.is_closed()
  }
}

/// An RAII implementation of a "scoped subscription". When this structure is
/// dropped (falls out of scope), the subscription will be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope.
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: SubscriptionLike>(pub(crate) T);

impl<T: SubscriptionLike> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(subscription) }

  /// Unsubscribes now instead of waiting for the guard to drop.
  pub fn unsubscribe(mut self) { self.0.unsubscribe() }

  #[inline]
  pub fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl<T: SubscriptionLike> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) {
    if !self.0.is_closed() {
      self.0.unsubscribe()
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[derive(Default)]
  struct Flag {
    closed: bool,
    calls: usize,
  }

  impl SubscriptionLike for &mut Flag {
    fn unsubscribe(&mut self) {
      self.closed = true;
      self.calls += 1;
    }

    fn is_closed(&self) -> bool { self.closed }
  }

  #[test]
  fn guard_unsubscribes_once() {
    let mut flag = Flag::default();
    {
      let guard = SubscriptionGuard::new(&mut flag);
      assert!(!guard.is_closed());
    }
    assert!(flag.closed);
    assert_eq!(flag.calls, 1);
  }

  #[test]
  fn explicit_unsubscribe_skips_drop() {
    let mut flag = Flag::default();
    SubscriptionGuard::new(&mut flag).unsubscribe();
    assert_eq!(flag.calls, 1);
  }
}
