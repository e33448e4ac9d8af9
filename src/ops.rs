//! Composition operators.
//!
//! Every operator builds a new [`MediatorLiveData`](crate::mediator::MediatorLiveData)
//! wired to its upstream holders and hands it back as a read-only
//! [`LiveData`](crate::live_data::LiveData). Operators are inherent methods,
//! so they chain directly on any holder.

use std::sync::atomic::{AtomicBool, Ordering};

pub mod combine_latest;
pub mod default_if_empty;
pub mod delay;
pub mod filter;
pub mod group_by;
pub mod interval;
pub mod map;
pub mod merge;
pub mod reduce;
pub mod switch;
pub mod throttle;

pub use filter::AnyValue;
pub use group_by::GroupedLiveData;

/// Remembers whether a source callback already fired once.
#[derive(Debug, Default)]
pub(crate) struct FirstEmission(AtomicBool);

impl FirstEmission {
  /// Flips the marker. Returns `true` only for the very first call.
  pub(crate) fn mark(&self) -> bool { !self.0.swap(true, Ordering::AcqRel) }

  pub(crate) fn has_observed(&self) -> bool { self.0.load(Ordering::Acquire) }
}

#[cfg(test)]
mod test {
  use super::FirstEmission;

  #[test]
  fn first_emission_flips_once() {
    let marker = FirstEmission::default();
    assert!(!marker.has_observed());
    assert!(marker.mark());
    assert!(marker.has_observed());
    assert!(!marker.mark());
  }
}
