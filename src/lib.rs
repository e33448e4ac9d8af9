//! # rxlive: composition operators for observable value holders
//!
//! A [`LiveData`] holds one value at a time and pushes every new value to
//! its observers on a single delivery context. The operators in [`ops`]
//! derive new holders from existing ones, built on the fan-in
//! [`MediatorLiveData`].
//!
//! ## Quick Start
//!
//! ```rust
//! use rxlive::prelude::*;
//!
//! // Deliver synchronously on this thread.
//! let _instant = InstantTaskExecutor::install();
//!
//! let temperature = MutableLiveData::new();
//! let warnings = temperature
//!   .filter(|c: &f64| *c > 30.)
//!   .map(|c| format!("hot: {c}"))
//!   .test();
//!
//! temperature.set_value(21.5);
//! temperature.set_value(32.);
//! warnings.assert_values(&["hot: 32".to_owned()]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`LiveData`] / [`MutableLiveData`] | Read-only and writable value holders |
//! | [`MediatorLiveData`] | Holder fed by callbacks on other holders |
//! | [`Scheduler`] | Time source of the time-based operators |
//! | [`TestObserver`] | Records values and asserts on them |
//!
//! Observers always run on the delivery context chosen through
//! [`executor`]; [`InstantTaskExecutor`] turns the current thread into
//! one for tests.
//!
//! ## Feature Flags
//!
//! - **`thread-scheduler`** (default): [`ThreadScheduler`], timers on helper
//!   threads
//! - **`tokio-scheduler`**: [`TokioScheduler`], timers on a tokio runtime
//!
//! [`LiveData`]: live_data::LiveData
//! [`MutableLiveData`]: live_data::MutableLiveData
//! [`MediatorLiveData`]: mediator::MediatorLiveData
//! [`Scheduler`]: scheduler::Scheduler
//! [`TestObserver`]: testing::TestObserver
//! [`InstantTaskExecutor`]: testing::InstantTaskExecutor
//! [`ThreadScheduler`]: scheduler::ThreadScheduler
//! [`TokioScheduler`]: scheduler::TokioScheduler

extern crate self as rxlive;

pub mod builder;
pub mod error;
pub mod executor;
pub mod live_data;
pub mod mediator;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod subscription;
pub mod testing;

pub use prelude::*;
/// Marks a test that runs with [`testing::InstantTaskExecutor`] installed.
///
/// A single argument is initialized with `Default::default()`, which is how
/// tests receive a fresh [`scheduler::TestScheduler`].
pub use rxlive_macro::test;

#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
