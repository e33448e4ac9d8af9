//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Holders
pub use crate::live_data::{LiveData, MutableLiveData, ObserveSubscription, ObserverId};
pub use crate::mediator::MediatorLiveData;
// Builder
pub use crate::builder::{live_data, LiveDataScope};
// Operators
pub use crate::ops::{AnyValue, GroupedLiveData};
// Observer trait
pub use crate::observer::Observer;
// Delivery context
pub use crate::executor::{MainLoop, TaskExecutor};
// Scheduler Core types
pub use crate::scheduler::{sleep, Duration, Scheduler, TaskHandle, TestScheduler};
#[cfg(feature = "thread-scheduler")]
pub use crate::scheduler::ThreadScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
// Subscription
pub use crate::subscription::{SubscriptionGuard, SubscriptionLike};
// Testing
pub use crate::testing::{InstantTaskExecutor, TestObserver};
// Errors
pub use crate::error::LiveDataError;
