use thiserror::Error;

/// Illegal-state conditions raised by holders and mediators.
///
/// These are programming errors: the plain entry points (`add_source`,
/// `set_value`, `observe`) panic with the `Display` text, the `try_*`
/// variants hand the error back instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiveDataError {
  /// The same upstream holder was registered twice on one mediator without
  /// an intervening `remove_source`.
  #[error("this source was already added to the mediator")]
  DuplicateSource,
  /// A main-thread-only entry point was called off the delivery context.
  #[error("cannot invoke {method} on a background thread")]
  NotOnMainThread { method: &'static str },
}
