//! The observable value holder.
//!
//! A [`LiveData`] keeps at most one value and pushes every new value to its
//! observers, synchronously, on the delivery context. Observers attaching
//! after a value exists are handed the current value immediately.
//!
//! Every update bumps a version number. Each registered observer remembers
//! the last version it was handed, so no observer ever sees the same update
//! twice, even when a dispatch is restarted by a re-entrant `set_value`.

use std::{
  fmt::{Debug, Formatter},
  ops::Deref,
  sync::{
    atomic::{AtomicBool, AtomicI64, Ordering},
    Arc, Mutex, Weak,
  },
};

use smallvec::SmallVec;
use tracing::trace;

use crate::{
  error::LiveDataError,
  executor::{self, assert_main_thread, ensure_main_thread},
  observer::Observer,
  rc::lock,
  subscription::{SubscriptionGuard, SubscriptionLike},
};

/// Version of a holder that never had a value.
pub(crate) const START_VERSION: i64 = -1;

/// Identifies one registration on one holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

/// Notified when a holder gains its first observer and when it loses its
/// last one.
///
/// Mediators use this to subscribe to their sources lazily; the suspendable
/// builder uses it to start and cancel its block.
pub trait ActivityHook: Send + Sync {
  fn on_active(&self);

  fn on_inactive(&self);
}

struct ObserverWrapper<T> {
  id: ObserverId,
  observer: Arc<dyn Observer<T>>,
  last_version: AtomicI64,
  attached: AtomicBool,
}

struct State<T> {
  value: Option<T>,
  version: i64,
  pending: Option<T>,
  observers: SmallVec<[Arc<ObserverWrapper<T>>; 2]>,
  next_observer_id: usize,
  dispatching: bool,
  invalidated: bool,
}

pub(crate) struct LiveInner<T> {
  state: Mutex<State<T>>,
  hooks: Mutex<SmallVec<[Arc<dyn ActivityHook>; 1]>>,
}

/// Read-only handle to an observable value holder.
///
/// Cloning the handle is cheap and every clone refers to the same holder.
/// Use [`MutableLiveData`] to own the write side.
pub struct LiveData<T>(pub(crate) Arc<LiveInner<T>>);

/// Non-owning handle to a holder.
pub struct WeakLiveData<T>(Weak<LiveInner<T>>);

impl<T> Clone for LiveData<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> Clone for WeakLiveData<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> WeakLiveData<T> {
  pub fn upgrade(&self) -> Option<LiveData<T>> { self.0.upgrade().map(LiveData) }
}

impl<T> LiveData<T> {
  /// Whether both handles refer to the same holder.
  #[inline]
  pub fn ptr_eq(&self, other: &LiveData<T>) -> bool { Arc::ptr_eq(&self.0, &other.0) }

  /// Stable identity of the holder, used to key source maps.
  #[inline]
  pub(crate) fn ptr_id(&self) -> usize { Arc::as_ptr(&self.0) as *const () as usize }

  pub fn downgrade(&self) -> WeakLiveData<T> { WeakLiveData(Arc::downgrade(&self.0)) }

  /// Current version; `-1` until the first value is set.
  pub fn version(&self) -> i64 { lock(&self.0.state).version }

  pub fn has_observers(&self) -> bool { !lock(&self.0.state).observers.is_empty() }

  /// Every attached observer is active, there is no lifecycle owner that
  /// could pause one, so this matches [`LiveData::has_observers`].
  pub fn has_active_observers(&self) -> bool { self.has_observers() }

  /// Registers a hook called on the 0→1 and 1→0 observer transitions. If the
  /// holder is already active the hook is activated right away.
  pub(crate) fn add_activity_hook(&self, hook: Arc<dyn ActivityHook>) {
    lock(&self.0.hooks).push(hook.clone());
    if self.has_observers() {
      hook.on_active();
    }
  }

  fn notify_hooks(&self, active: bool) {
    let hooks: SmallVec<[Arc<dyn ActivityHook>; 1]> = lock(&self.0.hooks).clone();
    trace!(active, hooks = hooks.len(), "holder activity changed");
    for hook in hooks {
      if active {
        hook.on_active()
      } else {
        hook.on_inactive()
      }
    }
  }

  /// Removes a registration without the main-thread check. Returns whether
  /// the registration existed.
  pub(crate) fn detach(&self, id: ObserverId) -> bool {
    let became_inactive = {
      let mut state = lock(&self.0.state);
      let Some(idx) = state.observers.iter().position(|w| w.id == id) else {
        return false;
      };
      let wrapper = state.observers.remove(idx);
      wrapper.attached.store(false, Ordering::Release);
      state.observers.is_empty()
    };
    if became_inactive {
      self.notify_hooks(false);
    }
    true
  }
}

impl<T: Clone + Send + 'static> LiveData<T> {
  pub(crate) fn empty() -> Self {
    LiveData(Arc::new(LiveInner {
      state: Mutex::new(State {
        value: None,
        version: START_VERSION,
        pending: None,
        observers: SmallVec::new(),
        next_observer_id: 0,
        dispatching: false,
        invalidated: false,
      }),
      hooks: Mutex::new(SmallVec::new()),
    }))
  }

  pub(crate) fn with_value(value: T) -> Self {
    let live = Self::empty();
    {
      let mut state = lock(&live.0.state);
      state.value = Some(value);
      state.version = START_VERSION + 1;
    }
    live
  }

  /// A holder permanently carrying `value`.
  ///
  /// ```rust
  /// use rxlive::prelude::*;
  ///
  /// let _instant = InstantTaskExecutor::install();
  /// let answer = LiveData::constant(42);
  /// answer.test().assert_value(&42);
  /// ```
  pub fn constant(value: T) -> Self { Self::with_value(value) }

  /// The current value, `None` until the first value is set.
  pub fn value(&self) -> Option<T> { lock(&self.0.state).value.clone() }

  /// Observes the holder until the returned guard is dropped or
  /// unsubscribed.
  ///
  /// The guard keeps this holder alive, so an operator chain can be observed
  /// without binding its intermediate holders.
  ///
  /// # Panics
  ///
  /// Panics off the delivery context.
  pub fn observe<O>(&self, observer: O) -> SubscriptionGuard<ObserveSubscription<T>>
  where
    O: Observer<T> + 'static,
  {
    assert_main_thread("observe");
    let id = self.attach(Arc::new(observer));
    SubscriptionGuard::new(ObserveSubscription { source: Some(self.clone()), id })
  }

  /// Observes the holder until [`LiveData::remove_observer`] is called with
  /// the returned id.
  ///
  /// # Panics
  ///
  /// Panics off the delivery context.
  pub fn observe_forever<O>(&self, observer: O) -> ObserverId
  where
    O: Observer<T> + 'static,
  {
    assert_main_thread("observe_forever");
    self.attach(Arc::new(observer))
  }

  /// Returns whether the registration existed.
  ///
  /// # Panics
  ///
  /// Panics off the delivery context.
  pub fn remove_observer(&self, id: ObserverId) -> bool {
    assert_main_thread("remove_observer");
    self.detach(id)
  }

  /// Registers an observer without the main-thread check.
  pub(crate) fn attach(&self, observer: Arc<dyn Observer<T>>) -> ObserverId {
    let (wrapper, became_active) = {
      let mut state = lock(&self.0.state);
      let id = ObserverId(state.next_observer_id);
      state.next_observer_id += 1;
      let wrapper = Arc::new(ObserverWrapper {
        id,
        observer,
        last_version: AtomicI64::new(START_VERSION),
        attached: AtomicBool::new(true),
      });
      state.observers.push(wrapper.clone());
      (wrapper, state.observers.len() == 1)
    };
    if became_active {
      self.notify_hooks(true);
    }
    self.dispatch(Some(wrapper.clone()));
    wrapper.id
  }

  pub(crate) fn set_value(&self, value: T) {
    if let Err(err) = self.try_set_value(value) {
      panic!("{err}");
    }
  }

  pub(crate) fn try_set_value(&self, value: T) -> Result<(), LiveDataError> {
    ensure_main_thread("set_value")?;
    self.store(value);
    Ok(())
  }

  /// Hands `value` to the delivery context. Values posted before the
  /// delivery context gets to run coalesce into the last one.
  pub(crate) fn post_value(&self, value: T) {
    let first_pending = lock(&self.0.state).pending.replace(value).is_none();
    if !first_pending {
      trace!("coalesced posted value");
      return;
    }
    let holder = Arc::downgrade(&self.0);
    executor::post_to_main_thread(Box::new(move || {
      let Some(inner) = holder.upgrade() else {
        return;
      };
      let live = LiveData(inner);
      let pending = lock(&live.0.state).pending.take();
      if let Some(value) = pending {
        live.store(value);
      }
    }));
  }

  fn store(&self, value: T) {
    let version = {
      let mut state = lock(&self.0.state);
      state.version += 1;
      state.value = Some(value);
      state.version
    };
    trace!(version, "holder value updated");
    self.dispatch(None);
  }

  fn dispatch(&self, initiator: Option<Arc<ObserverWrapper<T>>>) {
    {
      let mut state = lock(&self.0.state);
      if state.dispatching {
        state.invalidated = true;
        return;
      }
      state.dispatching = true;
    }
    let _reset = DispatchReset(&self.0);

    let mut initiator = initiator;
    loop {
      lock(&self.0.state).invalidated = false;
      if let Some(wrapper) = initiator.take() {
        self.consider_notify(&wrapper);
      } else {
        let observers = lock(&self.0.state).observers.clone();
        for wrapper in observers.iter() {
          self.consider_notify(wrapper);
          if lock(&self.0.state).invalidated {
            break;
          }
        }
      }
      if !lock(&self.0.state).invalidated {
        break;
      }
    }
  }

  fn consider_notify(&self, wrapper: &ObserverWrapper<T>) {
    if !wrapper.attached.load(Ordering::Acquire) {
      return;
    }
    let (version, value) = {
      let state = lock(&self.0.state);
      match &state.value {
        Some(value) => (state.version, value.clone()),
        None => return,
      }
    };
    if wrapper.last_version.load(Ordering::Acquire) >= version {
      return;
    }
    wrapper.last_version.store(version, Ordering::Release);
    wrapper.observer.next(value);
  }
}

/// Clears the dispatch flags even if an observer panics.
struct DispatchReset<'a, T>(&'a LiveInner<T>);

impl<T> Drop for DispatchReset<'_, T> {
  fn drop(&mut self) {
    let mut state = lock(&self.0.state);
    state.dispatching = false;
    state.invalidated = false;
  }
}

impl<T> AsRef<LiveData<T>> for LiveData<T> {
  #[inline]
  fn as_ref(&self) -> &LiveData<T> { self }
}

impl<T: Debug> Debug for LiveData<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let state = lock(&self.0.state);
    f.debug_struct("LiveData")
      .field("value", &state.value)
      .field("version", &state.version)
      .field("observers", &state.observers.len())
      .finish()
  }
}

/// Registration created by [`LiveData::observe`].
pub struct ObserveSubscription<T> {
  source: Option<LiveData<T>>,
  id: ObserverId,
}

impl<T> ObserveSubscription<T> {
  pub fn observer_id(&self) -> ObserverId { self.id }
}

impl<T> SubscriptionLike for ObserveSubscription<T> {
  fn unsubscribe(&mut self) {
    if let Some(source) = self.source.take() {
      source.detach(self.id);
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.source.is_none() }
}

impl<T> Debug for ObserveSubscription<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ObserveSubscription")
      .field("id", &self.id)
      .field("closed", &self.is_closed())
      .finish()
  }
}

// ==================== MutableLiveData ====================

/// Holder that exposes the write side.
///
/// Dereferences to [`LiveData`], so all read operations and operators are
/// available directly.
pub struct MutableLiveData<T>(LiveData<T>);

impl<T: Clone + Send + 'static> MutableLiveData<T> {
  /// A holder without a value.
  pub fn new() -> Self { Self(LiveData::empty()) }

  pub fn with_value(value: T) -> Self { Self(LiveData::with_value(value)) }

  /// Sets the value and dispatches it to every observer.
  ///
  /// # Panics
  ///
  /// Panics off the delivery context, use [`MutableLiveData::post_value`]
  /// from other threads.
  #[inline]
  pub fn set_value(&self, value: T) { self.0.set_value(value) }

  #[inline]
  pub fn try_set_value(&self, value: T) -> Result<(), LiveDataError> {
    self.0.try_set_value(value)
  }

  /// Sets the value from any thread. The update is applied when the delivery
  /// context runs the posted task.
  #[inline]
  pub fn post_value(&self, value: T) { self.0.post_value(value) }

  /// A read-only handle to the same holder.
  pub fn as_live_data(&self) -> LiveData<T> { self.0.clone() }
}

impl<T: Clone + Send + 'static> Default for MutableLiveData<T> {
  fn default() -> Self { Self::new() }
}

impl<T> Clone for MutableLiveData<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> Deref for MutableLiveData<T> {
  type Target = LiveData<T>;

  #[inline]
  fn deref(&self) -> &LiveData<T> { &self.0 }
}

impl<T> AsRef<LiveData<T>> for MutableLiveData<T> {
  #[inline]
  fn as_ref(&self) -> &LiveData<T> { &self.0 }
}

impl<T> From<MutableLiveData<T>> for LiveData<T> {
  #[inline]
  fn from(mutable: MutableLiveData<T>) -> Self { mutable.0 }
}

impl<T: Debug> Debug for MutableLiveData<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { self.0.fmt(f) }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::AtomicUsize;

  use super::*;
  use crate::{
    executor::MainLoop,
    rc::{MutArc, RcDeref, RcDerefMut},
    testing::TestObserver,
  };

  #[rxlive_macro::test]
  fn replays_current_value_on_attach() {
    let source = MutableLiveData::with_value(1);
    let observer = source.test();
    observer.assert_value(&1);

    source.set_value(2);
    observer.assert_values(&[1, 2]);
  }

  #[rxlive_macro::test]
  fn empty_holder_delivers_nothing() {
    let source = MutableLiveData::<i32>::new();
    assert_eq!(source.value(), None);
    assert_eq!(source.version(), START_VERSION);
    source.test().assert_no_values();
  }

  #[rxlive_macro::test]
  fn nullable_values_are_values() {
    let source = MutableLiveData::<Option<&str>>::new();
    let observer = source.test();
    source.set_value(None);
    source.set_value(Some("x"));
    observer.assert_values(&[None, Some("x")]);
    assert_eq!(source.value(), Some(Some("x")));
  }

  #[rxlive_macro::test]
  fn guard_detaches_on_drop() {
    let source = MutableLiveData::new();
    let hits = Arc::new(AtomicUsize::new(0));
    {
      let c_hits = hits.clone();
      let _guard = source.observe(move |_: i32| {
        c_hits.fetch_add(1, Ordering::SeqCst);
      });
      assert!(source.has_observers());
      source.set_value(1);
    }
    assert!(!source.has_observers());
    source.set_value(2);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[rxlive_macro::test]
  fn remove_observer_stops_delivery() {
    let source = MutableLiveData::new();
    let observer = TestObserver::create();
    let id = source.observe_forever(observer.clone());
    source.set_value("a");
    assert!(source.remove_observer(id));
    assert!(!source.remove_observer(id));
    source.set_value("b");
    observer.assert_value(&"a");
  }

  #[rxlive_macro::test]
  fn reentrant_set_restarts_dispatch_with_newest_value() {
    let source = MutableLiveData::new();
    let first = TestObserver::create();
    let second = TestObserver::create();

    let c_source = source.clone();
    source.observe_forever(move |v: i32| {
      if v == 1 {
        c_source.set_value(2);
      }
    });
    source.observe_forever(first.clone());
    source.observe_forever(second.clone());

    source.set_value(1);
    first.assert_value(&2);
    second.assert_value(&2);
  }

  #[rxlive_macro::test]
  fn activity_hooks_fire_on_transitions() {
    struct Recorder(MutArc<Vec<bool>>);

    impl ActivityHook for Recorder {
      fn on_active(&self) { self.0.rc_deref_mut().push(true) }

      fn on_inactive(&self) { self.0.rc_deref_mut().push(false) }
    }

    let events = MutArc::own(vec![]);
    let source = MutableLiveData::<i32>::new();
    source.add_activity_hook(Arc::new(Recorder(events.clone())));

    let a = source.observe(|_: i32| {});
    let b = source.observe(|_: i32| {});
    drop(a);
    assert_eq!(*events.rc_deref(), vec![true]);
    drop(b);
    assert_eq!(*events.rc_deref(), vec![true, false]);
  }

  #[rxlive_macro::test]
  fn posts_coalesce_into_last_value() {
    let main_loop = Arc::new(MainLoop::new());
    main_loop.attach_current_thread();
    let _guard = executor::set_thread_executor(main_loop.clone());

    let source = MutableLiveData::new();
    let observer = source.test();
    source.post_value(1);
    source.post_value(2);
    source.post_value(3);
    observer.assert_no_values();

    assert_eq!(main_loop.run_pending(), 1);
    observer.assert_value(&3);
  }

  #[rxlive_macro::test]
  fn post_from_worker_thread() {
    let main_loop = Arc::new(MainLoop::new());
    main_loop.attach_current_thread();
    let _guard = executor::set_thread_executor(main_loop.clone());

    let source = MutableLiveData::new();
    let observer = source.test();
    let c_source = source.clone();
    let c_loop = main_loop.clone();
    std::thread::spawn(move || {
      let _guard = executor::set_thread_executor(c_loop);
      assert_eq!(
        c_source.try_set_value(7),
        Err(LiveDataError::NotOnMainThread { method: "set_value" })
      );
      c_source.post_value(7);
    })
    .join()
    .unwrap();

    main_loop.run_pending();
    observer.assert_value(&7);
  }

  #[test]
  #[should_panic(expected = "cannot invoke set_value on a background thread")]
  fn set_value_off_main_thread_panics() {
    let main_loop = Arc::new(MainLoop::new());
    let _guard = executor::set_thread_executor(main_loop);
    MutableLiveData::new().set_value(1);
  }
}
