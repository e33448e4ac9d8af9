//! Fan-in primitive.
//!
//! A [`MediatorLiveData`] is a holder that listens to any number of upstream
//! holders ("sources") and runs a callback for each of their updates. The
//! callback decides what, if anything, the mediator republishes.
//!
//! Sources are only observed while the mediator itself is observed. While
//! plugged, the upstream registration keeps the mediator alive, so an
//! observed operator chain does not need its intermediate holders bound to
//! variables. Once the mediator loses its last observer every source is
//! unplugged again and the chain is owned by its handles only.

use std::{
  fmt::{Debug, Formatter},
  ops::Deref,
  sync::{
    atomic::{AtomicBool, AtomicI64, Ordering},
    Arc, Mutex,
  },
};

use indexmap::IndexMap;
use tracing::debug;

use crate::{
  error::LiveDataError,
  live_data::{ActivityHook, LiveData, ObserverId, WeakLiveData, START_VERSION},
  rc::{lock, MutArc, RcDeref, RcDerefMut, WeakMutArc},
};

type SourceCallback<S, T> = Arc<dyn Fn(&MediatorLiveData<T>, S) + Send + Sync>;
type SourceMap<T> = IndexMap<usize, Arc<dyn SourcePlug<T>>>;

/// Type-erased registration of one upstream holder.
trait SourcePlug<T>: Send + Sync {
  fn plug(self: Arc<Self>, mediator: &MediatorLiveData<T>);

  fn unplug(&self);
}

struct Source<S, T> {
  live: LiveData<S>,
  callback: SourceCallback<S, T>,
  version: AtomicI64,
  plugged: AtomicBool,
  registration: Mutex<Option<ObserverId>>,
}

impl<S, T> Source<S, T>
where
  S: Clone + Send + 'static,
  T: Clone + Send + 'static,
{
  fn on_changed(&self, mediator: &MediatorLiveData<T>, value: S) {
    let version = self.live.version();
    if self.version.swap(version, Ordering::AcqRel) != version {
      (self.callback)(mediator, value);
    }
  }
}

impl<S, T> SourcePlug<T> for Source<S, T>
where
  S: Clone + Send + 'static,
  T: Clone + Send + 'static,
{
  fn plug(self: Arc<Self>, mediator: &MediatorLiveData<T>) {
    if self.plugged.swap(true, Ordering::AcqRel) {
      return;
    }
    let source = self.clone();
    let mediator = mediator.clone();
    let id = self.live.attach(Arc::new(move |value: S| source.on_changed(&mediator, value)));
    *lock(&self.registration) = Some(id);
    // The initial delivery may already have removed this source.
    if !self.plugged.load(Ordering::Acquire) {
      self.unplug();
    }
  }

  fn unplug(&self) {
    self.plugged.store(false, Ordering::Release);
    let registration = lock(&self.registration).take();
    if let Some(id) = registration {
      self.live.detach(id);
    }
  }
}

/// Plugs every source when the mediator becomes active and unplugs them when
/// it becomes inactive.
struct MediatorHook<T> {
  live: WeakLiveData<T>,
  sources: MutArc<SourceMap<T>>,
}

impl<T: Clone + Send + 'static> MediatorHook<T> {
  fn snapshot(&self) -> Vec<Arc<dyn SourcePlug<T>>> {
    self.sources.rc_deref().values().cloned().collect()
  }
}

impl<T: Clone + Send + 'static> ActivityHook for MediatorHook<T> {
  fn on_active(&self) {
    let Some(live) = self.live.upgrade() else {
      return;
    };
    let mediator = MediatorLiveData { live, sources: self.sources.clone() };
    for source in self.snapshot() {
      source.plug(&mediator);
    }
  }

  fn on_inactive(&self) {
    for source in self.snapshot() {
      source.unplug();
    }
  }
}

/// Holder that republishes values derived from its sources.
///
/// ```rust
/// use rxlive::prelude::*;
///
/// let _instant = InstantTaskExecutor::install();
/// let celsius = MutableLiveData::new();
/// let fahrenheit = MediatorLiveData::new();
/// fahrenheit.add_source(&celsius, |out: &MediatorLiveData<f64>, c: f64| {
///   out.set_value(c * 1.8 + 32.)
/// });
///
/// let observer = fahrenheit.test();
/// celsius.set_value(100.);
/// observer.assert_value(&212.);
/// ```
pub struct MediatorLiveData<T> {
  live: LiveData<T>,
  sources: MutArc<SourceMap<T>>,
}

/// Non-owning handle to a mediator.
pub struct WeakMediator<T> {
  live: WeakLiveData<T>,
  sources: WeakMutArc<SourceMap<T>>,
}

impl<T> WeakMediator<T> {
  pub fn upgrade(&self) -> Option<MediatorLiveData<T>> {
    let live = self.live.upgrade()?;
    let sources = self.sources.upgrade()?;
    Some(MediatorLiveData { live, sources })
  }
}

impl<T> Clone for WeakMediator<T> {
  fn clone(&self) -> Self { Self { live: self.live.clone(), sources: self.sources.clone() } }
}

impl<T: Clone + Send + 'static> MediatorLiveData<T> {
  pub fn new() -> Self { Self::from_live(LiveData::empty()) }

  /// A mediator that starts with a value.
  pub fn with_value(value: T) -> Self { Self::from_live(LiveData::with_value(value)) }

  fn from_live(live: LiveData<T>) -> Self {
    let sources = MutArc::own(IndexMap::new());
    let hook = MediatorHook { live: live.downgrade(), sources: sources.clone() };
    live.add_activity_hook(Arc::new(hook));
    MediatorLiveData { live, sources }
  }

  /// Starts listening to `source`; `on_changed` runs for every value the
  /// source delivers while this mediator is observed.
  ///
  /// # Panics
  ///
  /// Panics if `source` was already added and not removed since.
  #[track_caller]
  pub fn add_source<S, F>(&self, source: &LiveData<S>, on_changed: F)
  where
    S: Clone + Send + 'static,
    F: Fn(&MediatorLiveData<T>, S) + Send + Sync + 'static,
  {
    if let Err(err) = self.try_add_source(source, on_changed) {
      panic!("{err}");
    }
  }

  /// Like [`MediatorLiveData::add_source`], reporting a duplicate source
  /// instead of panicking.
  pub fn try_add_source<S, F>(
    &self, source: &LiveData<S>, on_changed: F,
  ) -> Result<(), LiveDataError>
  where
    S: Clone + Send + 'static,
    F: Fn(&MediatorLiveData<T>, S) + Send + Sync + 'static,
  {
    self.insert_source(source, Arc::new(on_changed), START_VERSION)
  }

  /// Adds `source` without forwarding the value it holds right now; only
  /// values set after this call reach `on_changed`.
  ///
  /// Panics on a duplicate source, as [`MediatorLiveData::add_source`] does.
  #[track_caller]
  pub(crate) fn add_source_skipping_current<S, F>(&self, source: &LiveData<S>, on_changed: F)
  where
    S: Clone + Send + 'static,
    F: Fn(&MediatorLiveData<T>, S) + Send + Sync + 'static,
  {
    if let Err(err) = self.insert_source(source, Arc::new(on_changed), source.version()) {
      panic!("{err}");
    }
  }

  fn insert_source<S>(
    &self, source: &LiveData<S>, callback: SourceCallback<S, T>, version: i64,
  ) -> Result<(), LiveDataError>
  where
    S: Clone + Send + 'static,
  {
    let key = source.ptr_id();
    let entry = Arc::new(Source {
      live: source.clone(),
      callback,
      version: AtomicI64::new(version),
      plugged: AtomicBool::new(false),
      registration: Mutex::new(None),
    });
    {
      let mut sources = self.sources.rc_deref_mut();
      if sources.contains_key(&key) {
        debug!(source = key, "rejected duplicate mediator source");
        return Err(LiveDataError::DuplicateSource);
      }
      sources.insert(key, entry.clone());
    }
    debug!(source = key, active = self.live.has_active_observers(), "mediator source added");
    if self.live.has_active_observers() {
      entry.plug(self);
    }
    Ok(())
  }

  /// Stops listening to `source`. Values it emits afterwards are ignored.
  pub fn remove_source<S>(&self, source: &LiveData<S>) {
    let key = source.ptr_id();
    let removed = self.sources.rc_deref_mut().shift_remove(&key);
    if let Some(entry) = removed {
      debug!(source = key, "mediator source removed");
      entry.unplug();
    }
  }

  /// Republishes every value of `source` unchanged.
  #[track_caller]
  pub fn add_direct_source(&self, source: &LiveData<T>) {
    self.add_source(source, |mediator: &MediatorLiveData<T>, value| mediator.set_value(value));
  }

  /// Number of registered sources.
  pub fn source_count(&self) -> usize { self.sources.rc_deref().len() }

  #[inline]
  pub fn set_value(&self, value: T) { self.live.set_value(value) }

  #[inline]
  pub fn try_set_value(&self, value: T) -> Result<(), LiveDataError> {
    self.live.try_set_value(value)
  }

  #[inline]
  pub fn post_value(&self, value: T) { self.live.post_value(value) }

  pub fn downgrade(&self) -> WeakMediator<T> {
    WeakMediator { live: self.live.downgrade(), sources: self.sources.downgrade() }
  }

  /// A read-only handle to the same holder.
  pub fn as_live_data(&self) -> LiveData<T> { self.live.clone() }

  pub fn into_live_data(self) -> LiveData<T> { self.live }
}

impl<T: Clone + Send + 'static> Default for MediatorLiveData<T> {
  fn default() -> Self { Self::new() }
}

impl<T> Clone for MediatorLiveData<T> {
  fn clone(&self) -> Self { Self { live: self.live.clone(), sources: self.sources.clone() } }
}

impl<T> Deref for MediatorLiveData<T> {
  type Target = LiveData<T>;

  #[inline]
  fn deref(&self) -> &LiveData<T> { &self.live }
}

impl<T> AsRef<LiveData<T>> for MediatorLiveData<T> {
  #[inline]
  fn as_ref(&self) -> &LiveData<T> { &self.live }
}

impl<T> From<MediatorLiveData<T>> for LiveData<T> {
  #[inline]
  fn from(mediator: MediatorLiveData<T>) -> Self { mediator.live }
}

impl<T: Debug> Debug for MediatorLiveData<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MediatorLiveData")
      .field("live", &self.live)
      .field("sources", &self.sources.rc_deref().len())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::prelude::*;

  #[rxlive_macro::test]
  fn direct_source_forwards_posted_values() {
    let source = MutableLiveData::new();
    let mediator = MediatorLiveData::new();
    mediator.add_direct_source(&source);
    let observer = mediator.test();

    source.post_value(1);
    source.post_value(2);
    source.post_value(3);
    source.post_value(4);

    observer.assert_values(&[1, 2, 3, 4]);
  }

  #[rxlive_macro::test]
  fn sources_are_plugged_lazily() {
    let source = MutableLiveData::with_value(1);
    let mediator = MediatorLiveData::new();
    mediator.add_direct_source(&source);
    assert!(!source.has_observers());
    assert_eq!(mediator.value(), None);

    let guard = mediator.observe(|_: i32| {});
    assert!(source.has_observers());
    assert_eq!(mediator.value(), Some(1));

    drop(guard);
    assert!(!source.has_observers());
  }

  #[rxlive_macro::test]
  fn reactivation_does_not_replay_forwarded_values() {
    let source = MutableLiveData::with_value("a");
    let mediator = MediatorLiveData::new();
    let count = MutArc::own(0);
    let c_count = count.clone();
    mediator.add_source(&source, move |m: &MediatorLiveData<&str>, v| {
      *c_count.rc_deref_mut() += 1;
      m.set_value(v)
    });

    drop(mediator.observe(|_: &str| {}));
    drop(mediator.observe(|_: &str| {}));
    assert_eq!(*count.rc_deref(), 1);

    source.set_value("b");
    let observer = mediator.test();
    observer.assert_value(&"b");
    assert_eq!(*count.rc_deref(), 2);
  }

  #[rxlive_macro::test]
  fn observing_a_mediator_with_a_value_delivers_it() {
    let mediator = MediatorLiveData::with_value(5);
    mediator.test().assert_value(&5);
  }

  #[rxlive_macro::test]
  fn duplicate_source_is_rejected() {
    let source = MutableLiveData::<i32>::new();
    let mediator = MediatorLiveData::new();
    mediator.add_direct_source(&source);
    assert_eq!(
      mediator.try_add_source(&source, |_: &MediatorLiveData<i32>, _| {}),
      Err(LiveDataError::DuplicateSource)
    );

    mediator.remove_source(&source);
    assert!(mediator.try_add_source(&source, |_: &MediatorLiveData<i32>, _| {}).is_ok());
  }

  #[rxlive_macro::test]
  #[should_panic(expected = "this source was already added to the mediator")]
  fn add_source_twice_panics() {
    let source = MutableLiveData::<i32>::new();
    let mediator = MediatorLiveData::new();
    mediator.add_direct_source(&source);
    mediator.add_direct_source(&source);
  }

  #[rxlive_macro::test]
  fn removed_source_is_ignored() {
    let first = MutableLiveData::new();
    let second = MutableLiveData::new();
    let mediator = MediatorLiveData::new();
    mediator.add_direct_source(&first);
    mediator.add_direct_source(&second);
    let observer = mediator.test();

    first.set_value(1);
    mediator.remove_source(&first);
    assert!(!first.has_observers());
    first.set_value(2);
    second.set_value(3);

    observer.assert_values(&[1, 3]);
    assert_eq!(mediator.source_count(), 1);
  }

  #[rxlive_macro::test]
  fn source_removing_itself_during_initial_delivery() {
    let source = MutableLiveData::with_value(1);
    let mediator = MediatorLiveData::new();
    let c_source = source.as_live_data();
    mediator.add_source(&source, move |m: &MediatorLiveData<i32>, v| {
      m.remove_source(&c_source);
      m.set_value(v);
    });
    let observer = mediator.test();
    source.set_value(2);

    observer.assert_value(&1);
    assert!(!source.has_observers());
  }

  #[rxlive_macro::test]
  fn observed_chain_outlives_its_handles() {
    let source = MutableLiveData::new();
    let observer = {
      let mediator = MediatorLiveData::new();
      mediator.add_direct_source(&source);
      mediator.test()
    };
    source.set_value(1);
    observer.assert_value(&1);
  }
}
