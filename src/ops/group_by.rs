//! Per-key fan-out of one holder.

use std::{
  collections::HashMap,
  fmt::{Debug, Formatter},
  hash::Hash,
  ops::Deref,
  sync::{Arc, Mutex},
};

use tracing::trace;

use crate::{
  live_data::{ActivityHook, LiveData, ObserverId, WeakLiveData},
  mediator::MediatorLiveData,
  rc::{lock, MutArc, RcDeref, RcDerefMut},
};

struct Groups<K, V> {
  parent: WeakLiveData<V>,
  children: HashMap<K, LiveData<V>>,
}

impl<K, V> Groups<K, V>
where
  K: Eq + Hash + Clone + Send + 'static,
  V: Clone + Send + 'static,
{
  fn get_or_create(&mut self, key: &K) -> LiveData<V> {
    if let Some(child) = self.children.get(key) {
      return child.clone();
    }
    let child = LiveData::empty();
    child.add_activity_hook(Arc::new(ParentLink {
      parent: self.parent.clone(),
      registration: Mutex::new(None),
    }));
    self.children.insert(key.clone(), child.clone());
    trace!(groups = self.children.len(), "group created");
    child
  }
}

/// Keeps the parent observed while a child is observed.
///
/// The parent owns its children, so the link back is weak.
struct ParentLink<V> {
  parent: WeakLiveData<V>,
  registration: Mutex<Option<ObserverId>>,
}

impl<V: Clone + Send + 'static> ActivityHook for ParentLink<V> {
  fn on_active(&self) {
    let Some(parent) = self.parent.upgrade() else {
      return;
    };
    let id = parent.attach(Arc::new(|_: V| {}));
    *lock(&self.registration) = Some(id);
  }

  fn on_inactive(&self) {
    let registration = lock(&self.registration).take();
    if let (Some(id), Some(parent)) = (registration, self.parent.upgrade()) {
      parent.detach(id);
    }
  }
}

/// Holder returned by [`LiveData::group_by`].
///
/// It republishes every value of its source itself, and routes each value
/// to the child holder of its key. Each key gets exactly one child, created
/// by the first value with that key or the first [`GroupedLiveData::get`],
/// and kept for as long as the group lives. An observed child keeps the
/// group alive.
pub struct GroupedLiveData<K, V> {
  parent: MediatorLiveData<V>,
  groups: MutArc<Groups<K, V>>,
}

impl<V: Clone + Send + 'static> LiveData<V> {
  /// Splits this holder by the key `key_selector` computes for each value.
  ///
  /// ```rust
  /// use rxlive::prelude::*;
  ///
  /// let _instant = InstantTaskExecutor::install();
  /// let numbers = MutableLiveData::new();
  /// let by_parity = numbers.group_by(|n: &i32| n % 2 == 0);
  /// let even = by_parity.get(&true).test();
  /// for n in 1..=4 {
  ///   numbers.set_value(n);
  /// }
  /// even.assert_values(&[2, 4]);
  /// ```
  pub fn group_by<K, F>(&self, key_selector: F) -> GroupedLiveData<K, V>
  where
    K: Eq + Hash + Clone + Send + 'static,
    F: Fn(&V) -> K + Send + Sync + 'static,
  {
    let parent = MediatorLiveData::new();
    let groups =
      MutArc::own(Groups { parent: parent.as_live_data().downgrade(), children: HashMap::new() });
    let c_groups = groups.clone();
    parent.add_source(self, move |parent: &MediatorLiveData<V>, value: V| {
      parent.set_value(value.clone());
      let key = key_selector(&value);
      let child = c_groups.rc_deref_mut().get_or_create(&key);
      child.set_value(value);
    });
    GroupedLiveData { parent, groups }
  }
}

impl<K, V> GroupedLiveData<K, V>
where
  K: Eq + Hash + Clone + Send + 'static,
  V: Clone + Send + 'static,
{
  /// The holder receiving the values whose key equals `key`. Every call
  /// with the same key returns the same holder.
  pub fn get(&self, key: &K) -> LiveData<V> { self.groups.rc_deref_mut().get_or_create(key) }

  /// Number of keys with a child holder.
  pub fn key_count(&self) -> usize { self.groups.rc_deref().children.len() }

  pub fn as_live_data(&self) -> LiveData<V> { self.parent.as_live_data() }
}

impl<K, V> Clone for GroupedLiveData<K, V> {
  fn clone(&self) -> Self { Self { parent: self.parent.clone(), groups: self.groups.clone() } }
}

impl<K, V> Deref for GroupedLiveData<K, V> {
  type Target = LiveData<V>;

  fn deref(&self) -> &LiveData<V> { &self.parent }
}

impl<K, V> AsRef<LiveData<V>> for GroupedLiveData<K, V> {
  fn as_ref(&self) -> &LiveData<V> { &self.parent }
}

impl<K, V: Clone + Send + Debug + 'static> Debug for GroupedLiveData<K, V> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GroupedLiveData")
      .field("value", &self.parent.value())
      .field("groups", &self.groups.rc_deref().children.len())
      .finish()
  }
}
