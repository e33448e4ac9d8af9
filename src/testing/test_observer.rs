use std::{
  any::type_name,
  fmt::{Debug, Formatter},
  marker::PhantomData,
  sync::{Arc, Mutex},
};

use crate::{observer::Observer, rc::lock};

/// An observer that records every value it receives and asserts on them.
///
/// Every assertion either returns `&self`, so assertions chain, or panics
/// with a message listing the expected and the observed values.
///
/// ```rust
/// use rxlive::prelude::*;
///
/// let _instant = InstantTaskExecutor::install();
/// let source = MutableLiveData::new();
/// let observer = source.test();
/// source.set_value("a");
/// source.set_value("b");
/// observer.assert_value_count(2).assert_values(&["a", "b"]);
/// ```
pub struct TestObserver<T>(Arc<Recorder<T>>);

struct Recorder<T> {
  values: Mutex<Vec<T>>,
  downstream: Option<Arc<dyn Observer<T>>>,
}

impl<T> Clone for TestObserver<T> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T: Clone + Send + 'static> Observer<T> for TestObserver<T> {
  fn next(&self, value: T) {
    match &self.0.downstream {
      Some(downstream) => {
        lock(&self.0.values).push(value.clone());
        downstream.next(value);
      }
      None => lock(&self.0.values).push(value),
    }
  }
}

impl<T: Clone> TestObserver<T> {
  /// A recorder that forwards nothing.
  pub fn create() -> Self {
    Self(Arc::new(Recorder { values: Mutex::new(vec![]), downstream: None }))
  }

  /// A recorder that forwards every value to `downstream` after recording it.
  pub fn with_downstream<O>(downstream: O) -> Self
  where
    O: Observer<T> + 'static,
  {
    Self(Arc::new(Recorder { values: Mutex::new(vec![]), downstream: Some(Arc::new(downstream)) }))
  }

  /// The received values, in order.
  pub fn values(&self) -> Vec<T> { lock(&self.0.values).clone() }

  pub fn value_count(&self) -> usize { lock(&self.0.values).len() }
}

impl<T: Clone + PartialEq + Debug> TestObserver<T> {
  /// Asserts that exactly one value was received and that it equals `value`.
  #[track_caller]
  pub fn assert_value(&self, value: &T) -> &Self {
    self.assert_all(std::slice::from_ref(value), "exactly 1 value");
    self
  }

  /// Asserts that exactly one value was received and that `predicate`
  /// accepts it.
  #[track_caller]
  pub fn assert_value_matching<P>(&self, predicate: P) -> &Self
  where
    P: FnOnce(&T) -> bool,
  {
    let values = self.values();
    if values.len() != 1 {
      Failure::<T>::new("Value count does not match")
        .expected("exactly 1 value matching the predicate", &[])
        .observed(format!("exactly {}", count_text(values.len())), &values)
        .raise();
    }
    if !predicate(&values[0]) {
      Failure::<T>::new("Value does not match the predicate")
        .observed("exactly 1 value", &values)
        .raise();
    }
    self
  }

  /// Asserts that exactly `values` were received, in this order.
  #[track_caller]
  pub fn assert_values(&self, values: &[T]) -> &Self {
    self.assert_all(values, "values in exact order");
    self
  }

  /// Asserts that exactly `values` were received, in any order.
  #[track_caller]
  pub fn assert_value_set(&self, values: &[T]) -> &Self {
    let observed = self.values();
    if observed.len() != values.len() {
      Failure::<T>::new("Value count does not match")
        .expected(format!("exactly {} in any order", count_text(values.len())), values)
        .observed(format!("exactly {}", count_text(observed.len())), &observed)
        .raise();
    }
    if let Some((index, value)) = observed.iter().enumerate().find(|(_, v)| !values.contains(*v)) {
      Failure::<T>::new("Values do not match")
        .observed(format!("unexpected value at index {index}"), std::slice::from_ref(value))
        .raise();
    }
    self
  }

  /// Asserts that the value received at `index` equals `value`.
  #[track_caller]
  pub fn assert_value_at(&self, index: usize, value: &T) -> &Self {
    let observed = self.values();
    let expected = std::slice::from_ref(value);
    let Some(actual) = observed.get(index) else {
      Failure::<T>::new("Value count does not match")
        .expected(format!("value at index {index}"), expected)
        .observed(format!("only {}", count_text(observed.len())), &observed)
        .raise();
    };
    if actual != value {
      Failure::<T>::new("Values do not match")
        .expected(format!("value at index {index}"), expected)
        .observed(format!("value at index {index}"), std::slice::from_ref(actual))
        .raise();
    }
    self
  }

  /// Asserts that `predicate` accepts the value received at `index`.
  #[track_caller]
  pub fn assert_value_at_matching<P>(&self, index: usize, predicate: P) -> &Self
  where
    P: FnOnce(&T) -> bool,
  {
    let observed = self.values();
    let expected_text = format!("value at index {index} matching the predicate");
    let Some(actual) = observed.get(index) else {
      Failure::<T>::new("Value count does not match")
        .expected(expected_text, &[])
        .observed(format!("only {}", count_text(observed.len())), &observed)
        .raise();
    };
    if !predicate(actual) {
      Failure::<T>::new("Values do not match")
        .expected(expected_text, &[])
        .observed(format!("value at index {index}"), std::slice::from_ref(actual))
        .raise();
    }
    self
  }

  #[track_caller]
  pub fn assert_no_values(&self) -> &Self {
    let observed = self.values();
    if !observed.is_empty() {
      Failure::<T>::new("Value count does not match")
        .expected("no values", &[])
        .observed(format!("exactly {}", count_text(observed.len())), &observed)
        .raise();
    }
    self
  }

  #[track_caller]
  pub fn assert_value_count(&self, count: usize) -> &Self {
    let observed = self.values();
    if observed.len() != count {
      Failure::<T>::new("Value count does not match")
        .expected(format!("exactly {}", count_text(count)), &[])
        .observed(format!("exactly {}", count_text(observed.len())), &observed)
        .raise();
    }
    self
  }

  /// Asserts that the most recent value equals `value`, whatever came
  /// before it.
  #[track_caller]
  pub fn assert_latest_value(&self, value: &T) -> &Self {
    let observed = self.values();
    match observed.last() {
      Some(latest) if latest == value => {}
      Some(latest) => Failure::<T>::new("Values do not match")
        .expected("latest value", std::slice::from_ref(value))
        .observed("latest value", std::slice::from_ref(latest))
        .raise(),
      None => Failure::<T>::new("Value count does not match")
        .expected("latest value", std::slice::from_ref(value))
        .observed("no values", &[])
        .raise(),
    }
    self
  }

  #[track_caller]
  fn assert_all(&self, expected: &[T], expected_text: &str) {
    let observed = self.values();
    if observed != expected {
      let observed_text = if observed.is_empty() {
        "no values".to_owned()
      } else {
        format!("exactly {}", count_text(observed.len()))
      };
      Failure::<T>::new("Values do not match")
        .expected(expected_text, expected)
        .observed(observed_text, &observed)
        .raise();
    }
  }
}

impl<T: Debug> Debug for TestObserver<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TestObserver")
      .field("values", &*lock(&self.0.values))
      .field("forwarding", &self.0.downstream.is_some())
      .finish()
  }
}

fn count_text(count: usize) -> String {
  if count == 1 { "1 value".to_owned() } else { format!("{count} values") }
}

/// Builds the multi-line assertion message.
struct Failure<T> {
  lines: Vec<String>,
  _values: PhantomData<T>,
}

impl<T: Debug> Failure<T> {
  fn new(summary: &str) -> Self {
    Self { lines: vec![format!("{summary}.")], _values: PhantomData }
  }

  fn expected(self, text: impl Into<String>, values: &[T]) -> Self {
    self.section("Expected", text.into(), values)
  }

  fn observed(self, text: impl Into<String>, values: &[T]) -> Self {
    self.section("Observed", text.into(), values)
  }

  fn section(mut self, label: &str, text: String, values: &[T]) -> Self {
    self.lines.push(format!("{label}: {text}"));
    self.lines.extend(values.iter().map(|v| format!(" * {v:?} ({})", type_name::<T>())));
    self
  }

  #[track_caller]
  fn raise(self) -> ! { panic!("{}", self.lines.join("\n")) }
}
