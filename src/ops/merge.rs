use crate::{live_data::LiveData, mediator::MediatorLiveData};

impl<T: Clone + Send + 'static> LiveData<T> {
  /// Republishes every value of `self` and `other` in the order they
  /// arrive.
  pub fn merge(&self, other: &LiveData<T>) -> LiveData<T> { Self::merge_all([self, other]) }

  /// Republishes every value of every holder in `sources`.
  ///
  /// # Panics
  ///
  /// Panics if the same holder appears twice in `sources`.
  pub fn merge_all<I>(sources: I) -> LiveData<T>
  where
    I: IntoIterator,
    I::Item: AsRef<LiveData<T>>,
  {
    let result = MediatorLiveData::new();
    for source in sources {
      result.add_direct_source(source.as_ref());
    }
    result.into_live_data()
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[rxlive_macro::test]
  fn merge2() {
    let source1 = MutableLiveData::new();
    let source2 = MutableLiveData::new();
    let observer = source1.merge(&source2).test();

    source1.post_value("text1");
    source2.post_value("text2");
    source1.post_value("text3");
    source2.post_value("text4");

    observer.assert_values(&["text1", "text2", "text3", "text4"]);
  }

  #[rxlive_macro::test]
  fn merge_many() {
    let sources: Vec<_> = (0..4).map(|_| MutableLiveData::<String>::new()).collect();
    let observer = LiveData::merge_all(&sources).test();

    for round in 0..2 {
      for (i, source) in sources.iter().enumerate() {
        source.post_value(format!("text{}", round * 4 + i + 1));
      }
    }

    let expected: Vec<_> = (1..=8).map(|i| format!("text{i}")).collect();
    observer.assert_values(&expected);
  }

  #[rxlive_macro::test]
  #[should_panic(expected = "this source was already added to the mediator")]
  fn merging_a_holder_with_itself_panics() {
    let source = MutableLiveData::<i32>::new();
    source.merge(&source);
  }
}
