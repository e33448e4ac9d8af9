//! Integration tests for rxlive
//!
//! Exercises operator chains end to end, on virtual time and on a real
//! delivery loop.

use std::{sync::Arc, thread, time::Instant};

use rxlive::{executor, prelude::*};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

#[rxlive::test]
fn search_box_pipeline(scheduler: TestScheduler) {
  init_tracing();
  let query = MutableLiveData::new();
  let searches = query
    .throttle_with_timeout(Duration::from_millis(300), scheduler.clone())
    .filter(|q: &String| q.len() >= 3)
    .map(|q| q.to_uppercase())
    .test();

  let keystrokes =
    [("r", 50), ("ru", 50), ("rus", 50), ("rust", 400), ("rustl", 100), ("rus", 400)];
  for (typed, pause) in keystrokes {
    query.set_value(typed.to_owned());
    scheduler.advance_by(Duration::from_millis(pause));
  }

  searches.assert_values(&["RUST".to_owned(), "RUS".to_owned()]);
}

#[rxlive::test]
fn form_validation_with_defaults() {
  let name = MutableLiveData::<String>::new();
  let age = MutableLiveData::<u32>::new();
  let valid = name
    .combine_latest_with(&age, |name, age| {
      name.is_some_and(|n| !n.is_empty()) && age.is_some_and(|a| a >= 18)
    })
    .default_if_empty(false)
    .test();

  name.set_value("Ada".to_owned());
  age.set_value(12);
  age.set_value(36);
  name.set_value(String::new());

  valid.assert_values(&[false, false, false, true, false]);
}

#[rxlive::test]
fn running_totals_per_group() {
  let amounts = MutableLiveData::new();
  let by_sign = amounts.group_by(|amount: &i64| amount.is_negative());
  let debits = by_sign.get(&true).reduce(|a, b| a + b).test();
  let credits = by_sign.get(&false).reduce(|a, b| a + b).test();

  for amount in [100, -30, 50, -20, 10] {
    amounts.set_value(amount);
  }

  credits.assert_values(&[100, 150, 160]);
  debits.assert_values(&[-30, -50]);
}

#[rxlive::test]
fn switching_between_tickers(scheduler: TestScheduler) {
  let fast = LiveData::interval(Duration::from_millis(10), scheduler.clone()).map(|i| ("fast", i));
  let slow = LiveData::interval(Duration::from_millis(100), scheduler.clone()).map(|i| ("slow", i));
  let selected = MutableLiveData::new();
  let c_fast = fast.clone();
  let ticks = selected
    .switch_map(move |use_fast: bool| if use_fast { c_fast.clone() } else { slow.clone() })
    .test();

  selected.set_value(true);
  scheduler.advance_by(Duration::from_millis(25));
  selected.set_value(false);
  scheduler.advance_by(Duration::from_millis(100));

  ticks.assert_values(&[("fast", 0), ("fast", 1), ("slow", 0)]);
  assert!(!fast.has_observers());
}

#[rxlive::test]
fn merged_delays_release_in_time_order(scheduler: TestScheduler) {
  let first = MutableLiveData::with_value("first");
  let second = MutableLiveData::with_value("second");
  let merged = first
    .delay_start(Duration::from_secs(2), scheduler.clone())
    .merge(&second.delay_start(Duration::from_secs(1), scheduler.clone()))
    .test();

  scheduler.advance_by(Duration::from_secs(2));
  merged.assert_values(&["second", "first"]);
}

#[rxlive::test]
fn unobserved_chain_stops_its_timers(scheduler: TestScheduler) {
  let ticks =
    LiveData::interval(Duration::from_millis(10), scheduler.clone()).filter(|i| i % 2 == 0);

  let guard = ticks.observe(|_: usize| {});
  scheduler.advance_by(Duration::from_millis(35));
  guard.unsubscribe();

  scheduler.flush();
  assert!(scheduler.is_empty());
  assert_eq!(ticks.value(), Some(2));
}

#[test]
fn real_time_interval_on_a_main_loop() {
  init_tracing();
  let main_loop = Arc::new(MainLoop::new());
  main_loop.attach_current_thread();
  let _guard = executor::set_thread_executor(main_loop.clone());

  let ticks = LiveData::interval(Duration::from_millis(5), ThreadScheduler).test();
  let deadline = Instant::now() + Duration::from_secs(5);
  while ticks.value_count() < 3 && Instant::now() < deadline {
    main_loop.run_pending();
    thread::sleep(Duration::from_millis(1));
  }

  assert_eq!(ticks.values()[..3], [0, 1, 2]);
}

#[test]
fn worker_threads_post_into_the_main_loop() {
  let main_loop = Arc::new(MainLoop::new());
  main_loop.attach_current_thread();
  let _guard = executor::set_thread_executor(main_loop.clone());

  let inputs: Vec<_> = (0..4).map(|_| MutableLiveData::<usize>::new()).collect();
  let latest = LiveData::combine_latest_all(&inputs).test();

  let workers: Vec<_> = inputs
    .iter()
    .enumerate()
    .map(|(i, input)| {
      let (input, main_loop) = (input.clone(), main_loop.clone());
      thread::spawn(move || {
        let _guard = executor::set_thread_executor(main_loop);
        input.post_value(i * 10);
      })
    })
    .collect();
  for worker in workers {
    worker.join().unwrap();
  }

  assert_eq!(main_loop.run_pending(), 4);
  latest.assert_value_count(4);
  latest.assert_latest_value(&vec![Some(0), Some(10), Some(20), Some(30)]);
}
