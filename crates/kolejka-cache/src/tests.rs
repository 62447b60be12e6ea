//! Protocol tests for `CachedClient` over a stub source and an in-memory
//! SQLite store.

use std::{
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU32, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, NaiveDateTime, Utc};
use kolejka_core::{
  Error,
  matter::{Matter, MatterWithSample},
  office::Office,
  sample::{Sample, TIME_FORMAT},
  source::QueueSource,
  store::{MatterId, OfficeId, QueueStore},
};
use kolejka_store_sqlite::SqliteStore;

use crate::CachedClient;

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn minute(s: &str) -> NaiveDateTime {
  NaiveDateTime::parse_from_str(s, TIME_FORMAT).unwrap()
}

fn office(key: &str, name: &str) -> Office {
  Office {
    key:  key.into(),
    name: name.into(),
  }
}

fn pair(name: &str, ordinal: Option<i64>, group_id: i64, time: &str) -> MatterWithSample {
  MatterWithSample {
    matter: Matter {
      name: name.into(),
      ordinal,
      group_id,
    },
    sample: Sample {
      time:           minute(time),
      queue_length:   4,
      open_counters:  2,
      current_number: "A017".into(),
    },
  }
}

// ─── Stub source ─────────────────────────────────────────────────────────────

/// Canned upstream: counts invocations, lets tests advance the response
/// timestamp between updates.
#[derive(Clone, Default)]
struct StubSource {
  inner: Arc<StubInner>,
}

#[derive(Default)]
struct StubInner {
  offices:      Mutex<Vec<Office>>,
  pairs:        Mutex<Vec<MatterWithSample>>,
  office_calls: AtomicU32,
  matter_calls: AtomicU32,
}

impl StubSource {
  fn new(offices: Vec<Office>, pairs: Vec<MatterWithSample>) -> Self {
    let stub = Self::default();
    *stub.inner.offices.lock().unwrap() = offices;
    *stub.inner.pairs.lock().unwrap() = pairs;
    stub
  }

  fn set_time(&self, time: &str) {
    let time = minute(time);
    for pair in self.inner.pairs.lock().unwrap().iter_mut() {
      pair.sample.time = time;
    }
  }

  fn office_calls(&self) -> u32 {
    self.inner.office_calls.load(Ordering::SeqCst)
  }

  fn matter_calls(&self) -> u32 {
    self.inner.matter_calls.load(Ordering::SeqCst)
  }
}

impl QueueSource for StubSource {
  async fn fetch_offices(&self) -> Result<Vec<Office>, Error> {
    self.inner.office_calls.fetch_add(1, Ordering::SeqCst);
    let offices = self.inner.offices.lock().unwrap().clone();
    Ok(offices)
  }

  async fn fetch_matters(&self, _office_key: &str) -> Result<Vec<MatterWithSample>, Error> {
    self.inner.matter_calls.fetch_add(1, Ordering::SeqCst);
    let pairs = self.inner.pairs.lock().unwrap().clone();
    Ok(pairs)
  }
}

// ─── Fault-injecting store ───────────────────────────────────────────────────

/// Delegates to a real `SqliteStore` but fails the next `insert_sample`
/// when armed, for exercising the collect-and-continue merge path.
#[derive(Clone)]
struct FlakyStore {
  inner:     SqliteStore,
  fail_next: Arc<AtomicBool>,
}

impl FlakyStore {
  fn new(inner: SqliteStore) -> Self {
    Self {
      inner,
      fail_next: Arc::new(AtomicBool::new(false)),
    }
  }

  fn fail_next_sample_insert(&self) {
    self.fail_next.store(true, Ordering::SeqCst);
  }
}

impl QueueStore for FlakyStore {
  type Error = kolejka_store_sqlite::Error;

  async fn lookup_office_id(&self, key: &str) -> Result<Option<OfficeId>, Self::Error> {
    self.inner.lookup_office_id(key).await
  }

  async fn lookup_matter_id(
    &self,
    ordinal: Option<i64>,
    group_id: i64,
    office: OfficeId,
  ) -> Result<Option<MatterId>, Self::Error> {
    self.inner.lookup_matter_id(ordinal, group_id, office).await
  }

  async fn sample_exists(
    &self,
    time: NaiveDateTime,
    matter: MatterId,
  ) -> Result<bool, Self::Error> {
    self.inner.sample_exists(time, matter).await
  }

  async fn insert_offices(&self, offices: &[Office]) -> Result<(), Self::Error> {
    self.inner.insert_offices(offices).await
  }

  async fn insert_matter(
    &self,
    office: OfficeId,
    matter: &Matter,
  ) -> Result<MatterId, Self::Error> {
    self.inner.insert_matter(office, matter).await
  }

  async fn insert_sample(&self, matter: MatterId, sample: &Sample) -> Result<(), Self::Error> {
    if self.fail_next.swap(false, Ordering::SeqCst) {
      return Err(kolejka_store_sqlite::Error::TimeParse(
        "injected sample-insert failure".into(),
      ));
    }
    self.inner.insert_sample(matter, sample).await
  }

  async fn list_offices(&self) -> Result<Vec<Office>, Self::Error> {
    self.inner.list_offices().await
  }

  async fn list_matters(&self, office: OfficeId) -> Result<Vec<Matter>, Self::Error> {
    self.inner.list_matters(office).await
  }

  async fn list_samples(&self, matter: MatterId) -> Result<Vec<Sample>, Self::Error> {
    self.inner.list_samples(matter).await
  }

  async fn seconds_since_fetch(
    &self,
    office: OfficeId,
    now: DateTime<Utc>,
  ) -> Result<Option<i64>, Self::Error> {
    self.inner.seconds_since_fetch(office, now).await
  }

  async fn mark_fetched(&self, office: OfficeId, at: DateTime<Utc>) -> Result<(), Self::Error> {
    self.inner.mark_fetched(office, at).await
  }

  async fn purge_stale_samples(&self, cutoff: NaiveDateTime) -> Result<usize, Self::Error> {
    self.inner.purge_stale_samples(cutoff).await
  }
}

// ─── Office list ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn office_list_fetches_once_then_serves_cache() {
  let stub = StubSource::new(vec![office("abc", "Urząd A")], vec![]);
  let store = SqliteStore::open_in_memory().await.unwrap();
  let client = CachedClient::new(stub.clone(), store);

  let first = client.office_list().await.unwrap();
  assert_eq!(first.len(), 1);
  assert_eq!(first[0].name, "Urząd A");
  assert_eq!(first[0].key, "abc");

  let second = client.office_list().await.unwrap();
  assert_eq!(second, first);
  assert_eq!(stub.office_calls(), 1);
}

#[tokio::test]
async fn empty_upstream_office_list_is_not_cached() {
  let stub = StubSource::new(vec![], vec![]);
  let store = SqliteStore::open_in_memory().await.unwrap();
  let client = CachedClient::new(stub.clone(), store);

  assert!(client.office_list().await.unwrap().is_empty());
  assert!(client.office_list().await.unwrap().is_empty());
  // Nothing worth caching, so every call goes back to the network.
  assert_eq!(stub.office_calls(), 2);
}

// ─── Office-key resolution ───────────────────────────────────────────────────

#[tokio::test]
async fn missing_office_key_fails_fast() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let client = CachedClient::new(StubSource::default(), store);

  assert!(matches!(
    client.update(None).await,
    Err(Error::MissingOfficeKey)
  ));
  assert!(matches!(
    client.matter_list(None).await,
    Err(Error::MissingOfficeKey)
  ));
}

#[tokio::test]
async fn explicit_key_overrides_the_instance_default() {
  let stub = StubSource::new(
    vec![office("abc", "Urząd A"), office("xyz", "Urząd B")],
    vec![pair("Paszporty", Some(1), 5, "2024-01-01 10:00")],
  );
  let store = SqliteStore::open_in_memory().await.unwrap();
  let client = CachedClient::new(stub, store)
    .with_cooldown(Duration::from_secs(60))
    .with_office_key("abc");

  client.update(Some("xyz")).await.unwrap();

  // The default office was never updated.
  assert!(client.matter_list(None).await.unwrap().is_empty());
  assert_eq!(client.matter_list(Some("xyz")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_office_key_fails_after_one_list_refresh() {
  let stub = StubSource::new(vec![office("abc", "Urząd A")], vec![]);
  let store = SqliteStore::open_in_memory().await.unwrap();
  let client = CachedClient::new(stub.clone(), store);

  match client.update(Some("ghost")).await {
    Err(Error::UnknownOffice(key)) => assert_eq!(key, "ghost"),
    other => panic!("expected unknown-office error, got {other:?}"),
  }
  assert_eq!(stub.office_calls(), 1);
  assert_eq!(stub.matter_calls(), 0);
}

// ─── Update protocol ─────────────────────────────────────────────────────────

#[tokio::test]
async fn update_is_idempotent_within_the_fetch_minute() {
  let stub = StubSource::new(
    vec![office("abc", "Urząd A")],
    vec![
      pair("Paszporty", Some(1), 5, "2024-01-01 10:00"),
      pair("Meldunki", None, 5, "2024-01-01 10:00"),
    ],
  );
  let store = SqliteStore::open_in_memory().await.unwrap();
  let client = CachedClient::new(stub.clone(), store).with_cooldown(Duration::ZERO);

  let first = client.update(Some("abc")).await.unwrap();
  assert!(first.fetched);
  assert_eq!(first.new_matters, 2);
  assert_eq!(first.new_samples, 2);
  assert!(first.failures.is_empty());

  // Cooldown elapsed, same response minute: refetch happens, nothing is
  // duplicated or overwritten.
  let second = client.update(Some("abc")).await.unwrap();
  assert!(second.fetched);
  assert_eq!(second.new_matters, 0);
  assert_eq!(second.new_samples, 0);

  assert_eq!(client.matter_list(Some("abc")).await.unwrap().len(), 2);
  assert_eq!(
    client.sample_list(Some("abc"), None, 5).await.unwrap().len(),
    1
  );
  assert_eq!(
    client
      .sample_list(Some("abc"), Some(1), 5)
      .await
      .unwrap()
      .len(),
    1
  );
}

#[tokio::test]
async fn advancing_response_minute_adds_one_sample_per_matter() {
  let stub = StubSource::new(
    vec![office("abc", "Urząd A")],
    vec![
      pair("Paszporty", Some(1), 5, "2024-01-01 10:00"),
      pair("Meldunki", None, 5, "2024-01-01 10:00"),
    ],
  );
  let store = SqliteStore::open_in_memory().await.unwrap();
  let client = CachedClient::new(stub.clone(), store).with_cooldown(Duration::ZERO);

  client.update(Some("abc")).await.unwrap();
  stub.set_time("2024-01-01 10:01");
  let outcome = client.update(Some("abc")).await.unwrap();

  assert_eq!(outcome.new_matters, 0);
  assert_eq!(outcome.new_samples, 2);

  let samples = client.sample_list(Some("abc"), None, 5).await.unwrap();
  assert_eq!(samples.len(), 2);
  assert!(samples[0].time < samples[1].time);
}

#[tokio::test]
async fn update_within_cooldown_skips_the_network() {
  let stub = StubSource::new(
    vec![office("abc", "Urząd A")],
    vec![pair("Paszporty", Some(1), 5, "2024-01-01 10:00")],
  );
  let store = SqliteStore::open_in_memory().await.unwrap();
  let client = CachedClient::new(stub.clone(), store.clone())
    .with_cooldown(Duration::from_secs(60));

  client.office_list().await.unwrap();
  let office_id = store.lookup_office_id("abc").await.unwrap().unwrap();
  store
    .mark_fetched(office_id, Utc::now() - chrono::Duration::seconds(30))
    .await
    .unwrap();

  let outcome = client.update(Some("abc")).await.unwrap();
  assert!(!outcome.fetched);
  assert_eq!(stub.matter_calls(), 0);
}

#[tokio::test]
async fn update_past_cooldown_fetches_exactly_once() {
  let stub = StubSource::new(
    vec![office("abc", "Urząd A")],
    vec![pair("Paszporty", Some(1), 5, "2024-01-01 10:00")],
  );
  let store = SqliteStore::open_in_memory().await.unwrap();
  let client = CachedClient::new(stub.clone(), store.clone())
    .with_cooldown(Duration::from_secs(60));

  client.office_list().await.unwrap();
  let office_id = store.lookup_office_id("abc").await.unwrap().unwrap();
  store
    .mark_fetched(office_id, Utc::now() - chrono::Duration::seconds(90))
    .await
    .unwrap();

  let outcome = client.update(Some("abc")).await.unwrap();
  assert!(outcome.fetched);
  assert_eq!(outcome.new_samples, 1);
  assert_eq!(stub.matter_calls(), 1);
}

#[tokio::test]
async fn merge_failure_of_one_matter_does_not_abort_the_batch() {
  let stub = StubSource::new(
    vec![office("abc", "Urząd A")],
    vec![
      pair("Paszporty", Some(1), 5, "2024-01-01 10:00"),
      pair("Meldunki", None, 5, "2024-01-01 10:00"),
    ],
  );
  let store = SqliteStore::open_in_memory().await.unwrap();
  let flaky = FlakyStore::new(store.clone());
  flaky.fail_next_sample_insert();
  let client = CachedClient::new(stub, flaky).with_cooldown(Duration::ZERO);

  let outcome = client.update(Some("abc")).await.unwrap();
  assert!(outcome.fetched);
  assert_eq!(outcome.failures.len(), 1);
  assert_eq!(outcome.failures[0].matter, "Paszporty");
  assert!(matches!(outcome.failures[0].error, Error::Storage(_)));

  // The failed pair's matter row landed before its sample insert blew
  // up, but only merges that completed are counted.
  assert_eq!(outcome.new_matters, 1);
  assert_eq!(outcome.new_samples, 1);
  assert_eq!(client.matter_list(Some("abc")).await.unwrap().len(), 2);
  assert_eq!(
    client.sample_list(Some("abc"), None, 5).await.unwrap().len(),
    1
  );
  assert!(
    client
      .sample_list(Some("abc"), Some(1), 5)
      .await
      .unwrap()
      .is_empty()
  );
}

#[tokio::test]
async fn matter_and_sample_reads_never_touch_the_network() {
  let stub = StubSource::new(vec![office("abc", "Urząd A")], vec![]);
  let store = SqliteStore::open_in_memory().await.unwrap();
  let client = CachedClient::new(stub.clone(), store);

  client.office_list().await.unwrap();
  assert!(client.matter_list(Some("abc")).await.unwrap().is_empty());
  assert!(
    client
      .sample_list(Some("abc"), Some(1), 5)
      .await
      .unwrap()
      .is_empty()
  );
  assert_eq!(stub.matter_calls(), 0);
}
