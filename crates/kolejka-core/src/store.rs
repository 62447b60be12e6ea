//! The `QueueStore` trait and the surrogate-id newtypes.
//!
//! The trait is implemented by storage backends (e.g.
//! `kolejka-store-sqlite`). The cache layer depends on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{matter::Matter, office::Office, sample::Sample};

// ─── Surrogate ids ───────────────────────────────────────────────────────────

/// Store-assigned office row id. Never exposed across the cache boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OfficeId(pub i64);

/// Store-assigned matter row id. Never exposed across the cache boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatterId(pub i64);

impl std::fmt::Display for OfficeId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.0.fmt(f)
  }
}

impl std::fmt::Display for MatterId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.0.fmt(f)
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the durable cache store.
///
/// Every operation acquires its own transactional scope and releases it
/// before returning (commit on normal return, rollback on error), so a
/// failed call never leaves partial writes behind. Reads that legitimately
/// find nothing return `None`/empty collections, never an error — absence
/// is a normal outcome, distinct from a storage failure.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded tokio runtime.
pub trait QueueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Point lookups ─────────────────────────────────────────────────────

  /// Resolve an office key to its surrogate id.
  fn lookup_office_id<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<OfficeId>, Self::Error>> + Send + 'a;

  /// Resolve a matter by `(ordinal, group_id, office)`.
  ///
  /// An absent ordinal matches only other absent-ordinal matters in the
  /// same group and office; implementations must branch rather than rely
  /// on SQL `NULL = NULL` semantics.
  fn lookup_matter_id(
    &self,
    ordinal: Option<i64>,
    group_id: i64,
    office: OfficeId,
  ) -> impl Future<Output = Result<Option<MatterId>, Self::Error>> + Send + '_;

  /// Whether a sample with this `(time, matter)` key is already stored.
  fn sample_exists(
    &self,
    time: NaiveDateTime,
    matter: MatterId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert a batch of offices atomically: either all rows land or none.
  fn insert_offices<'a>(
    &'a self,
    offices: &'a [Office],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Insert one matter and return its newly assigned id.
  fn insert_matter<'a>(
    &'a self,
    office: OfficeId,
    matter: &'a Matter,
  ) -> impl Future<Output = Result<MatterId, Self::Error>> + Send + 'a;

  /// Insert one sample for an existing matter.
  fn insert_sample<'a>(
    &'a self,
    matter: MatterId,
    sample: &'a Sample,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Materialized reads ────────────────────────────────────────────────

  /// All cached offices, ordered by name.
  fn list_offices(
    &self,
  ) -> impl Future<Output = Result<Vec<Office>, Self::Error>> + Send + '_;

  /// All cached matters for an office, ordered by name.
  fn list_matters(
    &self,
    office: OfficeId,
  ) -> impl Future<Output = Result<Vec<Matter>, Self::Error>> + Send + '_;

  /// All cached samples for a matter, ordered by time ascending.
  fn list_samples(
    &self,
    matter: MatterId,
  ) -> impl Future<Output = Result<Vec<Sample>, Self::Error>> + Send + '_;

  // ── Fetch marker ──────────────────────────────────────────────────────

  /// Seconds elapsed between the office's last successful network refresh
  /// and `now`. `None` means the office has never been fetched.
  fn seconds_since_fetch(
    &self,
    office: OfficeId,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + '_;

  /// Record a successful network refresh at instant `at`, replacing any
  /// previous marker for the office.
  fn mark_fetched(
    &self,
    office: OfficeId,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Retention ─────────────────────────────────────────────────────────

  /// Delete samples observed before `cutoff`; returns how many rows went.
  fn purge_stale_samples(
    &self,
    cutoff: NaiveDateTime,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
