//! Cache-backed access to the queue-status API.
//!
//! [`CachedClient`] composes a [`QueueSource`] (the network) with a
//! [`QueueStore`] (the local database) and implements cache-aside with a
//! cooldown gate: reads come from the store, the network is consulted
//! only on a cold office list or an explicit [`CachedClient::update`],
//! and updates within the cooldown window are served from cache without
//! touching the network at all.

use std::time::Duration;

use chrono::Utc;
use kolejka_core::{
  Error, Result,
  matter::{Matter, MatterWithSample},
  office::Office,
  sample::Sample,
  source::QueueSource,
  store::{MatterId, OfficeId, QueueStore},
};
use tracing::{debug, warn};

#[cfg(test)]
mod tests;

/// Minimum interval between permitted network refreshes per office.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Shorter cooldowns are accepted but hammer the upstream.
const MIN_RECOMMENDED_COOLDOWN: Duration = Duration::from_secs(30);

// ─── Update outcome ──────────────────────────────────────────────────────────

/// What an [`CachedClient::update`] call did.
#[derive(Debug, Default)]
pub struct UpdateOutcome {
  /// Whether the network was consulted (false: cooldown gate held).
  pub fetched:     bool,
  /// Matters seen for the first time and inserted.
  pub new_matters: usize,
  /// Samples inserted (same-minute re-fetches are skipped, not counted).
  pub new_samples: usize,
  /// Per-matter merge failures; the batch continues past them.
  pub failures:    Vec<MatterFailure>,
}

/// One matter whose merge failed during an update.
#[derive(Debug)]
pub struct MatterFailure {
  pub matter: String,
  pub error:  Error,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Cache-backed queue-status client.
///
/// Holds an instance-scoped default office key: operations taking
/// `Option<&str>` fall back to it when handed `None`, and fail with
/// [`Error::MissingOfficeKey`] when neither is set. This is per-instance
/// convenience state, nothing global.
pub struct CachedClient<S, T> {
  source:     S,
  store:      T,
  office_key: Option<String>,
  cooldown:   Duration,
}

impl<S: QueueSource, T: QueueStore> CachedClient<S, T> {
  pub fn new(source: S, store: T) -> Self {
    Self {
      source,
      store,
      office_key: None,
      cooldown: DEFAULT_COOLDOWN,
    }
  }

  /// Override the refresh cooldown. Values below 30 s are accepted with
  /// a warning.
  pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
    if cooldown < MIN_RECOMMENDED_COOLDOWN {
      warn!(
        cooldown_secs = cooldown.as_secs(),
        "cooldown below the recommended minimum of {} s",
        MIN_RECOMMENDED_COOLDOWN.as_secs()
      );
    }
    self.cooldown = cooldown;
    self
  }

  /// Set the default office key at construction time.
  pub fn with_office_key(mut self, key: impl Into<String>) -> Self {
    self.office_key = Some(key.into());
    self
  }

  /// The instance's current default office key.
  pub fn office_key(&self) -> Option<&str> {
    self.office_key.as_deref()
  }

  /// Replace the default office key.
  pub fn set_office_key(&mut self, key: impl Into<String>) {
    self.office_key = Some(key.into());
  }

  fn resolve_key<'a>(&'a self, key: Option<&'a str>) -> Result<&'a str> {
    key
      .or(self.office_key.as_deref())
      .ok_or(Error::MissingOfficeKey)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The office list, name-ordered. Served from cache when populated;
  /// fetched, persisted and re-read otherwise. The list is assumed
  /// globally stable, so one successful fetch lasts the cache's life.
  pub async fn office_list(&self) -> Result<Vec<Office>> {
    let cached = self.store.list_offices().await.map_err(storage)?;
    if !cached.is_empty() {
      debug!(count = cached.len(), "office list served from cache");
      return Ok(cached);
    }

    let fetched = self.source.fetch_offices().await?;
    if fetched.is_empty() {
      return Ok(fetched);
    }
    self.store.insert_offices(&fetched).await.map_err(storage)?;
    self.store.list_offices().await.map_err(storage)
  }

  /// Cached matters of an office, name-ordered. Never touches the
  /// network: only [`CachedClient::update`] populates matters, so an
  /// empty result may simply mean "not updated yet".
  pub async fn matter_list(&self, office_key: Option<&str>) -> Result<Vec<Matter>> {
    let key = self.resolve_key(office_key)?;
    match self.store.lookup_office_id(key).await.map_err(storage)? {
      Some(office) => self.store.list_matters(office).await.map_err(storage),
      None => Ok(Vec::new()),
    }
  }

  /// Cached samples of one matter, time-ascending. Never touches the
  /// network; unknown office or matter yields an empty list.
  pub async fn sample_list(
    &self,
    office_key: Option<&str>,
    ordinal: Option<i64>,
    group_id: i64,
  ) -> Result<Vec<Sample>> {
    let key = self.resolve_key(office_key)?;
    let Some(office) = self.store.lookup_office_id(key).await.map_err(storage)? else {
      return Ok(Vec::new());
    };
    let Some(matter) = self
      .store
      .lookup_matter_id(ordinal, group_id, office)
      .await
      .map_err(storage)?
    else {
      return Ok(Vec::new());
    };
    self.store.list_samples(matter).await.map_err(storage)
  }

  // ── Refresh ───────────────────────────────────────────────────────────

  /// Refresh an office's matters and samples, unless its last refresh is
  /// still within the cooldown window.
  ///
  /// One network call fetches every matter with its current sample; the
  /// fetch marker is rewritten exactly once per successful call. Each
  /// pair is then merged: the matter resolved by
  /// `(ordinal, group_id, office)` (inserted on first encounter) and the
  /// sample inserted unless its `(time, matter)` key already exists, so
  /// re-fetching within the same minute never duplicates rows. A single
  /// pair's failure is recorded in the outcome and the batch continues.
  pub async fn update(&self, office_key: Option<&str>) -> Result<UpdateOutcome> {
    let key = self.resolve_key(office_key)?;
    let office = self.office_id(key).await?;

    let now = Utc::now();
    let elapsed = self
      .store
      .seconds_since_fetch(office, now)
      .await
      .map_err(storage)?;
    if let Some(elapsed) = elapsed
      && elapsed < self.cooldown.as_secs() as i64
    {
      debug!(office_key = key, elapsed, "within cooldown, skipping refresh");
      return Ok(UpdateOutcome::default());
    }

    let pairs = self.source.fetch_matters(key).await?;
    // Marked before the merge: a partially failed merge still counts as
    // a refresh for cooldown purposes.
    self.store.mark_fetched(office, now).await.map_err(storage)?;

    let mut outcome = UpdateOutcome {
      fetched: true,
      ..UpdateOutcome::default()
    };
    for pair in &pairs {
      match self.merge_pair(office, pair).await {
        Ok((new_matter, new_sample)) => {
          outcome.new_matters += new_matter as usize;
          outcome.new_samples += new_sample as usize;
        }
        Err(error) => {
          warn!(matter = %pair.matter.name, %error, "failed to merge matter, continuing");
          outcome.failures.push(MatterFailure {
            matter: pair.matter.name.clone(),
            error,
          });
        }
      }
    }

    debug!(
      office_key = key,
      new_matters = outcome.new_matters,
      new_samples = outcome.new_samples,
      failures = outcome.failures.len(),
      "refresh complete"
    );
    Ok(outcome)
  }

  /// Resolve one fetched pair against the store. Returns which of the
  /// matter and the sample were actually inserted.
  async fn merge_pair(&self, office: OfficeId, pair: &MatterWithSample) -> Result<(bool, bool)> {
    let matter = &pair.matter;
    let existing: Option<MatterId> = self
      .store
      .lookup_matter_id(matter.ordinal, matter.group_id, office)
      .await
      .map_err(storage)?;
    let (matter_id, new_matter) = match existing {
      Some(id) => (id, false),
      None => {
        let id = self
          .store
          .insert_matter(office, matter)
          .await
          .map_err(storage)?;
        (id, true)
      }
    };

    if self
      .store
      .sample_exists(pair.sample.time, matter_id)
      .await
      .map_err(storage)?
    {
      return Ok((new_matter, false));
    }
    self
      .store
      .insert_sample(matter_id, &pair.sample)
      .await
      .map_err(storage)?;
    Ok((new_matter, true))
  }

  /// Resolve an office key to its id, refreshing the office list once if
  /// the store has never seen the key.
  async fn office_id(&self, key: &str) -> Result<OfficeId> {
    if let Some(id) = self.store.lookup_office_id(key).await.map_err(storage)? {
      return Ok(id);
    }
    self.office_list().await?;
    self
      .store
      .lookup_office_id(key)
      .await
      .map_err(storage)?
      .ok_or_else(|| Error::UnknownOffice(key.to_owned()))
  }
}

/// Storage faults cross the cache boundary as the single `Storage` kind;
/// engine-specific error types stay inside the store crate.
fn storage<E: std::error::Error>(e: E) -> Error {
  Error::Storage(e.to_string())
}
