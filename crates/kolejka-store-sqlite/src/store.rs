//! [`SqliteStore`] — the SQLite implementation of [`QueueStore`].

use std::path::Path;

use chrono::{DateTime, Duration, Local, NaiveDateTime, Utc};
use rusqlite::OptionalExtension as _;

use kolejka_core::{
  matter::Matter,
  office::Office,
  sample::Sample,
  store::{MatterId, OfficeId, QueueStore},
};

use crate::{
  Error, Result,
  encode::{decode_dt, decode_minute, encode_dt, encode_minute},
  schema::SCHEMA,
};

/// How long a sample stays interesting before the store purges it.
const SAMPLE_RETENTION_HOURS: i64 = 1;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A queue-status cache backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Every
/// operation runs as its own `call` on the connection's worker thread, so
/// each call is its own transactional scope: implicit per-statement
/// commits for single writes, an explicit [`rusqlite::Transaction`] for
/// batches.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`, run schema initialisation, and
  /// purge samples older than the retention window.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::initialize(conn).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::initialize(conn).await
  }

  /// Idempotent schema init plus opportunistic retention pass. Safe to
  /// run against an already-populated file.
  async fn initialize(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self { conn };
    store
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;

    // Sample times are Warsaw local time as reported upstream, so the
    // cutoff is computed against the local wall clock, not UTC.
    let cutoff = Local::now().naive_local() - Duration::hours(SAMPLE_RETENTION_HOURS);
    store.purge_stale_samples(cutoff).await?;
    Ok(store)
  }
}

// ─── QueueStore impl ─────────────────────────────────────────────────────────

impl QueueStore for SqliteStore {
  type Error = Error;

  // ── Point lookups ─────────────────────────────────────────────────────

  async fn lookup_office_id(&self, key: &str) -> Result<Option<OfficeId>> {
    let key = key.to_owned();
    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id FROM offices WHERE key = ?1",
              rusqlite::params![key],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(id.map(OfficeId))
  }

  async fn lookup_matter_id(
    &self,
    ordinal: Option<i64>,
    group_id: i64,
    office: OfficeId,
  ) -> Result<Option<MatterId>> {
    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        // Two-branch lookup: `ordinal = NULL` would never match, and the
        // absent-ordinal bucket must compare as its own value.
        let row = match ordinal {
          Some(ordinal) => conn
            .query_row(
              "SELECT id FROM matters
               WHERE ordinal = ?1 AND group_id = ?2 AND office_id = ?3",
              rusqlite::params![ordinal, group_id, office.0],
              |row| row.get(0),
            )
            .optional()?,
          None => conn
            .query_row(
              "SELECT id FROM matters
               WHERE ordinal IS NULL AND group_id = ?1 AND office_id = ?2",
              rusqlite::params![group_id, office.0],
              |row| row.get(0),
            )
            .optional()?,
        };
        Ok(row)
      })
      .await?;
    Ok(id.map(MatterId))
  }

  async fn sample_exists(&self, time: NaiveDateTime, matter: MatterId) -> Result<bool> {
    let time_str = encode_minute(time);
    let exists: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM samples WHERE time = ?1 AND matter_id = ?2",
              rusqlite::params![time_str, matter.0],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }

  // ── Writes ────────────────────────────────────────────────────────────

  async fn insert_offices(&self, offices: &[Office]) -> Result<()> {
    let offices = offices.to_vec();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt =
            tx.prepare("INSERT INTO offices (name, key) VALUES (?1, ?2)")?;
          for office in &offices {
            stmt.execute(rusqlite::params![office.name, office.key])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn insert_matter(&self, office: OfficeId, matter: &Matter) -> Result<MatterId> {
    let matter = matter.clone();
    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO matters (name, ordinal, group_id, office_id)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![matter.name, matter.ordinal, matter.group_id, office.0],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(MatterId(id))
  }

  async fn insert_sample(&self, matter: MatterId, sample: &Sample) -> Result<()> {
    let time_str = encode_minute(sample.time);
    let sample = sample.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO samples (time, matter_id, open_counters, queue_length, current_number)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            time_str,
            matter.0,
            sample.open_counters,
            sample.queue_length,
            sample.current_number,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Materialized reads ────────────────────────────────────────────────

  async fn list_offices(&self) -> Result<Vec<Office>> {
    let offices = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT name, key FROM offices ORDER BY name")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Office {
              name: row.get(0)?,
              key:  row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(offices)
  }

  async fn list_matters(&self, office: OfficeId) -> Result<Vec<Matter>> {
    let matters = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT name, ordinal, group_id FROM matters
           WHERE office_id = ?1 ORDER BY name",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![office.0], |row| {
            Ok(Matter {
              name:     row.get(0)?,
              ordinal:  row.get(1)?,
              group_id: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(matters)
  }

  async fn list_samples(&self, matter: MatterId) -> Result<Vec<Sample>> {
    let raws: Vec<(String, i64, i64, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT time, open_counters, queue_length, current_number
           FROM samples WHERE matter_id = ?1 ORDER BY time",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![matter.0], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(time, open_counters, queue_length, current_number)| {
        Ok(Sample {
          time: decode_minute(&time)?,
          queue_length,
          open_counters,
          current_number,
        })
      })
      .collect()
  }

  // ── Fetch marker ──────────────────────────────────────────────────────

  async fn seconds_since_fetch(
    &self,
    office: OfficeId,
    now: DateTime<Utc>,
  ) -> Result<Option<i64>> {
    let marker: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT time FROM last_connection WHERE office_id = ?1",
              rusqlite::params![office.0],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    marker
      .map(|s| Ok((now - decode_dt(&s)?).num_seconds()))
      .transpose()
  }

  async fn mark_fetched(&self, office: OfficeId, at: DateTime<Utc>) -> Result<()> {
    let at_str = encode_dt(at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO last_connection (office_id, time) VALUES (?1, ?2)
           ON CONFLICT (office_id) DO UPDATE SET time = excluded.time",
          rusqlite::params![office.0, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Retention ─────────────────────────────────────────────────────────

  async fn purge_stale_samples(&self, cutoff: NaiveDateTime) -> Result<usize> {
    let cutoff_str = encode_minute(cutoff);
    let purged = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM samples WHERE DATETIME(time) < DATETIME(?1)",
          rusqlite::params![cutoff_str],
        )?)
      })
      .await?;
    Ok(purged)
  }
}
