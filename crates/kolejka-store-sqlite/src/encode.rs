//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Sample times are stored at minute resolution (`YYYY-MM-DD HH:MM`, the
//! upstream's own format, lexicographically sortable). The fetch marker
//! is stored as an RFC 3339 UTC string.

use chrono::{DateTime, NaiveDateTime, Utc};
use kolejka_core::sample::TIME_FORMAT;

use crate::{Error, Result};

// ─── Minute-resolution sample time ───────────────────────────────────────────

pub fn encode_minute(t: NaiveDateTime) -> String {
  t.format(TIME_FORMAT).to_string()
}

pub fn decode_minute(s: &str) -> Result<NaiveDateTime> {
  NaiveDateTime::parse_from_str(s, TIME_FORMAT)
    .map_err(|e| Error::TimeParse(format!("{s:?}: {e}")))
}

// ─── Fetch-marker instant ────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::TimeParse(format!("{s:?}: {e}")))
}
