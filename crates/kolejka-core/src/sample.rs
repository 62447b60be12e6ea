//! Sample — one timestamped observation of a matter's queue state.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Minute-resolution timestamp format used across the store and the
/// upstream payload (`YYYY-MM-DD HH:MM`).
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A single observation of a matter's queue.
///
/// `time` is minute resolution: two fetches within the same minute refer
/// to the same sample, and the cache skips the rewrite rather than
/// double-counting. Samples older than one hour are purged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
  /// Observation time, minute resolution, Warsaw local time as reported
  /// upstream.
  pub time:           NaiveDateTime,
  /// Number of people currently waiting.
  pub queue_length:   i64,
  /// Number of currently staffed counters.
  pub open_counters:  i64,
  /// The ticket number currently being served.
  pub current_number: String,
}
