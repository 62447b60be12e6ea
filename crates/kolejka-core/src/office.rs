//! Office — a municipal service point.
//!
//! The stable external handle is `key` (an opaque identifier scraped from
//! the upstream office list). Surrogate row ids are store-internal and
//! never cross the cache boundary.

use serde::{Deserialize, Serialize};

/// A municipal office offering queued administrative services.
///
/// Offices are created when first observed in a fetched office list and
/// are never mutated or deleted by the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
  /// External stable identifier; globally unique.
  pub key:  String,
  /// Display name.
  pub name: String,
}
