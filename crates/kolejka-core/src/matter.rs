//! Matter — an administrative service/queue category within an office.

use serde::{Deserialize, Serialize};

use crate::sample::Sample;

/// One administrative matter (queue category) offered by an office.
///
/// `(ordinal, group_id)` identifies a matter within its office. `ordinal`
/// is genuinely optional upstream — some matters carry none — and the
/// absent-ordinal bucket is distinct from every numbered one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matter {
  pub name:     String,
  pub ordinal:  Option<i64>,
  pub group_id: i64,
}

/// A matter paired with its current queue sample, exactly as one upstream
/// fetch yields it. There is no way to fetch matters and samples
/// independently from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatterWithSample {
  pub matter: Matter,
  pub sample: Sample,
}
