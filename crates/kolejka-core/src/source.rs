//! The `QueueSource` trait — the upstream fetch capability.
//!
//! Implemented by the real HTTP client in `kolejka-client`; the cache
//! layer composes a source rather than extending one, so tests can
//! substitute a stub returning canned payloads.

use std::future::Future;

use crate::{error::Error, matter::MatterWithSample, office::Office};

/// Read access to the upstream queue-status API.
pub trait QueueSource: Send + Sync {
  /// Fetch the global office list.
  fn fetch_offices(
    &self,
  ) -> impl Future<Output = Result<Vec<Office>, Error>> + Send + '_;

  /// Fetch every matter of an office together with its current sample.
  ///
  /// The upstream response is atomic: one call yields all matters, each
  /// carrying exactly one sample stamped with the response timestamp.
  fn fetch_matters<'a>(
    &'a self,
    office_key: &'a str,
  ) -> impl Future<Output = Result<Vec<MatterWithSample>, Error>> + Send + 'a;
}
