//! The error taxonomy crossing the cache boundary.
//!
//! Callers of the cache-backed client see exactly these kinds, so a UI can
//! distinguish "can't reach the network" from "can't read the local cache".
//! Layer-specific error types (reqwest, rusqlite) never leak past their
//! own crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Transport-level failure reaching an upstream endpoint. Transient:
  /// the client layer retries these with a bounded fixed backoff before
  /// letting them surface here.
  #[error("connection error: {0}")]
  Connection(String),

  /// Upstream was reachable but returned a semantically invalid or error
  /// payload. Permanent for the call; never retried.
  #[error("upstream response error: {0}")]
  Response(String),

  /// Any fault in the cache store's underlying engine.
  #[error("storage error: {0}")]
  Storage(String),

  /// No office key was passed and the instance has no configured default.
  #[error("office key not provided and no default configured")]
  MissingOfficeKey,

  /// The given office key is known neither to the cache nor upstream.
  #[error("unknown office key: {0}")]
  UnknownOffice(String),

  /// A caller handed an unusable URL to the client layer.
  #[error("invalid url: {0}")]
  InvalidUrl(String),
}

impl Error {
  /// Whether a retry at the client layer may help.
  pub fn is_transient(&self) -> bool {
    matches!(self, Error::Connection(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
