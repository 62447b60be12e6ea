//! Error type for `kolejka-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("timestamp parse error: {0}")]
  TimeParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
