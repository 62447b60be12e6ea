//! Core types and trait definitions for the kolejka queue-status cache.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod error;
pub mod matter;
pub mod office;
pub mod sample;
pub mod source;
pub mod store;

pub use error::{Error, Result};
pub use matter::{Matter, MatterWithSample};
pub use office::Office;
pub use sample::Sample;
pub use source::QueueSource;
pub use store::{MatterId, OfficeId, QueueStore};
