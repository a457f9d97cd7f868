//! Local cache for the function listing.
//!
//! This module provides:
//! - A key-value storage trait with SQLite and no-op backends
//! - Per-profile cache slots holding the last complete listing and the time
//!   it was fetched
//! - Lenient reads: a missing or malformed payload is an empty cache

mod entry;
mod storage;

pub use entry::CacheEntry;
pub use storage::{KeyValueStore, NoopStorage, SqliteStorage};

#[cfg(test)]
pub use storage::testing;
