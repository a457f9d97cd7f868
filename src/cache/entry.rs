//! Per-profile cache slots for the function listing.

use chrono::{DateTime, TimeZone, Utc};
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::warn;

use super::storage::KeyValueStore;
use crate::lambda::types::{FunctionCollection, FunctionRecord};

/// Storage keys for one profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheKeys {
  /// Serialized function collection
  pub functions: String,
  /// Epoch milliseconds of the last complete fetch
  pub last_fetch: String,
}

impl CacheKeys {
  pub fn for_profile(profile: &str) -> Self {
    let functions = format!("lambdas-{}", profile);
    Self {
      last_fetch: format!("{}-last-fetch", functions),
      functions,
    }
  }
}

/// The cached listing of one profile.
///
/// Reads never fail: anything missing or unreadable is treated as an empty
/// cache. Writes replace a slot wholesale.
pub struct CacheEntry<S: KeyValueStore> {
  storage: Arc<S>,
  keys: CacheKeys,
}

impl<S: KeyValueStore> CacheEntry<S> {
  pub fn new(storage: Arc<S>, profile: &str) -> Self {
    Self {
      storage,
      keys: CacheKeys::for_profile(profile),
    }
  }

  /// Load the cached collection, empty if absent or malformed.
  pub fn load_functions(&self) -> FunctionCollection {
    match self.storage.get(&self.keys.functions) {
      Ok(Some(raw)) => decode_functions(&raw),
      Ok(None) => Vec::new(),
      Err(e) => {
        warn!(key = %self.keys.functions, error = %e, "failed to read cached functions");
        Vec::new()
      }
    }
  }

  /// Replace the cached collection.
  pub fn store_functions(&self, functions: &[FunctionRecord]) -> Result<()> {
    let raw = serde_json::to_string(functions)
      .map_err(|e| eyre!("Failed to serialize functions: {}", e))?;
    self.storage.set(&self.keys.functions, &raw)
  }

  /// When the last complete fetch finished, if known.
  pub fn last_fetch(&self) -> Option<DateTime<Utc>> {
    match self.storage.get(&self.keys.last_fetch) {
      Ok(Some(raw)) => decode_timestamp(&raw),
      Ok(None) => None,
      Err(e) => {
        warn!(key = %self.keys.last_fetch, error = %e, "failed to read last fetch time");
        None
      }
    }
  }

  pub fn set_last_fetch(&self, at: DateTime<Utc>) -> Result<()> {
    self
      .storage
      .set(&self.keys.last_fetch, &at.timestamp_millis().to_string())
  }
}

impl<S: KeyValueStore> Clone for CacheEntry<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      keys: self.keys.clone(),
    }
  }
}

fn decode_functions(raw: &str) -> FunctionCollection {
  if raw.trim().is_empty() {
    return Vec::new();
  }
  match serde_json::from_str(raw) {
    Ok(functions) => functions,
    Err(e) => {
      warn!(error = %e, "ignoring malformed cached functions");
      Vec::new()
    }
  }
}

fn decode_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  let millis: i64 = raw.trim().parse().ok()?;
  Utc.timestamp_millis_opt(millis).single()
}
