//! Key-value storage trait and SQLite implementation.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Trait for cache storage backends.
pub trait KeyValueStore: Send + Sync {
  /// Get the value stored under `key`.
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Store `value` under `key`, replacing any previous value.
  fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl KeyValueStore for NoopStorage {
  fn get(&self, _key: &str) -> Result<Option<String>> {
    Ok(None) // Always miss
  }

  fn set(&self, _key: &str, _value: &str) -> Result<()> {
    Ok(()) // Discard
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Create a new SQLite storage at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    Self::open_at(&path)
  }

  /// Open or create the cache database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;
    Self::with_connection(conn)
  }

  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<std::path::PathBuf> {
    Ok(crate::config::data_dir()?.join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl KeyValueStore for SqliteStorage {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM kv_cache WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache key {}: {}", key, e))
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_cache (key, value, written_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write cache key {}: {}", key, e))?;

    Ok(())
  }
}

/// In-memory storage for tests, with a write log.
#[cfg(test)]
pub mod testing {
  use super::*;
  use std::collections::HashMap;

  #[derive(Default)]
  pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<String>>,
  }

  impl MemoryStorage {
    /// Insert a value without recording a write
    pub fn seed(&self, key: &str, value: &str) {
      self
        .values
        .lock()
        .unwrap()
        .insert(key.to_string(), value.to_string());
    }

    /// Keys written so far, in order
    pub fn writes(&self) -> Vec<String> {
      self.writes.lock().unwrap().clone()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
      self.values.lock().unwrap().get(key).cloned()
    }
  }

  impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
      Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
      self.writes.lock().unwrap().push(key.to_string());
      self
        .values
        .lock()
        .unwrap()
        .insert(key.to_string(), value.to_string());
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sqlite_get_missing() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    assert_eq!(storage.get("lambdas-default").unwrap(), None);
  }

  #[test]
  fn test_sqlite_set_overwrites() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.set("lambdas-default", "[]").unwrap();
    storage.set("lambdas-default", "[1]").unwrap();
    assert_eq!(
      storage.get("lambdas-default").unwrap().as_deref(),
      Some("[1]")
    );
  }

  #[test]
  fn test_sqlite_keys_are_independent() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.set("lambdas-dev", "dev").unwrap();
    storage.set("lambdas-prod", "prod").unwrap();
    assert_eq!(storage.get("lambdas-dev").unwrap().as_deref(), Some("dev"));
    assert_eq!(storage.get("lambdas-prod").unwrap().as_deref(), Some("prod"));
  }

  #[test]
  fn test_noop_storage_always_misses() {
    let storage = NoopStorage;
    storage.set("k", "v").unwrap();
    assert_eq!(storage.get("k").unwrap(), None);
  }
}
