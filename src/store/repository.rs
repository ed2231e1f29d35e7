//! Cache Store Module
//!
//! Upsert, point lookup and bulk clear against the `cache` table.

use std::path::Path;

use rusqlite::{params, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::store::{CacheEntry, ConnectionPool, PoolOptions};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cache (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    key        TEXT    NOT NULL UNIQUE,
    value      TEXT    NOT NULL CHECK (json_valid(value)),
    created_at TEXT    NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
);
CREATE INDEX IF NOT EXISTS idx_cache_key ON cache (key);
";

// The update set names only `value`, so `id` and `created_at` survive overwrites.
const UPSERT: &str = "
INSERT INTO cache (key, value) VALUES (?1, ?2)
ON CONFLICT (key) DO UPDATE SET value = excluded.value
";

const SELECT_VALUE: &str = "SELECT value FROM cache WHERE key = ?1";

const SELECT_ENTRY: &str = "SELECT id, key, value, created_at FROM cache WHERE key = ?1";

const DELETE_ALL: &str = "DELETE FROM cache";

// == Cache Store ==
/// Handle to the persistent cache table.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Clone)]
pub struct CacheStore {
    pool: ConnectionPool,
}

impl CacheStore {
    // == Constructors ==
    /// Opens the store described by `config` and ensures the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        Self::open_path(&config.database_path, PoolOptions::from_config(config)).await
    }

    /// Opens the store at `path` with explicit pool options.
    pub async fn open_path(path: impl AsRef<Path>, options: PoolOptions) -> Result<Self> {
        Self::with_pool(ConnectionPool::new(path, options)).await
    }

    /// Wraps an existing pool and ensures the schema exists.
    pub async fn with_pool(pool: ConnectionPool) -> Result<Self> {
        pool.run(|conn| conn.execute_batch(SCHEMA)).await?;
        info!("Cache schema ready");
        Ok(Self { pool })
    }

    // == Put ==
    /// Inserts `value` under `key`, or replaces the value of an existing row.
    ///
    /// Runs as a single upsert statement, so concurrent puts on the same key
    /// never race into a duplicate-key error.
    pub async fn put(&self, key: &str, value: &Value) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::MalformedInput("key cannot be empty".to_string()));
        }

        let key = key.to_string();
        let document = serde_json::to_string(value)
            .map_err(|e| CacheError::MalformedInput(e.to_string()))?;

        self.pool
            .run(move |conn| conn.execute(UPSERT, params![key, document]))
            .await?;
        Ok(())
    }

    // == Get ==
    /// Looks up the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let lookup = key.to_string();
        let raw: Option<String> = self
            .pool
            .run(move |conn| {
                conn.query_row(SELECT_VALUE, params![lookup], |row| row.get(0))
                    .optional()
            })
            .await?;

        match raw {
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
                CacheError::StoreError(format!("stored value for '{key}' is not JSON: {e}"))
            }),
            None => {
                debug!("Cache miss for key '{}'", key);
                Ok(None)
            }
        }
    }

    // == Entry ==
    /// Reads the full row for `key`, including its creation time.
    pub async fn entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let key = key.to_string();
        self.pool
            .run(move |conn| {
                conn.query_row(SELECT_ENTRY, params![key], CacheEntry::from_row)
                    .optional()
            })
            .await
    }

    // == Clear ==
    /// Removes every row. Returns the number of rows deleted.
    pub async fn clear(&self) -> Result<usize> {
        let removed = self.pool.run(|conn| conn.execute(DELETE_ALL, [])).await?;
        info!("Cleared cache table: {} rows removed", removed);
        Ok(removed)
    }

    // == Ping ==
    /// Round-trips a trivial query to confirm the store is reachable.
    pub async fn ping(&self) -> Result<()> {
        self.pool
            .run(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .await?;
        Ok(())
    }

    /// The connection pool backing this store.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}
