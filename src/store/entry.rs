//! Cache Entry Module
//!
//! Defines the row type persisted in the cache table.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use serde_json::Value;

/// Storage format of `created_at`, as written by the column default.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// == Cache Entry ==
/// A single row of the cache table.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Surrogate row id, stable across overwrites
    pub id: i64,
    /// Unique lookup key
    pub key: String,
    /// Stored JSON document
    pub value: Value,
    /// Time of the first insert for this key (UTC)
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Row Mapping ==
    /// Builds an entry from a `SELECT id, key, value, created_at` row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let raw_value: String = row.get(2)?;
        let value = serde_json::from_str(&raw_value)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

        let raw_created: String = row.get(3)?;
        let created_at = parse_timestamp(&raw_created)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

        Ok(Self {
            id: row.get(0)?,
            key: row.get(1)?,
            value,
            created_at,
        })
    }
}

/// Parses a stored `created_at` value as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let naive = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)?;
    Ok(Utc.from_utc_datetime(&naive))
}
