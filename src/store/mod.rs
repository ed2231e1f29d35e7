//! Store Module
//!
//! SQLite-backed persistence for the cache table: a bounded connection pool
//! and the upsert/lookup/clear operations on top of it.

mod entry;
mod pool;
mod repository;


// Re-export public types
pub use entry::{parse_timestamp, CacheEntry, TIMESTAMP_FORMAT};
pub use pool::{ConnectionPool, PoolOptions, PooledConnection};
pub use repository::CacheStore;
