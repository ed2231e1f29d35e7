//! SQL Cache - A thin HTTP key/value cache over a SQLite table
//!
//! Values are arbitrary JSON documents persisted with upsert semantics.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use api::AppState;
pub use config::Config;
pub use store::CacheStore;
