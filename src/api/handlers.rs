//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{CacheError, Result};
use crate::models::{HealthResponse, PutRequest};
use crate::store::CacheStore;

/// Application state shared across all handlers.
///
/// Holds the store handle; the connection pool inside it is the only
/// resource requests share.
#[derive(Clone)]
pub struct AppState {
    /// Persistent cache table
    pub store: CacheStore,
}

impl AppState {
    /// Creates a new AppState around an opened store.
    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    /// Opens the store described by the configuration.
    pub async fn from_config(config: &crate::config::Config) -> Result<Self> {
        let store = CacheStore::open(config).await?;
        Ok(Self::new(store))
    }
}

/// Logs a failed operation at a level matching its severity.
fn log_failure(operation: &str, err: &CacheError) {
    match err {
        CacheError::NotFound(_) | CacheError::MalformedInput(_) => {
            debug!("{} rejected: {}", operation, err)
        }
        // Transient; the caller is expected to retry
        _ if err.is_retryable() => warn!("{} failed: {}", operation, err),
        _ => error!("{} failed: {}", operation, err),
    }
}

/// Handler for POST /cache
///
/// Upserts `Value` under `Key`. The body is parsed by hand so that every
/// malformed payload maps to 400, whatever its content type.
pub async fn put_handler(State(state): State<AppState>, body: Bytes) -> Result<StatusCode> {
    let result = async {
        let req = PutRequest::from_slice(&body)?;
        state.store.put(&req.key, &req.value).await
    }
    .await;

    match result {
        Ok(()) => Ok(StatusCode::OK),
        Err(err) => {
            log_failure("PUT", &err);
            Err(err)
        }
    }
}

/// Handler for GET /cache/:key
///
/// Returns the stored JSON document as the response body.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>> {
    let result = match state.store.get(&key).await {
        Ok(Some(value)) => Ok(Json(value)),
        Ok(None) => Err(CacheError::NotFound(key)),
        Err(err) => Err(err),
    };

    if let Err(err) = &result {
        log_failure("GET", err);
    }
    result
}

/// Handler for DELETE /cache
///
/// Removes every entry.
pub async fn clear_handler(State(state): State<AppState>) -> Result<StatusCode> {
    match state.store.clear().await {
        Ok(_) => Ok(StatusCode::OK),
        Err(err) => {
            log_failure("CLEAR", &err);
            Err(err)
        }
    }
}

/// Handler for GET /health
///
/// Reports healthy only while the store answers queries.
pub async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    state.store.ping().await.map_err(|err| {
        log_failure("HEALTH", &err);
        CacheError::StoreUnavailable(err.to_string())
    })?;

    Ok(Json(HealthResponse::healthy()))
}
