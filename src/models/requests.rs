//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CacheError, Result};

/// Request body for the PUT operation (POST /cache)
///
/// # Fields
/// - `Key`: The cache key to store the value under
/// - `Value`: Any JSON document, including `null`
#[derive(Debug, Clone, Deserialize)]
pub struct PutRequest {
    /// The cache key
    #[serde(rename = "Key")]
    pub key: String,
    /// The value to store
    #[serde(rename = "Value")]
    pub value: Value,
}

impl PutRequest {
    /// Parses and validates a raw request body.
    ///
    /// Any syntax error, missing field or empty key is `MalformedInput`.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let req: Self =
            serde_json::from_slice(body).map_err(|e| CacheError::MalformedInput(e.to_string()))?;

        if let Some(error_msg) = req.validate() {
            return Err(CacheError::MalformedInput(error_msg));
        }
        Ok(req)
    }

    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        None
    }
}
