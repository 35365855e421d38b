//! Error types for the reserve holdings aggregator

use crate::types::Token;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur when a single upstream provider is queried
///
/// These never leave the provider boundary: `provider::settle` turns them into
/// the error sentinel [`ProviderSource`](crate::types::ProviderSource).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Asset not supported by this provider
    #[error("Asset not supported: {0}")]
    UnsupportedAsset(String),

    /// Provider API error
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

/// Errors returned by [`CacheStore::get_or_save`](crate::cache::CacheStore::get_or_save)
///
/// Cloneable so every caller sharing one in-flight computation receives it.
#[derive(Debug, Error, Clone)]
pub enum CacheError {
    /// The compute function for `key` failed; nothing was stored
    #[error("Computing cache entry {key} failed: {source}")]
    Compute {
        key: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// The entry for `key` holds a value of a different type
    #[error("Cache entry {key} holds a different type")]
    TypeMismatch { key: String },

    /// The compute function for `key` panicked; nothing was stored
    #[error("Computing cache entry {key} panicked")]
    Panicked { key: String },
}

impl CacheError {
    /// Creates a Compute error
    pub fn compute(
        key: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Compute {
            key: key.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a TypeMismatch error
    pub fn type_mismatch(key: impl Into<String>) -> Self {
        Self::TypeMismatch { key: key.into() }
    }

    /// Creates a Panicked error
    pub fn panicked(key: impl Into<String>) -> Self {
        Self::Panicked { key: key.into() }
    }
}

/// Failure of a whole holdings group (the candle group or the other-assets group)
#[derive(Debug, Error, Clone)]
pub enum HoldingsError {
    /// A cached quantity could not be produced
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// No ERC-20 contract is configured for the token
    #[error("No token contract configured for {token}")]
    MissingContract { token: Token },

    /// No addresses are configured for the token
    #[error("No addresses configured for {token}")]
    NoAddresses { token: Token },
}
