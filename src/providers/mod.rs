//! HTTP provider implementations

pub mod blockchain_dot_com;
pub mod blockstream;
pub mod coinbase;

pub use blockchain_dot_com::BlockchainDotComProvider;
pub use blockstream::BlockstreamProvider;
pub use coinbase::CoinbaseProvider;

use crate::{
    constants::{REQUEST_TIMEOUT_SECS, USER_AGENT},
    error::ProviderError,
};
use reqwest::{Client, Response};
use std::time::Duration;

/// Builds the HTTP client shared by a provider's requests
fn build_client() -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(ProviderError::NetworkError)
}

/// Sends a GET request and returns the body of a successful response
async fn get_text(client: &Client, url: &str) -> Result<String, ProviderError> {
    tracing::debug!(url, "Sending provider request");

    let response: Response = client
        .get(url)
        .send()
        .await
        .map_err(ProviderError::NetworkError)?;

    // Check for rate limiting
    if response.status().as_u16() == 429 {
        return Err(ProviderError::RateLimitExceeded);
    }

    // Check for other errors
    if !response.status().is_success() {
        return Err(ProviderError::ApiError(format!(
            "HTTP {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        )));
    }

    response.text().await.map_err(ProviderError::NetworkError)
}
