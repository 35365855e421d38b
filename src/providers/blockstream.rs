//! Blockstream Esplora BTC balance provider

use super::{build_client, get_text};
use crate::{
    constants::{BLOCKSTREAM_API_URL, SATOSHIS_PER_BTC},
    error::ProviderError,
    provider::BalanceProvider,
    types::{Provider, Sample, TokenContract},
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

/// Esplora `/address/{address}` response
#[derive(Debug, Deserialize)]
struct AddressResponse {
    chain_stats: TxoStats,
}

#[derive(Debug, Deserialize)]
struct TxoStats {
    funded_txo_sum: u64,
    spent_txo_sum: u64,
}

/// Blockstream BTC balance provider
pub struct BlockstreamProvider {
    client: Client,
    base_url: String,
}

impl BlockstreamProvider {
    /// Creates a new Blockstream provider
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(BLOCKSTREAM_API_URL)
    }

    /// Creates a provider against another Esplora instance
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.into(),
        })
    }

    /// Parses the confirmed balance, in BTC, out of an address response
    fn parse_balance(response_text: &str) -> Result<f64, ProviderError> {
        let response: AddressResponse = serde_json::from_str(response_text).map_err(|e| {
            ProviderError::InvalidResponse(format!(
                "Failed to parse Blockstream response: {}. Response: {}",
                e, response_text
            ))
        })?;

        let stats = response.chain_stats;
        let satoshis = stats.funded_txo_sum.saturating_sub(stats.spent_txo_sum);
        Ok(satoshis as f64 / SATOSHIS_PER_BTC)
    }
}

#[async_trait]
impl BalanceProvider for BlockstreamProvider {
    async fn fetch_balance(
        &self,
        address: &str,
        contract: Option<&TokenContract>,
    ) -> Result<Sample, ProviderError> {
        if let Some(contract) = contract {
            return Err(ProviderError::UnsupportedAsset(contract.address.clone()));
        }

        let url = format!("{}/address/{}", self.base_url, address);
        let response_text = get_text(&self.client, &url).await?;
        let balance = Self::parse_balance(&response_text)?;

        Ok(Sample::new(balance, Utc::now().timestamp_millis()))
    }

    fn source(&self) -> Provider {
        Provider::Blockstream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_balance() {
        let body = r#"{
            "address": "bc1qexample",
            "chain_stats": {
                "funded_txo_count": 3,
                "funded_txo_sum": 250000000,
                "spent_txo_count": 1,
                "spent_txo_sum": 50000000,
                "tx_count": 4
            },
            "mempool_stats": {
                "funded_txo_count": 0,
                "funded_txo_sum": 0,
                "spent_txo_count": 0,
                "spent_txo_sum": 0,
                "tx_count": 0
            }
        }"#;
        assert_eq!(BlockstreamProvider::parse_balance(body).unwrap(), 2.0);
    }

    #[test]
    fn test_parse_balance_rejects_garbage() {
        let result = BlockstreamProvider::parse_balance("Invalid Bitcoin address");
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }
}
