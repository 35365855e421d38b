//! Blockchain.com BTC balance provider

use super::{build_client, get_text};
use crate::{
    constants::{BLOCKCHAIN_DOT_COM_API_URL, SATOSHIS_PER_BTC},
    error::ProviderError,
    provider::BalanceProvider,
    types::{Provider, Sample, TokenContract},
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;

/// Blockchain.com BTC balance provider
///
/// Uses the plain-text `q/addressbalance` query, which answers in satoshis.
pub struct BlockchainDotComProvider {
    client: Client,
    base_url: String,
}

impl BlockchainDotComProvider {
    /// Creates a new Blockchain.com provider
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client()?,
            base_url: BLOCKCHAIN_DOT_COM_API_URL.to_string(),
        })
    }

    fn parse_balance(response_text: &str) -> Result<f64, ProviderError> {
        let satoshis = response_text.trim().parse::<u64>().map_err(|e| {
            ProviderError::InvalidResponse(format!(
                "Failed to parse Blockchain.com balance: {}. Response: {}",
                e, response_text
            ))
        })?;
        Ok(satoshis as f64 / SATOSHIS_PER_BTC)
    }
}

#[async_trait]
impl BalanceProvider for BlockchainDotComProvider {
    async fn fetch_balance(
        &self,
        address: &str,
        contract: Option<&TokenContract>,
    ) -> Result<Sample, ProviderError> {
        if let Some(contract) = contract {
            return Err(ProviderError::UnsupportedAsset(contract.address.clone()));
        }

        let url = format!("{}/q/addressbalance/{}", self.base_url, address);
        let response_text = get_text(&self.client, &url).await?;
        let balance = Self::parse_balance(&response_text)?;

        Ok(Sample::new(balance, Utc::now().timestamp_millis()))
    }

    fn source(&self) -> Provider {
        Provider::BlockchainDotCom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_balance() {
        assert_eq!(
            BlockchainDotComProvider::parse_balance("123456789\n").unwrap(),
            1.23456789
        );
        assert!(BlockchainDotComProvider::parse_balance("error").is_err());
    }
}
