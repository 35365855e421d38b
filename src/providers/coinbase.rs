//! Coinbase exchange rate provider

use super::{build_client, get_text};
use crate::{
    constants::COINBASE_EXCHANGE_RATES_URL,
    error::ProviderError,
    provider::RateProvider,
    types::{Provider, Sample, Token},
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

/// Coinbase `/v2/exchange-rates` response
#[derive(Debug, Deserialize)]
struct ExchangeRatesResponse {
    data: ExchangeRates,
}

#[derive(Debug, Deserialize)]
struct ExchangeRates {
    rates: HashMap<String, String>,
}

/// Coinbase exchange rate provider
pub struct CoinbaseProvider {
    client: Client,
}

impl CoinbaseProvider {
    /// Creates a new Coinbase provider
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client()?,
        })
    }

    /// Get the Coinbase currency code for a token
    fn currency(token: Token) -> Option<&'static str> {
        match token {
            Token::BTC => Some("BTC"),
            Token::ETH => Some("ETH"),
            Token::DAI => Some("DAI"),
            Token::USDC => Some("USDC"),
            Token::CANDLE | Token::CMCO2 => None,
        }
    }

    fn parse_usd_rate(response_text: &str) -> Result<f64, ProviderError> {
        let response: ExchangeRatesResponse =
            serde_json::from_str(response_text).map_err(|e| {
                ProviderError::InvalidResponse(format!(
                    "Failed to parse Coinbase response: {}. Response: {}",
                    e, response_text
                ))
            })?;

        let usd = response
            .data
            .rates
            .get("USD")
            .ok_or_else(|| ProviderError::InvalidResponse("No USD rate returned".to_string()))?;

        usd.parse::<f64>()
            .map_err(|e| ProviderError::InvalidResponse(format!("Invalid USD rate {}: {}", usd, e)))
    }
}

#[async_trait]
impl RateProvider for CoinbaseProvider {
    async fn fetch_rate(&self, token: Token) -> Result<Sample, ProviderError> {
        let currency = Self::currency(token)
            .ok_or_else(|| ProviderError::UnsupportedAsset(token.symbol().to_string()))?;

        let url = format!("{}?currency={}", COINBASE_EXCHANGE_RATES_URL, currency);
        let response_text = get_text(&self.client, &url).await?;
        let rate = Self::parse_usd_rate(&response_text)?;

        Ok(Sample::new(rate, Utc::now().timestamp_millis()))
    }

    fn source(&self) -> Provider {
        Provider::Coinbase
    }
}
