//! Runtime configuration for the holdings aggregator

use crate::{
    constants::{
        ADDRESSES_TTL, CMCO2_BALANCE_TTL, CUSTODY_BALANCE_TTL, EXCHANGE_RATE_TTL,
        EXTERNAL_BALANCE_TTL, FROZEN_BALANCE_TTL, REQUEST_TIMEOUT_ENV, REQUEST_TIMEOUT_SECS,
        TARGET_ALLOCATIONS_TTL, UNFROZEN_BALANCE_TTL,
    },
    types::ReserveCrypto,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long each cached quantity stays fresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtls {
    pub addresses: Duration,
    pub custody_balance: Duration,
    pub frozen_balance: Duration,
    pub unfrozen_balance: Duration,
    /// BTC, ETH and ERC-20 balances
    pub external_balance: Duration,
    pub cmco2_balance: Duration,
    pub target_allocations: Duration,
    pub exchange_rate: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            addresses: ADDRESSES_TTL,
            custody_balance: CUSTODY_BALANCE_TTL,
            frozen_balance: FROZEN_BALANCE_TTL,
            unfrozen_balance: UNFROZEN_BALANCE_TTL,
            external_balance: EXTERNAL_BALANCE_TTL,
            cmco2_balance: CMCO2_BALANCE_TTL,
            target_allocations: TARGET_ALLOCATIONS_TTL,
            exchange_rate: EXCHANGE_RATE_TTL,
        }
    }
}

/// Aggregator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldingsConfig {
    pub ttls: CacheTtls,
    /// Upper bound on every individual provider call
    pub request_timeout: Duration,
    /// Statically configured reserve addresses, merged with the on-chain list
    pub addresses: Vec<ReserveCrypto>,
}

impl Default for HoldingsConfig {
    fn default() -> Self {
        Self {
            ttls: CacheTtls::default(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            addresses: Vec::new(),
        }
    }
}

impl HoldingsConfig {
    /// Default configuration with the static address list
    pub fn with_addresses(addresses: Vec<ReserveCrypto>) -> Self {
        Self {
            addresses,
            ..Self::default()
        }
    }

    /// Default configuration, with the request timeout overridable through
    /// `RESERVE_REQUEST_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(REQUEST_TIMEOUT_ENV) {
            match raw.parse::<u64>() {
                Ok(secs) => config.request_timeout = Duration::from_secs(secs),
                Err(e) => tracing::warn!(
                    value = %raw,
                    error = %e,
                    "Ignoring invalid {}", REQUEST_TIMEOUT_ENV
                ),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Token;

    #[test]
    fn test_default_ttls() {
        let ttls = CacheTtls::default();
        assert_eq!(ttls.addresses, Duration::from_secs(300));
        assert_eq!(ttls.custody_balance, Duration::from_secs(300));
        assert_eq!(ttls.frozen_balance, Duration::from_secs(300));
        assert_eq!(ttls.unfrozen_balance, Duration::from_secs(120));
        assert_eq!(ttls.external_balance, Duration::from_secs(600));
        assert_eq!(ttls.target_allocations, Duration::from_secs(600));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: HoldingsConfig = serde_json::from_value(serde_json::json!({
            "request_timeout": { "secs": 3, "nanos": 0 },
            "addresses": [{
                "token": "DAI",
                "label": "Dai",
                "addresses": ["0xabc"],
                "tokenAddress": "0x6b175474e89094c44da98b954eedeac495271d0f",
                "decimals": 18
            }]
        }))
        .unwrap();

        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.ttls, CacheTtls::default());
        assert_eq!(config.addresses[0].token, Token::DAI);
        assert_eq!(config.addresses[0].contract().unwrap().decimals, 18);
    }
}
