//! Constants for the reserve holdings aggregator
//!
//! Default cache lifetimes and upstream settings are centralized here.
//! `HoldingsConfig::default()` is built from these values.

use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);

/// On-chain reserve address list
pub const ADDRESSES_TTL: Duration = Duration::from_secs(5 * MINUTE.as_secs());

/// Reserve-native balance held by the custodian
pub const CUSTODY_BALANCE_TTL: Duration = Duration::from_secs(5 * MINUTE.as_secs());

/// Reserve-native balance locked in the on-chain reserve contract
pub const FROZEN_BALANCE_TTL: Duration = Duration::from_secs(5 * MINUTE.as_secs());

/// Reserve-native balance freely transferable in the on-chain reserve contract
pub const UNFROZEN_BALANCE_TTL: Duration = Duration::from_secs(2 * MINUTE.as_secs());

/// BTC, ETH and ERC-20 balances summed over the configured addresses
pub const EXTERNAL_BALANCE_TTL: Duration = Duration::from_secs(10 * MINUTE.as_secs());

/// cMCO2 balance held on the reserve chain
pub const CMCO2_BALANCE_TTL: Duration = Duration::from_secs(10 * MINUTE.as_secs());

/// Target allocation weights
pub const TARGET_ALLOCATIONS_TTL: Duration = Duration::from_secs(10 * MINUTE.as_secs());

/// USD exchange rates
pub const EXCHANGE_RATE_TTL: Duration = MINUTE;

/// Upper bound on a single upstream call before it is treated as failed (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Environment variable overriding `REQUEST_TIMEOUT_SECS`
pub const REQUEST_TIMEOUT_ENV: &str = "RESERVE_REQUEST_TIMEOUT_SECS";

/// Satoshis per bitcoin
pub const SATOSHIS_PER_BTC: f64 = 100_000_000.0;

/// Blockstream Esplora API base URL
pub const BLOCKSTREAM_API_URL: &str = "https://blockstream.info/api";

/// Blockchain.com query API base URL
pub const BLOCKCHAIN_DOT_COM_API_URL: &str = "https://blockchain.info";

/// Coinbase exchange rates endpoint
pub const COINBASE_EXCHANGE_RATES_URL: &str = "https://api.coinbase.com/v2/exchange-rates";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "reserve-holdings/0.1.0";
