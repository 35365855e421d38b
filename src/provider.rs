//! Provider capabilities the aggregator consumes, and the boundary that turns
//! their failures into error sentinels

use crate::{
    error::ProviderError,
    types::{Allocation, Provider, ProviderSource, ReserveCrypto, Sample, Token, TokenContract},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Reserve-native quantities read from the reserve chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReserveBalance {
    /// Held by the custodian
    Custody,
    /// Locked in the reserve contract
    Frozen,
    /// Liquid in the reserve contract
    Unfrozen,
    /// cMCO2 held by the reserve
    Cmco2,
}

/// Reserve chain node (balances, reserve addresses, target allocations)
#[async_trait]
pub trait ReserveProvider: Send + Sync {
    /// Fetches one reserve balance, in token units
    async fn fetch_balance(&self, balance: ReserveBalance) -> Result<Sample, ProviderError>;

    /// Fetches the reserve addresses registered on-chain
    async fn fetch_addresses(&self) -> Result<Sample<Vec<ReserveCrypto>>, ProviderError>;

    /// Fetches the target allocation weights
    async fn fetch_target_allocations(&self) -> Result<Sample<Vec<Allocation>>, ProviderError>;

    /// Returns the provider reported as source
    fn source(&self) -> Provider;
}

/// Per-address balance lookup on an external chain
///
/// Implementations can read BTC from Blockstream or Blockchain.com, ETH and
/// ERC-20 tokens from Etherscan or Ethplorer, etc.
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    /// Fetches the balance held by `address`, in whole coins
    ///
    /// # Arguments
    /// * `address` - Address to read
    /// * `contract` - ERC-20 contract, or `None` for the chain's native coin
    async fn fetch_balance(
        &self,
        address: &str,
        contract: Option<&TokenContract>,
    ) -> Result<Sample, ProviderError>;

    /// Returns the provider reported as source
    fn source(&self) -> Provider;
}

/// USD exchange rate lookup
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches the USD price of one unit of `token`
    async fn fetch_rate(&self, token: Token) -> Result<Sample, ProviderError>;

    /// Returns the provider reported as source
    fn source(&self) -> Provider;
}

/// Two independent providers for the same quantity
///
/// The primary is preferred whenever it succeeds.
pub struct SourcePair<P: ?Sized> {
    pub primary: Arc<P>,
    pub secondary: Arc<P>,
}

impl<P: ?Sized> SourcePair<P> {
    pub fn new(primary: Arc<P>, secondary: Arc<P>) -> Self {
        Self { primary, secondary }
    }
}

impl<P: ?Sized> Clone for SourcePair<P> {
    fn clone(&self) -> Self {
        Self {
            primary: self.primary.clone(),
            secondary: self.secondary.clone(),
        }
    }
}

/// Runs one provider call and settles it into a [`ProviderSource`]
///
/// Errors and calls exceeding `timeout` become the error sentinel for `source`.
pub async fn settle<T, Fut>(source: Provider, timeout: Duration, fetch: Fut) -> ProviderSource<T>
where
    T: Default,
    Fut: Future<Output = Result<Sample<T>, ProviderError>>,
{
    let result = match tokio::time::timeout(timeout, fetch).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout),
    };

    match result {
        Ok(sample) => ProviderSource::from_sample(source, sample),
        Err(e) => {
            tracing::warn!(source = %source, error = %e, "Provider fetch failed");
            ProviderSource::failed(source)
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Timestamp of the recorded reserve fixtures
    pub const FIXTURE_TIME: i64 = 1_587_686_400_000;

    /// Mock reserve chain node
    pub struct MockReserve {
        balances: Mutex<HashMap<ReserveBalance, Option<f64>>>,
        addresses: Mutex<Option<Vec<ReserveCrypto>>>,
        allocations: Mutex<Option<Vec<Allocation>>>,
        call_count: Mutex<usize>,
    }

    impl Default for MockReserve {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockReserve {
        pub fn new() -> Self {
            Self {
                balances: Mutex::new(HashMap::new()),
                addresses: Mutex::new(Some(Vec::new())),
                allocations: Mutex::new(None),
                call_count: Mutex::new(0),
            }
        }

        /// Reserve node returning the recorded fixture balances
        pub fn recorded() -> Self {
            let reserve = Self::new();
            reserve.set_balance(ReserveBalance::Frozen, 41_313_868.613_138_68);
            reserve.set_balance(ReserveBalance::Unfrozen, 75_330_631.078_194_35);
            reserve.set_balance(ReserveBalance::Custody, 2_944_998.249_217_374_7);
            reserve.set_balance(ReserveBalance::Cmco2, 1_000.0);
            reserve
        }

        pub fn set_balance(&self, balance: ReserveBalance, value: f64) {
            self.balances.lock().unwrap().insert(balance, Some(value));
        }

        pub fn set_balance_error(&self, balance: ReserveBalance) {
            self.balances.lock().unwrap().insert(balance, None);
        }

        pub fn set_addresses(&self, addresses: Option<Vec<ReserveCrypto>>) {
            *self.addresses.lock().unwrap() = addresses;
        }

        pub fn set_allocations(&self, allocations: Vec<Allocation>) {
            *self.allocations.lock().unwrap() = Some(allocations);
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl ReserveProvider for MockReserve {
        async fn fetch_balance(&self, balance: ReserveBalance) -> Result<Sample, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            match self.balances.lock().unwrap().get(&balance) {
                Some(Some(value)) => Ok(Sample::new(*value, FIXTURE_TIME)),
                Some(None) => Err(ProviderError::ApiError("mock failure".to_string())),
                None => Err(ProviderError::UnsupportedAsset(format!("{:?}", balance))),
            }
        }

        async fn fetch_addresses(&self) -> Result<Sample<Vec<ReserveCrypto>>, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            self.addresses
                .lock()
                .unwrap()
                .clone()
                .map(|addresses| Sample::new(addresses, FIXTURE_TIME))
                .ok_or_else(|| ProviderError::ApiError("mock failure".to_string()))
        }

        async fn fetch_target_allocations(
            &self,
        ) -> Result<Sample<Vec<Allocation>>, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            self.allocations
                .lock()
                .unwrap()
                .clone()
                .map(|allocations| Sample::new(allocations, FIXTURE_TIME))
                .ok_or_else(|| ProviderError::ApiError("mock failure".to_string()))
        }

        fn source(&self) -> Provider {
            Provider::Forno
        }
    }

    /// Mock per-address balance provider
    ///
    /// Balances are keyed by address and, for ERC-20 lookups, contract address.
    pub struct MockBalances {
        source: Provider,
        balances: Mutex<HashMap<(Option<String>, String), Option<Sample>>>,
        delay: Mutex<Duration>,
        call_count: Mutex<usize>,
    }

    impl MockBalances {
        pub fn new(source: Provider) -> Self {
            Self {
                source,
                balances: Mutex::new(HashMap::new()),
                delay: Mutex::new(Duration::ZERO),
                call_count: Mutex::new(0),
            }
        }

        pub fn set_balance(&self, address: &str, value: f64, time: i64) {
            self.balances
                .lock()
                .unwrap()
                .insert((None, address.to_string()), Some(Sample::new(value, time)));
        }

        pub fn set_token_balance(&self, contract: &str, address: &str, value: f64, time: i64) {
            self.balances.lock().unwrap().insert(
                (Some(contract.to_string()), address.to_string()),
                Some(Sample::new(value, time)),
            );
        }

        pub fn set_error(&self, address: &str) {
            self.balances
                .lock()
                .unwrap()
                .insert((None, address.to_string()), None);
        }

        /// Delays every response
        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = delay;
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl BalanceProvider for MockBalances {
        async fn fetch_balance(
            &self,
            address: &str,
            contract: Option<&TokenContract>,
        ) -> Result<Sample, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            let delay = *self.delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let key = (
                contract.map(|contract| contract.address.clone()),
                address.to_string(),
            );
            let entry = self.balances.lock().unwrap().get(&key).cloned();
            match entry {
                Some(Some(sample)) => Ok(sample),
                Some(None) => Err(ProviderError::ApiError("mock failure".to_string())),
                None => Err(ProviderError::InvalidResponse(format!(
                    "unknown address {}",
                    address
                ))),
            }
        }

        fn source(&self) -> Provider {
            self.source
        }
    }

    /// Mock exchange rate provider
    pub struct MockRates {
        source: Provider,
        rates: Mutex<HashMap<Token, f64>>,
        call_count: Mutex<usize>,
    }

    impl MockRates {
        pub fn new(source: Provider) -> Self {
            Self {
                source,
                rates: Mutex::new(HashMap::new()),
                call_count: Mutex::new(0),
            }
        }

        pub fn set_rate(&self, token: Token, rate: f64) {
            self.rates.lock().unwrap().insert(token, rate);
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl RateProvider for MockRates {
        async fn fetch_rate(&self, token: Token) -> Result<Sample, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            self.rates
                .lock()
                .unwrap()
                .get(&token)
                .map(|rate| Sample::new(*rate, FIXTURE_TIME))
                .ok_or_else(|| ProviderError::UnsupportedAsset(token.symbol().to_string()))
        }

        fn source(&self) -> Provider {
            self.source
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settle_wraps_success() {
        let source = settle(Provider::Blockstream, Duration::from_secs(1), async {
            Ok(Sample::new(0.5, 1_000))
        })
        .await;
        assert_eq!(source, ProviderSource::ok(0.5, Provider::Blockstream, 1_000));
    }

    #[tokio::test]
    async fn test_settle_turns_error_into_sentinel() {
        let source: ProviderSource = settle(Provider::Etherscan, Duration::from_secs(1), async {
            Err(ProviderError::RateLimitExceeded)
        })
        .await;
        assert_eq!(source, ProviderSource::failed(Provider::Etherscan));
    }

    #[tokio::test]
    async fn test_settle_times_out_hanging_call() {
        let source: ProviderSource =
            settle(Provider::Ethplorer, Duration::from_millis(10), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Sample::new(1.0, 1_000))
            })
            .await;
        assert!(source.has_error);
        assert_eq!(source.time, 0);
    }
}
