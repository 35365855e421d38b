//! Holdings aggregator
//!
//! Fans out to every tracked quantity through the cache and the dual-source
//! reconciler, prices the results and assembles the published snapshot.
//!
//! ```text
//! HoldingsService::holdings()
//!     ↓ (concurrently)
//! holdings_candle()              holdings_other()
//!     ↓                              ↓
//! CacheStore::get_or_save  (one key per quantity, TTL from CacheTtls)
//!     ↓                              ↓
//! settle(reserve node)           duel(primary, secondary) per address → sum_merge
//! ```
//!
//! Individual provider failures only degrade the affected [`TokenModel`]. A
//! group fails as a whole only on misconfiguration or a failed cache
//! computation, and then the other group is still returned.

use crate::{
    cache::CacheStore,
    config::HoldingsConfig,
    duel::{duel, sum_all},
    error::HoldingsError,
    provider::{settle, BalanceProvider, RateProvider, ReserveBalance, ReserveProvider, SourcePair},
    summary::{find_oldest_value_updated_at, sum_liquid_holdings, sum_total_holdings},
    types::{
        Allocation, CandleHoldings, Duel, HoldingsApi, ProviderSource, ReserveCrypto, Token,
        TokenContract, TokenModel,
    },
};
use futures::future::join_all;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

/// Upstream capabilities the aggregator reads from
pub struct HoldingsProviders {
    /// Reserve chain node
    pub reserve: Arc<dyn ReserveProvider>,
    /// BTC address balances
    pub btc: SourcePair<dyn BalanceProvider>,
    /// ETH and ERC-20 address balances
    pub ethereum: SourcePair<dyn BalanceProvider>,
    /// USD exchange rates
    pub rates: SourcePair<dyn RateProvider>,
}

/// Outcome of one aggregation, one result per holdings group
#[derive(Debug, Clone)]
pub struct Holdings {
    pub candle: Result<CandleHoldings, HoldingsError>,
    pub other_assets: Result<Vec<TokenModel>, HoldingsError>,
}

impl Holdings {
    /// True when both groups were assembled
    pub fn is_complete(&self) -> bool {
        self.candle.is_ok() && self.other_assets.is_ok()
    }

    /// The full snapshot, if both groups were assembled
    pub fn snapshot(&self) -> Option<HoldingsApi> {
        Some(HoldingsApi {
            candle: self.candle.as_ref().ok()?.clone(),
            other_assets: self.other_assets.as_ref().ok()?.clone(),
        })
    }

    /// The full snapshot, taking failed groups from `previous`
    pub fn snapshot_or(&self, previous: &HoldingsApi) -> HoldingsApi {
        HoldingsApi {
            candle: self
                .candle
                .as_ref()
                .map_or_else(|_| previous.candle.clone(), Clone::clone),
            other_assets: self
                .other_assets
                .as_ref()
                .map_or_else(|_| previous.other_assets.clone(), Clone::clone),
        }
    }
}

/// Reserve holdings aggregator
///
/// Holds no state of its own besides the shared cache; cheap to clone.
#[derive(Clone)]
pub struct HoldingsService {
    cache: Arc<CacheStore>,
    reserve: Arc<dyn ReserveProvider>,
    btc: SourcePair<dyn BalanceProvider>,
    ethereum: SourcePair<dyn BalanceProvider>,
    rates: SourcePair<dyn RateProvider>,
    config: Arc<HoldingsConfig>,
}

impl HoldingsService {
    /// Creates an aggregator over `cache`
    ///
    /// The cache is meant to be created once per process and shared.
    pub fn new(
        cache: Arc<CacheStore>,
        providers: HoldingsProviders,
        config: HoldingsConfig,
    ) -> Self {
        Self {
            cache,
            reserve: providers.reserve,
            btc: providers.btc,
            ethereum: providers.ethereum,
            rates: providers.rates,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &HoldingsConfig {
        &self.config
    }

    /// Runs both holdings groups concurrently
    pub async fn holdings(&self) -> Holdings {
        let (candle, other_assets) = tokio::join!(self.holdings_candle(), self.holdings_other());
        let holdings = Holdings {
            candle,
            other_assets,
        };

        if let Some(snapshot) = holdings.snapshot() {
            tracing::info!(
                total_usd = sum_total_holdings(&snapshot),
                liquid_usd = sum_liquid_holdings(&snapshot),
                oldest_update = find_oldest_value_updated_at(Some(&snapshot)),
                "Assembled holdings snapshot"
            );
        }

        holdings
    }

    /// Frozen, unfrozen and custody balances of the reserve-native asset
    pub async fn holdings_candle(&self) -> Result<CandleHoldings, HoldingsError> {
        let (rate, custody, frozen, unfrozen) = tokio::join!(
            self.rate(Token::CANDLE),
            self.custody_balance(),
            self.frozen_balance(),
            self.unfrozen_balance(),
        );

        let assemble = || -> Result<CandleHoldings, HoldingsError> {
            let rate = rate?;
            Ok(CandleHoldings {
                frozen: TokenModel::priced(Token::CANDLE, &frozen?, Some(&rate)),
                unfrozen: TokenModel::priced(Token::CANDLE, &unfrozen?, Some(&rate)),
                custody: TokenModel::priced(Token::CANDLE, &custody?, Some(&rate)),
            })
        };

        assemble().inspect_err(|e| {
            tracing::error!(group = "candle", error = %e, "Failed to assemble holdings group");
        })
    }

    /// Every non-native reserve asset, in display order BTC, ETH, DAI, USDC, cMCO2
    pub async fn holdings_other(&self) -> Result<Vec<TokenModel>, HoldingsError> {
        let (btc_rate, eth_rate, cmco2_rate, btc, eth, dai, usdc, cmco2) = tokio::join!(
            self.rate(Token::BTC),
            self.rate(Token::ETH),
            self.rate(Token::CMCO2),
            self.btc_balance(),
            self.eth_balance(),
            self.erc20_balance(Token::DAI),
            self.erc20_balance(Token::USDC),
            self.cmco2_balance(),
        );

        let assemble = || -> Result<Vec<TokenModel>, HoldingsError> {
            Ok(vec![
                TokenModel::priced(Token::BTC, &btc?, Some(&btc_rate?)),
                TokenModel::priced(Token::ETH, &eth?, Some(&eth_rate?)),
                TokenModel::priced(Token::DAI, &dai?, None),
                TokenModel::priced(Token::USDC, &usdc?, None),
                TokenModel::priced(Token::CMCO2, &cmco2?, Some(&cmco2_rate?)),
            ])
        };

        assemble().inspect_err(|e| {
            tracing::error!(group = "other", error = %e, "Failed to assemble holdings group");
        })
    }

    /// Reserve addresses: the on-chain list followed by the static configuration
    pub async fn addresses(&self) -> Result<Vec<ReserveCrypto>, HoldingsError> {
        let reserve = self.reserve.clone();
        let timeout = self.config.request_timeout;

        let onchain: ProviderSource<Vec<ReserveCrypto>> = self
            .cache
            .get_or_save(
                "onchain-addresses",
                move || async move {
                    Ok::<_, Infallible>(
                        settle(reserve.source(), timeout, reserve.fetch_addresses()).await,
                    )
                },
                self.config.ttls.addresses,
            )
            .await?;

        Ok(onchain
            .value
            .into_iter()
            .chain(self.config.addresses.iter().cloned())
            .collect())
    }

    /// Reserve addresses grouped per token, without duplicates
    pub async fn grouped_addresses(&self) -> Result<HashMap<Token, Vec<String>>, HoldingsError> {
        let mut groups: HashMap<Token, Vec<String>> = HashMap::new();
        for entry in self.addresses().await? {
            let group = groups.entry(entry.token).or_default();
            for address in entry.addresses {
                if !group.contains(&address) {
                    group.push(address);
                }
            }
        }
        Ok(groups)
    }

    /// Target allocation weights
    pub async fn target_allocations(
        &self,
    ) -> Result<ProviderSource<Vec<Allocation>>, HoldingsError> {
        let reserve = self.reserve.clone();
        let timeout = self.config.request_timeout;

        let allocations = self
            .cache
            .get_or_save(
                "target-allocations",
                move || async move {
                    Ok::<_, Infallible>(
                        settle(reserve.source(), timeout, reserve.fetch_target_allocations())
                            .await,
                    )
                },
                self.config.ttls.target_allocations,
            )
            .await?;
        Ok(allocations)
    }

    pub async fn custody_balance(&self) -> Result<ProviderSource, HoldingsError> {
        self.reserve_balance(
            "candle-custody-balance",
            ReserveBalance::Custody,
            self.config.ttls.custody_balance,
        )
        .await
    }

    pub async fn frozen_balance(&self) -> Result<ProviderSource, HoldingsError> {
        self.reserve_balance(
            "candle-frozen-balance",
            ReserveBalance::Frozen,
            self.config.ttls.frozen_balance,
        )
        .await
    }

    pub async fn unfrozen_balance(&self) -> Result<ProviderSource, HoldingsError> {
        self.reserve_balance(
            "candle-unfrozen-balance",
            ReserveBalance::Unfrozen,
            self.config.ttls.unfrozen_balance,
        )
        .await
    }

    pub async fn cmco2_balance(&self) -> Result<ProviderSource, HoldingsError> {
        self.reserve_balance(
            "cmco2-balance",
            ReserveBalance::Cmco2,
            self.config.ttls.cmco2_balance,
        )
        .await
    }

    /// BTC held across the reserve's BTC addresses
    pub async fn btc_balance(&self) -> Result<Duel, HoldingsError> {
        let this = self.clone();
        let balance = self
            .cache
            .get_or_save(
                "btc-balance",
                move || async move { this.sum_balance(Token::BTC, &this.btc, None).await },
                self.config.ttls.external_balance,
            )
            .await?;
        Ok(balance)
    }

    /// ETH held across the reserve's ETH addresses
    pub async fn eth_balance(&self) -> Result<Duel, HoldingsError> {
        let this = self.clone();
        let balance = self
            .cache
            .get_or_save(
                "eth-balance",
                move || async move { this.sum_balance(Token::ETH, &this.ethereum, None).await },
                self.config.ttls.external_balance,
            )
            .await?;
        Ok(balance)
    }

    /// ERC-20 `token` held across the reserve's addresses for that token
    pub async fn erc20_balance(&self, token: Token) -> Result<Duel, HoldingsError> {
        let this = self.clone();
        let key = format!("{}-balance", token.symbol().to_lowercase());
        let balance = self
            .cache
            .get_or_save(
                &key,
                move || async move {
                    let contract = this.contract(token).await?;
                    this.sum_balance(token, &this.ethereum, Some(contract)).await
                },
                self.config.ttls.external_balance,
            )
            .await?;
        Ok(balance)
    }

    /// USD rate of `token`, reconciled from the rate provider pair
    pub async fn rate(&self, token: Token) -> Result<Duel, HoldingsError> {
        let rates = self.rates.clone();
        let timeout = self.config.request_timeout;
        let key = format!("{}-rate", token.symbol().to_lowercase());

        let rate = self
            .cache
            .get_or_save(
                &key,
                move || async move {
                    Ok::<_, Infallible>(
                        duel(
                            settle(
                                rates.primary.source(),
                                timeout,
                                rates.primary.fetch_rate(token),
                            ),
                            settle(
                                rates.secondary.source(),
                                timeout,
                                rates.secondary.fetch_rate(token),
                            ),
                        )
                        .await,
                    )
                },
                self.config.ttls.exchange_rate,
            )
            .await?;
        Ok(rate)
    }

    async fn reserve_balance(
        &self,
        key: &str,
        balance: ReserveBalance,
        ttl: Duration,
    ) -> Result<ProviderSource, HoldingsError> {
        let reserve = self.reserve.clone();
        let timeout = self.config.request_timeout;

        let source = self
            .cache
            .get_or_save(
                key,
                move || async move {
                    Ok::<_, Infallible>(
                        settle(reserve.source(), timeout, reserve.fetch_balance(balance)).await,
                    )
                },
                ttl,
            )
            .await?;
        Ok(source)
    }

    /// Finds the ERC-20 contract configured for `token`
    async fn contract(&self, token: Token) -> Result<TokenContract, HoldingsError> {
        self.addresses()
            .await?
            .iter()
            .filter(|entry| entry.token == token)
            .find_map(ReserveCrypto::contract)
            .ok_or(HoldingsError::MissingContract { token })
    }

    /// Reconciles the balance of every address of `token` and sums them
    async fn sum_balance(
        &self,
        token: Token,
        providers: &SourcePair<dyn BalanceProvider>,
        contract: Option<TokenContract>,
    ) -> Result<Duel, HoldingsError> {
        let groups = self.grouped_addresses().await?;
        let addresses = groups.get(&token).map(Vec::as_slice).unwrap_or_default();
        let timeout = self.config.request_timeout;
        let contract = contract.as_ref();

        let balances = join_all(addresses.iter().map(|address| {
            duel(
                settle(
                    providers.primary.source(),
                    timeout,
                    providers.primary.fetch_balance(address, contract),
                ),
                settle(
                    providers.secondary.source(),
                    timeout,
                    providers.secondary.fetch_balance(address, contract),
                ),
            )
        }))
        .await;

        tracing::debug!(
            token = %token,
            addresses = addresses.len(),
            "Fetched per-address balances"
        );

        sum_all(balances).ok_or(HoldingsError::NoAddresses { token })
    }
}
