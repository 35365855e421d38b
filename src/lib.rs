//! # Reserve Holdings
//!
//! Reports the live composition of a crypto reserve: the reserve-native asset
//! (frozen, unfrozen and custody balances) plus a basket of other crypto and
//! stable assets, priced in USD.
//!
//! Every quantity is read from upstream providers through three layers:
//!
//! - [`CacheStore`] keeps each quantity for its TTL and makes concurrent
//!   requests for the same key share one upstream computation.
//! - [`duel`] reconciles two providers measuring the same quantity, and
//!   [`sum_merge`] folds per-address balances into one total.
//! - [`HoldingsService`] fans out over every tracked asset, prices the results
//!   and assembles the [`HoldingsApi`] snapshot.
//!
//! Provider failures never abort an aggregation; they surface as `has_error`
//! on the affected position.
//!
//! ## Usage
//!
//! ```no_run
//! use reserve_holdings::{
//!     summary, CacheStore, HoldingsConfig, HoldingsProviders, HoldingsService,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(providers: HoldingsProviders) {
//! let cache = Arc::new(CacheStore::new());
//! let service = HoldingsService::new(cache, providers, HoldingsConfig::from_env());
//!
//! let holdings = service.holdings().await;
//! if let Some(snapshot) = holdings.snapshot() {
//!     println!("Total: ${:.2}", summary::sum_total_holdings(&snapshot));
//!     println!("Liquid: ${:.2}", summary::sum_liquid_holdings(&snapshot));
//!     for slice in summary::get_percents(&snapshot) {
//!         println!("{}: {:.1}%", slice.token, slice.percent);
//!     }
//! }
//! # }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod constants;
pub mod duel;
pub mod error;
pub mod holdings;
pub mod provider;
pub mod providers;
pub mod summary;
pub mod types;

// Re-export commonly used types
pub use cache::CacheStore;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheTtls, HoldingsConfig};
pub use duel::{duel, sum_merge};
pub use error::{CacheError, HoldingsError, ProviderError};
pub use holdings::{Holdings, HoldingsProviders, HoldingsService};
pub use provider::{BalanceProvider, RateProvider, ReserveBalance, ReserveProvider, SourcePair};
pub use types::{
    Allocation, AssetType, CandleHoldings, ChartData, Duel, HoldingsApi, Provider, ProviderSource,
    ReserveCrypto, Sample, Token, TokenContract, TokenModel,
};
