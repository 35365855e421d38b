//! Types for the reserve holdings aggregator

use serde::{Deserialize, Serialize};
use std::fmt;

/// Known upstream data providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "coinbase")]
    Coinbase,
    #[serde(rename = "coinmarketcap")]
    CoinMarketCap,
    #[serde(rename = "blockstream")]
    Blockstream,
    #[serde(rename = "blockchain.com")]
    BlockchainDotCom,
    #[serde(rename = "etherscan")]
    Etherscan,
    #[serde(rename = "ethplorer")]
    Ethplorer,
    #[serde(rename = "forno.candle.org")]
    Forno,
    #[serde(rename = "ecb.europa.eu")]
    Ecb,
    #[serde(rename = "exchangeratesapi.io")]
    ExchangeRates,
    #[serde(rename = "ubeswap")]
    Ubeswap,
}

impl Provider {
    /// Get the source tag reported alongside values from this provider
    pub fn tag(&self) -> &'static str {
        match self {
            Provider::Coinbase => "coinbase",
            Provider::CoinMarketCap => "coinmarketcap",
            Provider::Blockstream => "blockstream",
            Provider::BlockchainDotCom => "blockchain.com",
            Provider::Etherscan => "etherscan",
            Provider::Ethplorer => "ethplorer",
            Provider::Forno => "forno.candle.org",
            Provider::Ecb => "ecb.europa.eu",
            Provider::ExchangeRates => "exchangeratesapi.io",
            Provider::Ubeswap => "ubeswap",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Assets tracked in the reserve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    /// Reserve-native asset
    CANDLE,
    /// Bitcoin
    BTC,
    /// Ether
    ETH,
    /// Dai stablecoin (ERC-20)
    DAI,
    /// USD Coin (ERC-20)
    USDC,
    /// Moss carbon credit token
    #[serde(rename = "cMCO2")]
    CMCO2,
}

impl Token {
    /// Get the token symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Token::CANDLE => "CANDLE",
            Token::BTC => "BTC",
            Token::ETH => "ETH",
            Token::DAI => "DAI",
            Token::USDC => "USDC",
            Token::CMCO2 => "cMCO2",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Category of a reserve asset in the target allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetType {
    StableValue,
    NaturalCapital,
    OtherCryptoAssets,
    CandleNativeAsset,
}

/// Target weight of one asset in the reserve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub token: Token,
    pub percent: f64,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
}

/// ERC-20 contract a balance is read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenContract {
    pub address: String,
    pub decimals: u32,
}

/// One entry of the reserve address configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveCrypto {
    pub token: Token,
    pub label: String,
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
}

impl ReserveCrypto {
    /// Get the ERC-20 contract for this entry, if it describes one
    pub fn contract(&self) -> Option<TokenContract> {
        Some(TokenContract {
            address: self.token_address.clone()?,
            decimals: self.decimals.unwrap_or(18),
        })
    }
}

/// Successful reading from an upstream provider
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<T = f64> {
    pub value: T,
    /// Epoch milliseconds the reading refers to
    pub time: i64,
}

impl<T> Sample<T> {
    pub fn new(value: T, time: i64) -> Self {
        Self { value, time }
    }
}

/// A value fetched from one provider, or the error sentinel standing in for it
///
/// When `has_error` is true, `value` is `T::default()` and `time` is 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSource<T = f64> {
    pub value: T,
    pub source: Provider,
    pub time: i64,
    pub has_error: bool,
}

/// A quantity reconciled from two providers, or summed over several addresses
pub type Duel = ProviderSource<f64>;

impl<T> ProviderSource<T> {
    /// Creates a successful reading
    pub fn ok(value: T, source: Provider, time: i64) -> Self {
        Self {
            value,
            source,
            time,
            has_error: false,
        }
    }

    /// Creates a successful reading from a provider sample
    pub fn from_sample(source: Provider, sample: Sample<T>) -> Self {
        Self::ok(sample.value, source, sample.time)
    }

    /// Creates the error sentinel for `source`
    pub fn failed(source: Provider) -> Self
    where
        T: Default,
    {
        Self {
            value: T::default(),
            source,
            time: 0,
            has_error: true,
        }
    }

    /// The value, unless this is the error sentinel
    pub fn ok_value(&self) -> Option<&T> {
        (!self.has_error).then_some(&self.value)
    }
}

/// One priced position in the holdings snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenModel {
    pub token: Token,
    pub units: f64,
    /// Priced value in USD
    pub value: f64,
    pub has_error: bool,
    /// Epoch milliseconds of the underlying units reading, 0 if never fetched
    pub updated: i64,
}

impl TokenModel {
    /// Prices a units reading
    ///
    /// `rate` is the USD exchange rate; `None` means the units are already USD.
    /// The model is flagged as erroring when the units reading failed, when it
    /// carries no usable amount, or when the rate itself failed.
    pub fn priced(token: Token, units: &ProviderSource, rate: Option<&Duel>) -> Self {
        let usable = units.value.is_finite() && units.value != 0.0;
        let rate_failed = rate.is_some_and(|rate| rate.has_error);
        let exchange_rate = rate.map_or(1.0, |rate| rate.value);

        Self {
            token,
            units: units.value,
            value: if usable { units.value * exchange_rate } else { 0.0 },
            has_error: units.has_error || !usable || rate_failed,
            updated: units.time,
        }
    }

    /// Model shown before anything was fetched
    pub fn placeholder(token: Token) -> Self {
        Self {
            token,
            units: f64::NAN,
            value: f64::NAN,
            has_error: false,
            updated: 0,
        }
    }
}

/// The three disjoint reserve-native balances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleHoldings {
    pub frozen: TokenModel,
    pub unfrozen: TokenModel,
    pub custody: TokenModel,
}

impl CandleHoldings {
    /// Iterates frozen, unfrozen and custody
    pub fn iter(&self) -> impl Iterator<Item = &TokenModel> {
        [&self.frozen, &self.unfrozen, &self.custody].into_iter()
    }
}

/// Published holdings snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsApi {
    pub candle: CandleHoldings,
    pub other_assets: Vec<TokenModel>,
}

impl HoldingsApi {
    /// Snapshot shown before the first load completes
    pub fn placeholder() -> Self {
        Self {
            candle: CandleHoldings {
                frozen: TokenModel::placeholder(Token::CANDLE),
                unfrozen: TokenModel::placeholder(Token::CANDLE),
                custody: TokenModel::placeholder(Token::CANDLE),
            },
            other_assets: vec![
                TokenModel::placeholder(Token::BTC),
                TokenModel::placeholder(Token::ETH),
                TokenModel::placeholder(Token::DAI),
            ],
        }
    }

    /// True while the frozen or unfrozen balance has never been fetched
    pub fn is_loading_candle(&self) -> bool {
        self.candle.frozen.updated == 0 || self.candle.unfrozen.updated == 0
    }

    /// True while any other asset has never been fetched
    pub fn is_loading_other(&self) -> bool {
        self.other_assets.iter().any(|asset| asset.updated == 0)
    }

    /// Other assets with a non-zero value
    pub fn non_zero_assets(&self) -> impl Iterator<Item = &TokenModel> {
        self.other_assets.iter().filter(|asset| asset.value != 0.0)
    }
}

/// One slice of the composition chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub token: Token,
    pub percent: f64,
}
