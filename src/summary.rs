//! Totals and percentages derived from a holdings snapshot

use crate::types::{Allocation, ChartData, HoldingsApi, Token};

/// Value of every reserve-native balance
pub fn sum_candle_total(holdings: &HoldingsApi) -> f64 {
    let candle = &holdings.candle;
    candle.custody.value + candle.unfrozen.value + candle.frozen.value
}

/// Value of every other asset
pub fn sum_non_candle(holdings: &HoldingsApi) -> f64 {
    holdings.other_assets.iter().map(|asset| asset.value).sum()
}

pub fn sum_total_holdings(holdings: &HoldingsApi) -> f64 {
    sum_candle_total(holdings) + sum_non_candle(holdings)
}

/// Freely transferable value: everything except the frozen balance
pub fn sum_liquid_holdings(holdings: &HoldingsApi) -> f64 {
    let candle = &holdings.candle;
    candle.custody.value + candle.unfrozen.value + sum_non_candle(holdings)
}

/// Share of the total held in the reserve-native asset (one slice) and in each
/// other asset. Every share is 0 when the total is 0.
pub fn get_percents(holdings: &HoldingsApi) -> Vec<ChartData> {
    let candle_total = sum_candle_total(holdings);
    let total = candle_total + sum_non_candle(holdings);

    let to_percent = |value: f64| {
        if total == 0.0 {
            0.0
        } else {
            value / total * 100.0
        }
    };

    std::iter::once(ChartData {
        token: Token::CANDLE,
        percent: to_percent(candle_total),
    })
    .chain(holdings.other_assets.iter().map(|asset| ChartData {
        token: asset.token,
        percent: to_percent(asset.value),
    }))
    .collect()
}

/// Oldest `updated` timestamp of any position; 0 without a snapshot
///
/// A snapshot is only as fresh as its stalest input.
pub fn find_oldest_value_updated_at(holdings: Option<&HoldingsApi>) -> i64 {
    let Some(holdings) = holdings else {
        return 0;
    };

    holdings
        .candle
        .iter()
        .chain(holdings.other_assets.iter())
        .map(|model| model.updated)
        .min()
        .unwrap_or(0)
}

pub fn sum_allocation_percents(allocations: &[Allocation]) -> f64 {
    allocations.iter().map(|allocation| allocation.percent).sum()
}
