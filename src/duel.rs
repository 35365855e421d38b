//! Reconciliation of redundant provider readings
//!
//! Two providers measuring the same quantity are queried together and the
//! primary (first) reading wins whenever it succeeded; the secondary only fills
//! in when the primary failed. Per-address readings of one asset are then
//! folded into a single total with [`sum_merge`].

use crate::types::{Duel, ProviderSource};
use std::future::Future;

/// Queries two providers for the same quantity concurrently and reconciles them
///
/// # Arguments
/// * `primary` - Reading preferred whenever it succeeded
/// * `secondary` - Fallback reading
pub async fn duel<T, A, B>(primary: A, secondary: B) -> ProviderSource<T>
where
    T: Default,
    A: Future<Output = ProviderSource<T>>,
    B: Future<Output = ProviderSource<T>>,
{
    let (primary, secondary) = tokio::join!(primary, secondary);
    reconcile(primary, secondary)
}

/// Picks between two readings of the same quantity
///
/// Precedence is positional: `primary` is returned whenever it succeeded,
/// regardless of which reading is more recent.
pub fn reconcile<T: Default>(
    primary: ProviderSource<T>,
    secondary: ProviderSource<T>,
) -> ProviderSource<T> {
    match (primary.has_error, secondary.has_error) {
        (false, _) => primary,
        (true, false) => {
            tracing::debug!(
                primary = %primary.source,
                fallback = %secondary.source,
                "Primary source failed, using fallback"
            );
            secondary
        }
        (true, true) => {
            tracing::warn!(
                primary = %primary.source,
                fallback = %secondary.source,
                "Both sources failed"
            );
            ProviderSource::failed(primary.source)
        }
    }
}

/// Adds two readings of the same asset held at different addresses
///
/// Any failed reading taints the total, and the total is only as fresh as its
/// oldest part. A zero time (error sentinel) on either side makes the result's
/// time zero.
pub fn sum_merge(x: Duel, y: Duel) -> Duel {
    let time = if x.time == 0 || y.time == 0 {
        0
    } else {
        x.time.min(y.time)
    };

    Duel {
        value: x.value + y.value,
        source: x.source,
        time,
        has_error: x.has_error || y.has_error,
    }
}

/// Folds any number of per-address readings; `None` when there are none
pub fn sum_all(readings: impl IntoIterator<Item = Duel>) -> Option<Duel> {
    readings.into_iter().reduce(sum_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Provider;
    use std::time::Duration;

    fn ok(value: f64, source: Provider, time: i64) -> Duel {
        Duel::ok(value, source, time)
    }

    #[test]
    fn test_primary_wins_when_both_succeed() {
        let primary = ok(1.25, Provider::BlockchainDotCom, 1_000);
        let secondary = ok(1.30, Provider::Blockstream, 9_000);
        assert_eq!(reconcile(primary.clone(), secondary), primary);
    }

    #[test]
    fn test_successful_branch_is_taken_verbatim() {
        let good = ok(3.5, Provider::Ethplorer, 4_000);

        let result = reconcile(Duel::failed(Provider::Etherscan), good.clone());
        assert_eq!(result, good);

        let result = reconcile(good.clone(), Duel::failed(Provider::Etherscan));
        assert_eq!(result, good);
    }

    #[test]
    fn test_both_failed_yields_sentinel() {
        let result = reconcile(
            Duel::failed(Provider::Etherscan),
            Duel::failed(Provider::Ethplorer),
        );
        assert!(result.has_error);
        assert_eq!(result.value, 0.0);
        assert_eq!(result.time, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duel_runs_branches_concurrently() {
        let started = tokio::time::Instant::now();
        let slow = |value: f64, source: Provider| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            ok(value, source, 1_000)
        };

        let result = duel(
            slow(1.0, Provider::Etherscan),
            slow(2.0, Provider::Ethplorer),
        )
        .await;

        assert_eq!(result.value, 1.0);
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_sum_merge_adds_and_keeps_oldest_time() {
        let total = sum_merge(
            ok(1.0, Provider::Blockstream, 5_000),
            ok(2.5, Provider::Blockstream, 3_000),
        );
        assert_eq!(total.value, 3.5);
        assert_eq!(total.time, 3_000);
        assert!(!total.has_error);
    }

    #[test]
    fn test_sum_merge_propagates_failure() {
        let total = sum_merge(
            ok(1.0, Provider::Blockstream, 5_000),
            Duel::failed(Provider::Blockstream),
        );
        assert_eq!(total.value, 1.0);
        assert_eq!(total.time, 0);
        assert!(total.has_error);
    }

    #[test]
    fn test_sum_all() {
        assert_eq!(sum_all(Vec::new()), None);

        let total = sum_all(vec![
            ok(1.0, Provider::Etherscan, 7_000),
            ok(2.0, Provider::Etherscan, 6_000),
            ok(4.0, Provider::Ethplorer, 8_000),
        ])
        .unwrap();
        assert_eq!(total.value, 7.0);
        assert_eq!(total.time, 6_000);
    }
}
