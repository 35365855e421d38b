//! In-memory get-or-compute cache with single-flight refreshes
//!
//! Entries are keyed by the name of the quantity they hold and expire lazily:
//! freshness is checked on read, nothing sweeps the map. While a key is being
//! computed every caller for that key awaits the same computation.

use crate::{
    clock::{Clock, SystemClock},
    error::CacheError,
};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Type-erased cached value
type AnyValue = Arc<dyn Any + Send + Sync>;

/// One computation shared by every concurrent caller of a key
type Flight = Shared<BoxFuture<'static, Result<AnyValue, CacheError>>>;

/// A stored value and the time it was stored
struct CacheEntry {
    value: AnyValue,
    stored_at: i64,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: i64) -> bool {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        now.saturating_sub(self.stored_at) < ttl_ms
    }
}

enum Slot {
    Ready(CacheEntry),
    Pending { flight_id: u64, flight: Flight },
}

/// Process-lifetime cache shared by the holdings aggregator
///
/// Values of any `Clone + Send + Sync` type can be stored; a key must always be
/// read back as the type it was stored with.
pub struct CacheStore {
    slots: Mutex<HashMap<String, Slot>>,
    clock: Arc<dyn Clock>,
    next_flight_id: AtomicU64,
}

impl CacheStore {
    /// Creates an empty cache on the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty cache on a custom clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            clock,
            next_flight_id: AtomicU64::new(0),
        }
    }

    /// Returns the cached value for `key`, computing and storing it if needed
    ///
    /// A fresh entry is returned without calling `compute`. Otherwise `compute`
    /// runs once and callers arriving while it runs share its result. A failed
    /// computation, including one that panics, is handed to every waiting caller
    /// and not stored, so the next call retries.
    ///
    /// # Arguments
    /// * `key` - Name of the cached quantity
    /// * `compute` - Produces the value when the entry is missing or stale
    /// * `ttl` - How long the stored value stays fresh
    pub async fn get_or_save<T, F, Fut, E>(
        &self,
        key: &str,
        compute: F,
        ttl: Duration,
    ) -> Result<T, CacheError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let (flight_id, flight) = {
            let mut slots = self.slots.lock().await;
            let now = self.clock.now_millis();

            match slots.get(key) {
                Some(Slot::Ready(entry)) if entry.is_fresh(now) => {
                    tracing::trace!(key, "Cache hit");
                    return downcast(key, &entry.value);
                }
                Some(Slot::Pending { flight_id, flight }) => {
                    tracing::trace!(key, "Joining in-flight computation");
                    (*flight_id, flight.clone())
                }
                stale_or_missing => {
                    tracing::debug!(
                        key,
                        stale = stale_or_missing.is_some(),
                        ttl_ms = ttl.as_millis() as u64,
                        "Computing cache entry"
                    );
                    let flight_id = self.next_flight_id.fetch_add(1, Ordering::Relaxed);
                    let flight = start_flight(key, compute());
                    slots.insert(
                        key.to_string(),
                        Slot::Pending {
                            flight_id,
                            flight: flight.clone(),
                        },
                    );
                    (flight_id, flight)
                }
            }
        };

        let outcome = flight.await;
        self.settle(key, flight_id, &outcome, ttl).await;

        downcast(key, &outcome?)
    }

    /// Replaces the pending slot of a finished flight with its outcome
    ///
    /// Only the first caller to finish a flight changes the slot; later callers
    /// find it already settled or replaced by a newer flight.
    async fn settle(
        &self,
        key: &str,
        flight_id: u64,
        outcome: &Result<AnyValue, CacheError>,
        ttl: Duration,
    ) {
        let mut slots = self.slots.lock().await;
        let owns_slot = matches!(
            slots.get(key),
            Some(Slot::Pending { flight_id: pending, .. }) if *pending == flight_id
        );
        if !owns_slot {
            return;
        }

        match outcome {
            Ok(value) => {
                let entry = CacheEntry {
                    value: value.clone(),
                    stored_at: self.clock.now_millis(),
                    ttl,
                };
                slots.insert(key.to_string(), Slot::Ready(entry));
            }
            Err(e) => {
                tracing::debug!(key, error = %e, "Cache computation failed, entry not stored");
                slots.remove(key);
            }
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

fn start_flight<T, Fut, E>(key: &str, computation: Fut) -> Flight
where
    T: Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let key = key.to_string();
    async move {
        match AssertUnwindSafe(computation).catch_unwind().await {
            Ok(result) => result
                .map(|value| Arc::new(value) as AnyValue)
                .map_err(|e| CacheError::compute(key, e)),
            Err(_) => {
                tracing::error!(key, "Cache computation panicked");
                Err(CacheError::panicked(key))
            }
        }
    }
    .boxed()
    .shared()
}

fn downcast<T: Clone + 'static>(key: &str, value: &AnyValue) -> Result<T, CacheError> {
    (**value)
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| CacheError::type_mismatch(key))
}
