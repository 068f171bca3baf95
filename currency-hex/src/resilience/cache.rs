//! Single-flight memoizing cache.
//!
//! A key is either `Ready` (a cached value) or `InFlight` (a shared future
//! every concurrent caller awaits). Only successes are stored; a failed
//! flight removes its slot so the next caller starts over.
//!
//! Each fetch runs as its own tokio task, so it completes even when every
//! caller waiting on it has gone away.

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use currency_types::RateError;

type Flight<V> = Shared<BoxFuture<'static, Result<V, RateError>>>;

enum Slot<V> {
    Ready(V),
    InFlight { id: u64, flight: Flight<V> },
}

/// Concurrent cache where at most one fetch per key is running at a time.
pub struct FlightCache<K, V> {
    name: &'static str,
    slots: Arc<DashMap<K, Slot<V>>>,
    next_id: AtomicU64,
}

impl<K, V> FlightCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Returns the cached value for `key`, joins the fetch already running
    /// for it, or starts `fetch` and shares it with later callers.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V, RateError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, RateError>> + Send + 'static,
    {
        // The map guard must be gone before awaiting.
        let (id, flight) = match self.slots.entry(key.clone()) {
            Entry::Occupied(entry) => match entry.get() {
                Slot::Ready(value) => {
                    tracing::trace!(cache = self.name, ?key, "Cache hit");
                    return Ok(value.clone());
                }
                Slot::InFlight { id, flight } => {
                    tracing::trace!(cache = self.name, ?key, "Joining in-flight fetch");
                    (*id, flight.clone())
                }
            },
            Entry::Vacant(entry) => {
                tracing::debug!(cache = self.name, ?key, "Cache miss, fetching");
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let flight = self.launch(key.clone(), id, fetch());
                entry.insert(Slot::InFlight {
                    id,
                    flight: flight.clone(),
                });
                (id, flight)
            }
        };

        let result = flight.await;
        if result.is_err() {
            // Covers a task that died before settling its own slot.
            settle(&self.slots, key, id, &result);
        }
        result
    }

    /// Spawns the fetch so that it runs to completion, and settles its slot,
    /// even when every waiter has gone away.
    fn launch<Fut>(&self, key: K, id: u64, fetch: Fut) -> Flight<V>
    where
        Fut: Future<Output = Result<V, RateError>> + Send + 'static,
    {
        let name = self.name;
        let slots = self.slots.clone();
        let task = tokio::spawn(async move {
            let result = fetch.await;
            settle(&slots, key, id, &result);
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                tracing::error!(cache = name, error = %e, "Fetch task did not complete");
                Err(RateError::upstream(format!("fetch task did not complete: {}", e)))
            })
        }
        .boxed()
        .shared()
    }

    #[cfg(test)]
    fn get(&self, key: &K) -> Option<V> {
        match self.slots.get(key)?.value() {
            Slot::Ready(value) => Some(value.clone()),
            Slot::InFlight { .. } => None,
        }
    }

    /// Drops every cached value. Fetches still in flight are kept so that
    /// concurrent callers keep sharing them.
    pub fn clear(&self) {
        self.slots.retain(|_, slot| matches!(slot, Slot::InFlight { .. }));
    }

    /// Number of cached values.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| matches!(entry.value(), Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Replaces flight `id`'s slot with its outcome. A slot that was evicted or
/// refilled by a newer flight meanwhile is left alone.
fn settle<K, V>(slots: &DashMap<K, Slot<V>>, key: K, id: u64, result: &Result<V, RateError>)
where
    K: Eq + Hash,
    V: Clone,
{
    if let Entry::Occupied(mut entry) = slots.entry(key) {
        if !matches!(entry.get(), Slot::InFlight { id: current, .. } if *current == id) {
            return;
        }
        match result {
            Ok(value) => {
                entry.insert(Slot::Ready(value.clone()));
            }
            Err(_) => {
                entry.remove();
            }
        }
    }
}
