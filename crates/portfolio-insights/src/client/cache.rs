//! Keyed response cache with TTL expiry, in-flight request coalescing, and a
//! bounded concurrency gate over the underlying transport. The backing PMS
//! endpoints run single-worker synchronous queries and start timing out
//! above a handful of simultaneous calls, so the gate caps system-wide
//! outstanding requests and queues the rest in FIFO order.
//!
//! The service is an explicitly constructed, injectable instance; tests
//! build an isolated cache per case instead of sharing process state.

use super::ClientError;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OnceCell, Semaphore};

struct CacheEntry {
    data: Value,
    stored_at: Instant,
}

pub struct CacheService {
    ttl: Duration,
    gate: Arc<Semaphore>,
    entries: Mutex<HashMap<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, Arc<OnceCell<Value>>>>,
}

impl CacheService {
    pub fn new(ttl: Duration, max_concurrency: usize) -> Self {
        Self {
            ttl,
            gate: Arc::new(Semaphore::new(max_concurrency.max(1))),
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch-through lookup. A live entry returns immediately with no call;
    /// a key already in flight joins the pending computation rather than
    /// issuing a duplicate; otherwise `producer` runs under a gate permit
    /// and populates the cache on success.
    pub async fn get_with<F, Fut>(&self, key: &str, producer: F) -> Result<Value, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ClientError>>,
    {
        if let Some(value) = self.lookup(key) {
            return Ok(value);
        }

        let cell = {
            let mut in_flight = self.in_flight.lock().expect("in-flight map poisoned");
            in_flight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let result = cell
            .get_or_try_init(|| async {
                let _permit = self.gate.acquire().await.expect("gate semaphore closed");
                // An earlier waiter may have populated the cache while this
                // caller was queued on the gate.
                if let Some(value) = self.lookup(key) {
                    return Ok(value);
                }
                let value = producer().await?;
                self.store(key, value.clone());
                Ok(value)
            })
            .await
            .cloned();

        // In-flight bookkeeping is cleared on success and failure alike so a
        // thrown error can never leave a stale entry wedging the key.
        let mut in_flight = self.in_flight.lock().expect("in-flight map poisoned");
        if in_flight
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, &cell))
        {
            in_flight.remove(key);
        }
        drop(in_flight);

        result
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().expect("cache map poisoned");
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.data.clone()),
            Some(_) => {
                // Lazy eviction on next lookup.
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, key: &str, data: Value) {
        let mut entries = self.entries.lock().expect("cache map poisoned");
        entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every entry whose key starts with `prefix`. Called after
    /// operations known to change server state.
    pub fn invalidate_prefix(&self, prefix: &str) {
        let mut entries = self.entries.lock().expect("cache map poisoned");
        entries.retain(|key, _| !key.starts_with(prefix));
    }

    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock().expect("cache map poisoned");
        entries.remove(key);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().expect("cache map poisoned").len()
    }
}
