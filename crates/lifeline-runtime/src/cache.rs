//! Fallback cache with stale-while-revalidate.
//!
//! Values computed by a fetcher are kept per key together with the time
//! they stop being fresh. A fresh hit never calls the fetcher. On a miss or
//! a stale entry the fetcher runs; a successful result replaces the entry,
//! while a failure leaves the previous value untouched so it can still be
//! served when stale-while-revalidate is enabled.
//!
//! Concurrent misses for the same key are coalesced: one caller (the
//! leader) runs its fetcher and every other caller awaits the leader's
//! outcome instead of issuing a duplicate upstream call.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio::time::Instant;

use lifeline_core::{CacheConfig, ConfigError};

#[derive(Clone)]
struct CacheEntry<T> {
    value: T,
    computed_at: DateTime<Utc>,
    fresh_until: Instant,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.fresh_until
    }
}

/// A cached value read without fetching.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue<T> {
    pub value: T,

    /// When the fetch that produced this value completed
    pub computed_at: DateTime<Utc>,

    /// Whether the value is still within its TTL
    pub is_fresh: bool,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Fresh entries served without fetching
    pub hits: u64,

    /// Fetcher invocations
    pub misses: u64,

    /// Stale values served after a failed fetch
    pub stale_served: u64,

    /// Callers that awaited another caller's in-flight fetch
    pub coalesced: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_served: AtomicU64,
    coalesced: AtomicU64,
}

enum Role<T, E> {
    Leader,
    Waiter(broadcast::Receiver<Result<T, E>>),
}

/// Fetches currently running, keyed by cache key.
struct InFlight<T, E> {
    requests: Mutex<HashMap<String, broadcast::Sender<Result<T, E>>>>,
}

impl<T, E> InFlight<T, E>
where
    T: Clone,
    E: Clone,
{
    fn new() -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Become the leader for `key`, or subscribe to the running fetch.
    fn join(&self, key: &str) -> Role<T, E> {
        let mut requests = self.requests.lock();
        if let Some(sender) = requests.get(key) {
            Role::Waiter(sender.subscribe())
        } else {
            // A single result is ever sent per fetch
            let (tx, _rx) = broadcast::channel(1);
            requests.insert(key.to_string(), tx);
            Role::Leader
        }
    }

    fn complete(&self, key: &str, outcome: &Result<T, E>) {
        let mut requests = self.requests.lock();
        if let Some(sender) = requests.remove(key) {
            // No receivers is fine
            let _ = sender.send(outcome.clone());
        }
    }

    /// Drop the slot without a result; waiters see the channel close.
    fn abandon(&self, key: &str) {
        self.requests.lock().remove(key);
    }
}

/// Releases the in-flight slot if the leader is dropped before settling.
struct LeaderGuard<'a, T, E>
where
    T: Clone,
    E: Clone,
{
    in_flight: &'a InFlight<T, E>,
    key: &'a str,
    settled: bool,
}

impl<'a, T, E> LeaderGuard<'a, T, E>
where
    T: Clone,
    E: Clone,
{
    fn new(in_flight: &'a InFlight<T, E>, key: &'a str) -> Self {
        Self {
            in_flight,
            key,
            settled: false,
        }
    }

    fn complete(mut self, outcome: Result<T, E>) -> Result<T, E> {
        self.in_flight.complete(self.key, &outcome);
        self.settled = true;
        outcome
    }
}

impl<T, E> Drop for LeaderGuard<'_, T, E>
where
    T: Clone,
    E: Clone,
{
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!(key = self.key, "Cache fetch abandoned before completion");
            self.in_flight.abandon(self.key);
        }
    }
}

/// Keyed cache that falls back to stale values when a refresh fails.
///
/// `T` is the cached value, `E` the fetchers' error type. Both are cloned
/// to hand a coalesced outcome to every waiting caller.
pub struct FallbackCache<T, E> {
    entries: Cache<String, CacheEntry<T>>,
    in_flight: InFlight<T, E>,
    config: CacheConfig,
    counters: Counters,
}

impl<T, E> FallbackCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone,
{
    /// Create a new cache, rejecting an invalid configuration.
    pub fn new(config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut builder = Cache::builder();
        if let Some(max) = config.max_entries {
            builder = builder.max_capacity(max);
        }

        Ok(Self {
            entries: builder.build(),
            in_flight: InFlight::new(),
            config,
            counters: Counters::default(),
        })
    }

    /// Return the cached value for `key` if fresh, otherwise run `fetcher`.
    ///
    /// On fetcher failure the last known value is returned instead when
    /// stale-while-revalidate is enabled and a value exists; otherwise the
    /// fetcher's error is returned. A failed fetch never removes or replaces
    /// a stored value.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetcher: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let guard = loop {
            if let Some(value) = self.fresh(key).await {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, "Cache hit");
                return Ok(value);
            }

            match self.in_flight.join(key) {
                Role::Leader => break LeaderGuard::new(&self.in_flight, key),
                Role::Waiter(mut receiver) => match receiver.recv().await {
                    Ok(outcome) => {
                        self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(key, "Joined in-flight fetch");
                        return outcome;
                    }
                    // Leader went away without a result; look again
                    Err(_) => continue,
                },
            }
        };

        // Another leader may have finished between the lookup and the join
        if let Some(value) = self.fresh(key).await {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return guard.complete(Ok(value));
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key, "Cache miss, fetching");

        let outcome = match fetcher().await {
            Ok(value) => {
                self.store(key, value.clone()).await;
                Ok(value)
            }
            Err(err) => self.on_fetch_error(key, err).await,
        };

        guard.complete(outcome)
    }

    async fn on_fetch_error(&self, key: &str, err: E) -> Result<T, E> {
        if !self.config.stale_while_revalidate {
            return Err(err);
        }

        match self.entries.get(key).await {
            Some(entry) => {
                self.counters.stale_served.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    key,
                    computed_at = %entry.computed_at,
                    "Fetch failed, serving stale value"
                );
                Ok(entry.value)
            }
            None => Err(err),
        }
    }

    async fn fresh(&self, key: &str) -> Option<T> {
        self.entries
            .get(key)
            .await
            .filter(CacheEntry::is_fresh)
            .map(|entry| entry.value)
    }

    async fn store(&self, key: &str, value: T) {
        let entry = CacheEntry {
            value,
            computed_at: Utc::now(),
            fresh_until: Instant::now() + self.config.ttl,
        };
        self.entries.insert(key.to_string(), entry).await;
    }

    /// Store a value as if it had just been fetched.
    pub async fn insert(&self, key: &str, value: T) {
        self.store(key, value).await;
    }

    /// Read an entry without fetching.
    pub async fn peek(&self, key: &str) -> Option<CachedValue<T>> {
        self.entries.get(key).await.map(|entry| CachedValue {
            is_fresh: entry.is_fresh(),
            computed_at: entry.computed_at,
            value: entry.value,
        })
    }

    /// Remove the entry for `key`. Other keys are untouched.
    pub async fn clear(&self, key: &str) {
        self.entries.invalidate(key).await;
    }

    /// Remove every entry.
    pub fn clear_all(&self) {
        self.entries.invalidate_all();
    }

    /// Approximate number of stored entries.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            stale_served: self.counters.stale_served.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}
