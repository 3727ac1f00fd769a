//! Per-provider request budgets with a write-through headline cache
//!
//! Every live provider call goes through [`RateLimitedCache::get_or_fetch`].
//! A fresh entry is served without touching the budget. Otherwise one request
//! is reserved from the provider's window before the call, and the cache
//! decides between live data, a stale entry or an empty result based on the
//! outcome.
//!
//! Locking: one async mutex per `(provider, query)` key is held across the
//! fetch and forgotten once no caller holds it. Budgets and entries live in
//! `DashMap`s whose guards are only held for short synchronous sections.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use newsroom_core::clock::elapsed;
use newsroom_core::{Article, Clock, ProviderError, ProviderId, Query};

/// Request budget for one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub window_limit: u32,
    pub window_duration: Duration,
}

impl RateLimit {
    pub fn new(window_limit: u32, window_duration: Duration) -> Self {
        Self {
            window_limit,
            window_duration,
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::new(60, Duration::from_secs(60))
    }
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry is served without a live call
    pub ttl: Duration,
    /// How long past its TTL an entry remains usable as a stale fallback
    pub stale_retention: Duration,
    /// LRU bound per provider
    pub max_entries_per_provider: usize,
    /// Budget for providers without an explicit entry in `rate_limits`
    pub default_rate_limit: RateLimit,
    pub rate_limits: HashMap<ProviderId, RateLimit>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            stale_retention: Duration::from_secs(24 * 60 * 60),
            max_entries_per_provider: 100,
            default_rate_limit: RateLimit::default(),
            rate_limits: HashMap::new(),
        }
    }
}

impl CacheConfig {
    pub fn rate_limit_for(&self, provider: &ProviderId) -> RateLimit {
        self.rate_limits
            .get(provider)
            .copied()
            .unwrap_or(self.default_rate_limit)
    }
}

/// Where a provider's articles came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedFrom {
    Live,
    Cache,
    Empty,
}

/// Result of one cached provider lookup
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOutcome {
    pub articles: Vec<Article>,
    pub served_from: ServedFrom,
    /// Served from an entry past its TTL
    pub stale: bool,
    /// Error that caused a fallback, if any
    pub signal: Option<ProviderError>,
}

impl CacheOutcome {
    fn live(articles: Vec<Article>) -> Self {
        Self {
            articles,
            served_from: ServedFrom::Live,
            stale: false,
            signal: None,
        }
    }

    fn empty(signal: ProviderError) -> Self {
        Self {
            articles: Vec::new(),
            served_from: ServedFrom::Empty,
            stale: false,
            signal: Some(signal),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetState {
    Open,
    Throttled,
}

/// Fixed-window request counter for one provider
#[derive(Debug, Clone)]
pub struct ProviderBudget {
    pub provider: ProviderId,
    pub window_start: DateTime<Utc>,
    pub requests_used: u32,
    pub window_limit: u32,
    pub window_duration: Duration,
}

impl ProviderBudget {
    fn new(provider: ProviderId, limit: RateLimit, now: DateTime<Utc>) -> Self {
        Self {
            provider,
            window_start: now,
            requests_used: 0,
            window_limit: limit.window_limit,
            window_duration: limit.window_duration,
        }
    }

    fn roll(&mut self, now: DateTime<Utc>) {
        if elapsed(now, self.window_start) >= self.window_duration {
            self.window_start = now;
            self.requests_used = 0;
        }
    }

    pub fn state(&mut self, now: DateTime<Utc>) -> BudgetState {
        self.roll(now);
        if self.requests_used >= self.window_limit {
            BudgetState::Throttled
        } else {
            BudgetState::Open
        }
    }

    /// Take one request from the window; `false` when throttled
    fn try_reserve(&mut self, now: DateTime<Utc>) -> bool {
        if self.state(now) == BudgetState::Throttled {
            return false;
        }
        self.requests_used += 1;
        true
    }

    /// Mark the rest of the current window as used
    fn exhaust(&mut self, now: DateTime<Utc>) {
        self.roll(now);
        self.requests_used = self.window_limit;
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    articles: Vec<Article>,
    fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        elapsed(now, self.fetched_at) < ttl
    }

    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration, retention: Duration) -> bool {
        elapsed(now, self.fetched_at) >= ttl.saturating_add(retention)
    }
}

/// Per-provider snapshot for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct ProviderCacheStats {
    pub provider: ProviderId,
    pub entries: usize,
    pub fresh_entries: usize,
    pub requests_used: u32,
    pub window_limit: u32,
    pub window_resets_in_secs: u64,
    pub state: BudgetState,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub ttl_secs: u64,
    pub max_entries_per_provider: usize,
    pub providers: Vec<ProviderCacheStats>,
}

type KeyLock = Arc<Mutex<()>>;

/// Claim on a key lock; drops the lock from the map when the last claim ends
///
/// The guard from [`KeyLease::acquire`] must be dropped before the lease.
struct KeyLease<'a> {
    cache: &'a RateLimitedCache,
    key: (ProviderId, Query),
}

impl KeyLease<'_> {
    async fn acquire(&self) -> OwnedMutexGuard<()> {
        let lock = self
            .cache
            .key_locks
            .entry(self.key.clone())
            .or_default()
            .value()
            .clone();
        lock.lock_owned().await
    }
}

impl Drop for KeyLease<'_> {
    fn drop(&mut self) {
        self.cache.release_lock(&self.key);
    }
}

/// Rate-limited headline cache shared by all aggregations
#[derive(Debug)]
pub struct RateLimitedCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    budgets: DashMap<ProviderId, ProviderBudget>,
    entries: DashMap<ProviderId, IndexMap<Query, CacheEntry>>,
    key_locks: DashMap<(ProviderId, Query), KeyLock>,
}

impl RateLimitedCache {
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            budgets: DashMap::new(),
            entries: DashMap::new(),
            key_locks: DashMap::new(),
        }
    }

    /// Serve `query` for `provider`, calling `fetch` only when the entry is
    /// missing or expired and the provider still has budget
    pub async fn get_or_fetch<F, Fut>(
        &self,
        query: &Query,
        provider: &ProviderId,
        fetch: F,
    ) -> Result<CacheOutcome, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Article>, ProviderError>>,
    {
        let query = query.normalized();
        let lease = self.lease(provider, &query);
        let _guard = lease.acquire().await;

        let now = self.clock.now();
        if let Some(entry) = self.lookup(provider, &query, now) {
            if entry.is_fresh(now, self.config.ttl) {
                debug!(%provider, ?query, "Cache HIT");
                return Ok(CacheOutcome {
                    articles: entry.articles,
                    served_from: ServedFrom::Cache,
                    stale: false,
                    signal: None,
                });
            }
        }

        if !self.try_reserve(provider, now) {
            debug!(%provider, ?query, "Provider budget exhausted, skipping live fetch");
            return Ok(self.fallback(provider, &query, ProviderError::RateLimited));
        }

        debug!(%provider, ?query, "Cache MISS, fetching live");
        match fetch().await {
            Ok(articles) => {
                self.store(provider, &query, articles.clone());
                Ok(CacheOutcome::live(articles))
            }
            Err(ProviderError::RateLimited) => {
                warn!(%provider, "Upstream rate limit hit, throttling until window resets");
                self.exhaust_budget(provider);
                Ok(self.fallback(provider, &query, ProviderError::RateLimited))
            }
            Err(e) if e.allows_cache_fallback() => {
                let now = self.clock.now();
                match self.lookup(provider, &query, now) {
                    Some(entry) => {
                        warn!(%provider, error = %e, "Live fetch failed, serving cached entry");
                        let stale = !entry.is_fresh(now, self.config.ttl);
                        Ok(CacheOutcome {
                            articles: entry.articles,
                            served_from: ServedFrom::Cache,
                            stale,
                            signal: Some(e),
                        })
                    }
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Current budget state for a provider
    pub fn budget_state(&self, provider: &ProviderId) -> BudgetState {
        let now = self.clock.now();
        self.budget_entry(provider, now).state(now)
    }

    /// Drop entries past their stale retention
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut count = 0;

        for mut provider_entries in self.entries.iter_mut() {
            let before = provider_entries.len();
            provider_entries.retain(|_, entry| {
                !entry.is_expired(now, self.config.ttl, self.config.stale_retention)
            });
            count += before - provider_entries.len();
        }

        if count > 0 {
            info!(removed = count, "Purged expired cache entries");
        }
        count
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let mut providers: Vec<ProviderId> = self
            .budgets
            .iter()
            .map(|b| b.key().clone())
            .chain(self.entries.iter().map(|e| e.key().clone()))
            .collect();
        providers.sort();
        providers.dedup();

        let providers = providers
            .into_iter()
            .map(|provider| {
                let (entries, fresh_entries) = self
                    .entries
                    .get(&provider)
                    .map(|entries| {
                        let fresh = entries
                            .values()
                            .filter(|e| e.is_fresh(now, self.config.ttl))
                            .count();
                        (entries.len(), fresh)
                    })
                    .unwrap_or_default();

                let mut budget = self.budget_entry(&provider, now);
                let state = budget.state(now);
                let window_resets_in_secs = budget
                    .window_duration
                    .saturating_sub(elapsed(now, budget.window_start))
                    .as_secs();

                ProviderCacheStats {
                    provider: provider.clone(),
                    entries,
                    fresh_entries,
                    requests_used: budget.requests_used,
                    window_limit: budget.window_limit,
                    window_resets_in_secs,
                    state,
                }
            })
            .collect();

        CacheStats {
            ttl_secs: self.config.ttl.as_secs(),
            max_entries_per_provider: self.config.max_entries_per_provider,
            providers,
        }
    }

    /// Number of keys with a fetch in flight or waiting
    pub fn active_keys(&self) -> usize {
        self.key_locks.len()
    }

    fn lease(&self, provider: &ProviderId, query: &Query) -> KeyLease<'_> {
        KeyLease {
            cache: self,
            key: (provider.clone(), query.clone()),
        }
    }

    /// Forget a key lock nobody holds or waits on
    fn release_lock(&self, key: &(ProviderId, Query)) {
        self.key_locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn budget_entry(
        &self,
        provider: &ProviderId,
        now: DateTime<Utc>,
    ) -> dashmap::mapref::one::RefMut<'_, ProviderId, ProviderBudget> {
        self.budgets.entry(provider.clone()).or_insert_with(|| {
            ProviderBudget::new(provider.clone(), self.config.rate_limit_for(provider), now)
        })
    }

    fn try_reserve(&self, provider: &ProviderId, now: DateTime<Utc>) -> bool {
        let mut budget = self.budget_entry(provider, now);
        let reserved = budget.try_reserve(now);
        if reserved {
            debug!(
                %provider,
                used = budget.requests_used,
                limit = budget.window_limit,
                "Reserved provider request"
            );
        }
        reserved
    }

    fn exhaust_budget(&self, provider: &ProviderId) {
        let now = self.clock.now();
        self.budget_entry(provider, now).exhaust(now);
    }

    /// Entry for a key, touching its LRU position; drops it once it is
    /// past stale retention
    fn lookup(
        &self,
        provider: &ProviderId,
        query: &Query,
        now: DateTime<Utc>,
    ) -> Option<CacheEntry> {
        let mut entries = self.entries.get_mut(provider)?;
        let index = entries.get_index_of(query)?;

        if entries[index].is_expired(now, self.config.ttl, self.config.stale_retention) {
            debug!(%provider, ?query, "Dropping expired cache entry");
            entries.shift_remove_index(index);
            return None;
        }

        let last = entries.len() - 1;
        entries.move_index(index, last);
        entries.get(query).cloned()
    }

    /// Serve the entry for a key regardless of TTL, else an empty result
    fn fallback(
        &self,
        provider: &ProviderId,
        query: &Query,
        signal: ProviderError,
    ) -> CacheOutcome {
        let now = self.clock.now();
        match self.lookup(provider, query, now) {
            Some(entry) => {
                let stale = !entry.is_fresh(now, self.config.ttl);
                CacheOutcome {
                    articles: entry.articles,
                    served_from: ServedFrom::Cache,
                    stale,
                    signal: Some(signal),
                }
            }
            None => CacheOutcome::empty(signal),
        }
    }

    fn store(&self, provider: &ProviderId, query: &Query, articles: Vec<Article>) {
        let entry = CacheEntry {
            articles,
            fetched_at: self.clock.now(),
        };

        let mut entries = self.entries.entry(provider.clone()).or_default();
        entries.shift_remove(query);
        entries.insert(query.clone(), entry);

        while entries.len() > self.config.max_entries_per_provider.max(1) {
            match entries.shift_remove_index(0) {
                Some((oldest, _)) => {
                    debug!(%provider, query = ?oldest, "Evicted least recently used entry")
                }
                None => break,
            }
        }
    }
}
