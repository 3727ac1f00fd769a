//! Pipeline configuration loaded from environment variables

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use newsroom_core::ProviderId;
use newsroom_providers::google_news::GOOGLE_NEWS_PROVIDER_ID;
use newsroom_providers::newsapi::NEWSAPI_PROVIDER_ID;

use crate::aggregator::AggregatorConfig;
use crate::cache::{CacheConfig, RateLimit};
use crate::dedup::NearDuplicatePolicy;

/// Providers this build knows how to construct
pub const KNOWN_PROVIDERS: &[&str] = &[NEWSAPI_PROVIDER_ID, GOOGLE_NEWS_PROVIDER_ID];

/// Everything needed to assemble the headline pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Enabled providers; order is the dedup priority
    pub providers: Vec<ProviderId>,
    pub newsapi_key: Option<String>,
    pub rate_limits: HashMap<ProviderId, RateLimit>,
    pub default_rate_limit: RateLimit,
    pub cache_ttl: Duration,
    pub cache_stale_retention: Duration,
    pub cache_max_entries: usize,
    /// Jaccard threshold for near-duplicate titles; `None` disables the pass
    pub dedup_similarity_threshold: Option<f64>,
    pub dedup_window: Duration,
    pub overall_timeout: Duration,
    pub request_timeout: Duration,
    pub retry_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut rate_limits = HashMap::new();
        // Free developer plan allows 100 requests per day
        rate_limits.insert(
            ProviderId::new(NEWSAPI_PROVIDER_ID),
            RateLimit::new(100, Duration::from_secs(24 * 60 * 60)),
        );

        Self {
            providers: KNOWN_PROVIDERS.iter().copied().map(ProviderId::new).collect(),
            newsapi_key: None,
            rate_limits,
            default_rate_limit: RateLimit::default(),
            cache_ttl: Duration::from_secs(300),
            cache_stale_retention: Duration::from_secs(24 * 60 * 60),
            cache_max_entries: 100,
            dedup_similarity_threshold: None,
            dedup_window: Duration::from_secs(6 * 60 * 60),
            overall_timeout: Duration::from_millis(8000),
            request_timeout: Duration::from_millis(5000),
            retry_attempts: 3,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the process environment
    ///
    /// Reads:
    /// - NEWSROOM_PROVIDERS: comma-separated provider ids
    /// - NEWSAPI_KEY: required when `newsapi` is enabled
    /// - NEWSROOM_RATE_LIMIT_<PROVIDER>: `limit/seconds`
    /// - NEWSROOM_CACHE_TTL_SECS, NEWSROOM_CACHE_STALE_SECS, NEWSROOM_CACHE_MAX_ENTRIES
    /// - NEWSROOM_DEDUP_THRESHOLD, NEWSROOM_DEDUP_WINDOW_SECS
    /// - NEWSROOM_TIMEOUT_MS, NEWSROOM_REQUEST_TIMEOUT_MS, NEWSROOM_RETRY_ATTEMPTS
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(list) = get("NEWSROOM_PROVIDERS") {
            let mut providers = Vec::new();
            for id in list.split(',').map(str::trim).filter(|id| !id.is_empty()) {
                let id = id.to_lowercase();
                if !KNOWN_PROVIDERS.contains(&id.as_str()) {
                    return Err(ConfigError::UnknownProvider(id));
                }
                let id = ProviderId::new(id);
                if !providers.contains(&id) {
                    providers.push(id);
                }
            }
            if providers.is_empty() {
                return Err(ConfigError::EmptyProviderList);
            }
            config.providers = providers;
        }

        config.newsapi_key = get("NEWSAPI_KEY");
        if config.providers.iter().any(|p| p.as_str() == NEWSAPI_PROVIDER_ID)
            && config.newsapi_key.is_none()
        {
            return Err(ConfigError::MissingVar("NEWSAPI_KEY"));
        }

        for provider in &config.providers {
            let key = format!("NEWSROOM_RATE_LIMIT_{}", provider.as_str().to_uppercase());
            if let Some(value) = get(&key) {
                let limit = parse_rate_limit(&value).ok_or_else(|| ConfigError::InvalidValue {
                    field: key.clone(),
                    value: value.clone(),
                })?;
                config.rate_limits.insert(provider.clone(), limit);
            }
        }

        if let Some(secs) = parse_var::<u64>(&get, "NEWSROOM_CACHE_TTL_SECS")? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&get, "NEWSROOM_CACHE_STALE_SECS")? {
            config.cache_stale_retention = Duration::from_secs(secs);
        }
        if let Some(max) = parse_var::<usize>(&get, "NEWSROOM_CACHE_MAX_ENTRIES")? {
            if max == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "NEWSROOM_CACHE_MAX_ENTRIES".to_string(),
                    value: max.to_string(),
                });
            }
            config.cache_max_entries = max;
        }
        if let Some(threshold) = parse_var::<f64>(&get, "NEWSROOM_DEDUP_THRESHOLD")? {
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(ConfigError::InvalidValue {
                    field: "NEWSROOM_DEDUP_THRESHOLD".to_string(),
                    value: threshold.to_string(),
                });
            }
            config.dedup_similarity_threshold = Some(threshold);
        }
        if let Some(secs) = parse_var::<u64>(&get, "NEWSROOM_DEDUP_WINDOW_SECS")? {
            config.dedup_window = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>(&get, "NEWSROOM_TIMEOUT_MS")? {
            config.overall_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&get, "NEWSROOM_REQUEST_TIMEOUT_MS")? {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_var::<u32>(&get, "NEWSROOM_RETRY_ATTEMPTS")? {
            config.retry_attempts = attempts.max(1);
        }

        Ok(config)
    }

    pub fn rate_limit_for(&self, provider: &ProviderId) -> RateLimit {
        self.rate_limits
            .get(provider)
            .copied()
            .unwrap_or(self.default_rate_limit)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: self.cache_ttl,
            stale_retention: self.cache_stale_retention,
            max_entries_per_provider: self.cache_max_entries,
            default_rate_limit: self.default_rate_limit,
            rate_limits: self.rate_limits.clone(),
        }
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            overall_timeout: self.overall_timeout,
            near_duplicates: self.dedup_similarity_threshold.map(|threshold| NearDuplicatePolicy {
                threshold,
                window: self.dedup_window,
            }),
        }
    }
}

fn parse_var<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match get(key) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: key.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

/// Parse `limit/seconds`, e.g. `100/86400`
fn parse_rate_limit(value: &str) -> Option<RateLimit> {
    let (limit, secs) = value.split_once('/')?;
    let limit: u32 = limit.trim().parse().ok()?;
    let secs: u64 = secs.trim().parse().ok()?;
    (secs > 0).then(|| RateLimit::new(limit, Duration::from_secs(secs)))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value:?}")]
    InvalidValue { field: String, value: String },

    #[error("Unknown provider {0:?}")]
    UnknownProvider(String),

    #[error("NEWSROOM_PROVIDERS cannot be empty")]
    EmptyProviderList,

    #[error("{0} must be set")]
    MissingVar(&'static str),
}
