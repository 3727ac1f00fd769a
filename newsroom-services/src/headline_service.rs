//! Headline Service
//!
//! Owns the configured provider adapters and the shared aggregator, and is
//! the single entry point the API layer talks to.

use std::sync::Arc;

use tracing::info;

use newsroom_core::{Clock, ProviderId, Query};
use newsroom_providers::google_news::GOOGLE_NEWS_PROVIDER_ID;
use newsroom_providers::newsapi::NEWSAPI_PROVIDER_ID;
use newsroom_providers::{
    GoogleNewsProvider, HttpClient, NewsApiProvider, ProviderAdapter, RetryPolicy,
};

use crate::aggregator::{AggregateError, AggregateResult, Aggregator};
use crate::cache::{CacheStats, RateLimitedCache};
use crate::config::{ConfigError, PipelineConfig};

pub struct HeadlineService {
    providers: Vec<Arc<dyn ProviderAdapter>>,
    aggregator: Aggregator,
}

impl HeadlineService {
    pub fn new(providers: Vec<Arc<dyn ProviderAdapter>>, aggregator: Aggregator) -> Self {
        Self {
            providers,
            aggregator,
        }
    }

    /// Build adapters, cache and aggregator from configuration
    pub fn from_config(
        config: &PipelineConfig,
        http: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let retry = RetryPolicy::default().with_max_attempts(config.retry_attempts);
        let mut providers: Vec<Arc<dyn ProviderAdapter>> = Vec::new();

        for id in &config.providers {
            let adapter: Arc<dyn ProviderAdapter> = match id.as_str() {
                NEWSAPI_PROVIDER_ID => {
                    let key = config
                        .newsapi_key
                        .clone()
                        .ok_or(ConfigError::MissingVar("NEWSAPI_KEY"))?;
                    Arc::new(
                        NewsApiProvider::new(http.clone(), key)
                            .with_retry(retry.clone())
                            .with_request_timeout(config.request_timeout),
                    )
                }
                GOOGLE_NEWS_PROVIDER_ID => Arc::new(
                    GoogleNewsProvider::new(http.clone())
                        .with_retry(retry.clone())
                        .with_request_timeout(config.request_timeout),
                ),
                other => return Err(ConfigError::UnknownProvider(other.to_string())),
            };

            let limit = config.rate_limit_for(id);
            info!(
                provider = %id,
                window_limit = limit.window_limit,
                window_secs = limit.window_duration.as_secs(),
                "Enabled headline provider"
            );
            providers.push(adapter);
        }

        let cache = Arc::new(RateLimitedCache::new(config.cache_config(), clock));
        let aggregator = Aggregator::new(cache, config.aggregator_config());

        Ok(Self::new(providers, aggregator))
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id().clone()).collect()
    }

    pub async fn headlines(&self, query: &Query) -> Result<AggregateResult, AggregateError> {
        self.aggregator.aggregate(query, &self.providers).await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.aggregator.cache().stats()
    }

    pub fn purge_expired(&self) -> usize {
        self.aggregator.cache().purge_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsroom_core::SystemClock;
    use newsroom_providers::ReqwestHttpClient;

    #[test]
    fn test_from_config_keeps_provider_order() {
        let mut config = PipelineConfig::default();
        config.providers = vec![ProviderId::new("google_news"), ProviderId::new("newsapi")];
        config.newsapi_key = Some("key".to_string());

        let service = HeadlineService::from_config(
            &config,
            Arc::new(ReqwestHttpClient::new()),
            Arc::new(SystemClock),
        )
        .unwrap();

        assert_eq!(
            service.provider_ids(),
            vec![ProviderId::new("google_news"), ProviderId::new("newsapi")]
        );
    }

    #[test]
    fn test_from_config_requires_newsapi_key() {
        let config = PipelineConfig::default();

        let result = HeadlineService::from_config(
            &config,
            Arc::new(ReqwestHttpClient::new()),
            Arc::new(SystemClock),
        );

        assert!(matches!(result, Err(ConfigError::MissingVar("NEWSAPI_KEY"))));
    }
}
