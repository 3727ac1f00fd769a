//! Router test helpers

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use newsroom_core::{ProviderError, ProviderId, Query, RawArticle, SystemClock};
use newsroom_providers::{FieldMapping, ProviderAdapter, ProviderProfile};
use newsroom_services::{
    Aggregator, AggregatorConfig, CacheConfig, HeadlineService, RateLimitedCache,
};

use crate::AppState;

/// Provider that answers every fetch with the same result
pub struct FixedProvider {
    profile: ProviderProfile,
    result: Result<Vec<RawArticle>, ProviderError>,
}

impl FixedProvider {
    pub fn new(
        id: &str,
        result: Result<Vec<RawArticle>, ProviderError>,
    ) -> Arc<dyn ProviderAdapter> {
        Arc::new(Self {
            profile: ProviderProfile {
                id: ProviderId::new(id),
                base_url: None,
                mapping: FieldMapping {
                    title: &["title"],
                    url: &["url"],
                    description: &[],
                    image_url: &[],
                    source_name: &[],
                    published_at: &["publishedAt"],
                },
            },
            result,
        })
    }
}

#[async_trait]
impl ProviderAdapter for FixedProvider {
    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    async fn fetch(&self, _query: &Query) -> Result<Vec<RawArticle>, ProviderError> {
        self.result.clone()
    }
}

pub fn state(providers: Vec<Arc<dyn ProviderAdapter>>) -> AppState {
    state_with_cache(providers, CacheConfig::default())
}

pub fn state_with_cache(providers: Vec<Arc<dyn ProviderAdapter>>, config: CacheConfig) -> AppState {
    let cache = RateLimitedCache::new(config, Arc::new(SystemClock));
    let aggregator = Aggregator::new(Arc::new(cache), AggregatorConfig::default());
    AppState {
        headline_service: Arc::new(HeadlineService::new(providers, aggregator)),
    }
}

/// Send a GET through the full router and decode the JSON body
pub async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
    let response = crate::app(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}
