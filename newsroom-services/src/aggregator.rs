//! Concurrent fan-out over providers with partial-result reporting

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use newsroom_core::{Article, ProviderError, ProviderId, Query};
use newsroom_providers::ProviderAdapter;

use crate::cache::{RateLimitedCache, ServedFrom};
use crate::dedup::{Deduplicator, NearDuplicatePolicy};

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Deadline for the whole fan-out
    pub overall_timeout: Duration,
    /// Title-similarity dedup; `None` keeps exact matching only
    pub near_duplicates: Option<NearDuplicatePolicy>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            overall_timeout: Duration::from_secs(8),
            near_duplicates: None,
        }
    }
}

/// Merged headlines plus per-provider accounting
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub articles: Vec<Article>,
    /// At least one provider failed
    pub partial: bool,
    pub errors: BTreeMap<ProviderId, ProviderError>,
    /// Providers whose articles came from an entry past its TTL
    pub stale_providers: Vec<ProviderId>,
    pub served_from: BTreeMap<ProviderId, ServedFrom>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    #[error("All {} providers failed", .errors.len())]
    AllProvidersFailed {
        errors: BTreeMap<ProviderId, ProviderError>,
    },
}

/// Fans a query out to providers through the shared cache
#[derive(Debug, Clone)]
pub struct Aggregator {
    cache: Arc<RateLimitedCache>,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(cache: Arc<RateLimitedCache>, config: AggregatorConfig) -> Self {
        Self { cache, config }
    }

    pub fn cache(&self) -> &Arc<RateLimitedCache> {
        &self.cache
    }

    /// Query every provider concurrently and merge what came back
    ///
    /// Provider order is the dedup priority. Providers that miss the overall
    /// deadline are recorded as `Unavailable`.
    #[instrument(skip(self, providers), fields(providers = providers.len()))]
    pub async fn aggregate(
        &self,
        query: &Query,
        providers: &[Arc<dyn ProviderAdapter>],
    ) -> Result<AggregateResult, AggregateError> {
        let query = query.normalized();
        if providers.is_empty() {
            return Ok(AggregateResult::default());
        }

        let deadline = tokio::time::Instant::now() + self.config.overall_timeout;
        let query_ref = &query;
        let lookups = providers.iter().map(|adapter| async move {
            let id = adapter.id().clone();
            let outcome = tokio::time::timeout_at(
                deadline,
                self.cache
                    .get_or_fetch(query_ref, &id, || adapter.fetch_articles(query_ref)),
            )
            .await;
            (id, outcome)
        });
        let outcomes = join_all(lookups).await;

        let mut merged = Vec::new();
        let mut errors = BTreeMap::new();
        let mut served_from = BTreeMap::new();
        let mut stale_providers = Vec::new();
        let mut succeeded = 0usize;

        for (provider, outcome) in outcomes {
            match outcome {
                Err(_) => {
                    warn!(
                        %provider,
                        timeout_ms = self.config.overall_timeout.as_millis() as u64,
                        "Provider timed out"
                    );
                    errors.insert(
                        provider,
                        ProviderError::unavailable(format!(
                            "no response within {} ms",
                            self.config.overall_timeout.as_millis()
                        )),
                    );
                }
                Ok(Err(e)) => {
                    warn!(%provider, error = %e, "Provider failed");
                    errors.insert(provider, e);
                }
                Ok(Ok(outcome)) => {
                    served_from.insert(provider.clone(), outcome.served_from);
                    if outcome.stale {
                        stale_providers.push(provider.clone());
                    }
                    if outcome.served_from == ServedFrom::Empty {
                        errors.insert(
                            provider,
                            outcome.signal.unwrap_or(ProviderError::RateLimited),
                        );
                    } else {
                        succeeded += 1;
                        merged.extend(outcome.articles);
                    }
                }
            }
        }

        if succeeded == 0 {
            error!(failed = errors.len(), "All providers failed");
            return Err(AggregateError::AllProvidersFailed { errors });
        }

        let priority = providers.iter().map(|p| p.id().clone()).collect();
        let mut articles = Deduplicator::new()
            .with_priority(priority)
            .with_near_duplicates(self.config.near_duplicates.clone())
            .dedupe(merged);

        order_by_recency(&mut articles);
        if let Some(page_size) = query.page_size {
            articles.truncate(page_size);
        }

        info!(
            articles = articles.len(),
            failed = errors.len(),
            stale = stale_providers.len(),
            "Aggregated headlines"
        );

        Ok(AggregateResult {
            articles,
            partial: !errors.is_empty(),
            errors,
            stale_providers,
            served_from,
        })
    }
}

/// Newest first; untimestamped articles last, keeping their relative order
pub fn order_by_recency(articles: &mut [Article]) {
    articles.sort_by(|a, b| match (a.published_at(), b.published_at()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
