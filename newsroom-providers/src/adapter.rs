//! Uniform interface over upstream headline sources

use async_trait::async_trait;
use url::Url;

use newsroom_core::{Article, ProviderError, ProviderId, Query, RawArticle};

use crate::normalizer::{normalize_batch, FieldMapping};

/// Static description of a provider used by the normalizer
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub id: ProviderId,
    /// Used to resolve relative article and image links
    pub base_url: Option<Url>,
    pub mapping: FieldMapping,
}

/// One upstream headline source
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn profile(&self) -> &ProviderProfile;

    /// Fetch raw articles for a query
    ///
    /// The adapter clamps `query.page_size` to the largest page size the
    /// provider documents and applies its own retry policy.
    async fn fetch(&self, query: &Query) -> Result<Vec<RawArticle>, ProviderError>;

    fn id(&self) -> &ProviderId {
        &self.profile().id
    }

    /// Fetch and normalize, dropping records that cannot form an article
    async fn fetch_articles(&self, query: &Query) -> Result<Vec<Article>, ProviderError> {
        let raw = self.fetch(query).await?;
        Ok(normalize_batch(&raw, self.profile()))
    }
}

/// Page size to request: the query's, else `default`, clamped to `[1, max]`
pub fn effective_page_size(query: &Query, default: usize, max: usize) -> usize {
    query.page_size.unwrap_or(default).clamp(1, max.max(1))
}
