//! Google News RSS search adapter
//!
//! Uses the public RSS endpoints: `/rss` for top stories and `/rss/search`
//! for filtered queries. Items are converted into JSON objects so the
//! normalizer can treat them like any other provider payload.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument, warn};
use url::Url;

use newsroom_core::{ProviderError, ProviderId, Query, RawArticle};

use crate::adapter::{effective_page_size, ProviderAdapter, ProviderProfile};
use crate::http::{status_error, HttpClient};
use crate::normalizer::FieldMapping;
use crate::retry::RetryPolicy;

pub const GOOGLE_NEWS_PROVIDER_ID: &str = "google_news";
pub const GOOGLE_NEWS_BASE_URL: &str = "https://news.google.com";

/// Google News feeds carry at most 100 items
const GOOGLE_NEWS_MAX_PAGE_SIZE: usize = 100;
const GOOGLE_NEWS_DEFAULT_PAGE_SIZE: usize = 30;
const DEFAULT_COUNTRY: &str = "US";

const GOOGLE_NEWS_MAPPING: FieldMapping = FieldMapping {
    title: &["title"],
    url: &["link"],
    description: &["description"],
    image_url: &["image"],
    source_name: &["source"],
    published_at: &["pubDate", "dcDate"],
};

/// Google News RSS adapter
pub struct GoogleNewsProvider {
    http: Arc<dyn HttpClient>,
    base_url: String,
    profile: ProviderProfile,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl GoogleNewsProvider {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            base_url: GOOGLE_NEWS_BASE_URL.to_string(),
            profile: ProviderProfile {
                id: ProviderId::new(GOOGLE_NEWS_PROVIDER_ID),
                base_url: Url::parse(GOOGLE_NEWS_BASE_URL).ok(),
                mapping: GOOGLE_NEWS_MAPPING,
            },
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Endpoint and parameters for a query
    fn build_request(&self, query: &Query) -> (String, Vec<(String, String)>) {
        let query = query.normalized();
        let country = query
            .country
            .as_deref()
            .unwrap_or(DEFAULT_COUNTRY)
            .to_uppercase();

        let mut params = Vec::new();
        let terms: Vec<&str> = [query.free_text.as_deref(), query.category.as_deref()]
            .into_iter()
            .flatten()
            .collect();

        let endpoint = if terms.is_empty() {
            format!("{}/rss", self.base_url)
        } else {
            params.push(("q".to_string(), terms.join(" ")));
            format!("{}/rss/search", self.base_url)
        };

        params.push(("hl".to_string(), format!("en-{}", country)));
        params.push(("gl".to_string(), country.clone()));
        params.push(("ceid".to_string(), format!("{}:en", country)));

        (endpoint, params)
    }

    async fn fetch_once(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<Vec<RawArticle>, ProviderError> {
        let response = self
            .http
            .get(endpoint, params, self.request_timeout)
            .await?;

        if let Some(error) = status_error(
            response.status,
            format!("Google News returned status {}", response.status),
        ) {
            return Err(error);
        }

        let channel = rss::Channel::read_from(&response.body[..]).map_err(|e| {
            ProviderError::malformed(format!("Failed to parse Google News RSS: {}", e))
        })?;

        Ok(channel.items().iter().map(item_to_raw).collect())
    }
}

/// Convert one RSS item into the object shape named by the field mapping
fn item_to_raw(item: &rss::Item) -> RawArticle {
    let source = item
        .source()
        .and_then(|s| s.title())
        .map(str::to_string);
    let title = item
        .title()
        .map(|t| strip_source_suffix(t, source.as_deref()));

    let image = item
        .enclosure()
        .filter(|e| e.mime_type().starts_with("image/"))
        .map(|e| e.url().to_string())
        .or_else(|| item.description().and_then(extract_image_from_html));

    let dc_date = item
        .dublin_core_ext()
        .and_then(|dc| dc.dates().first().cloned());

    RawArticle::new(json!({
        "title": title,
        "link": item.link(),
        "description": item.description(),
        "pubDate": item.pub_date(),
        "dcDate": dc_date,
        "source": source,
        "image": image,
    }))
}

/// Google News titles end with " - Publisher"; drop that suffix
fn strip_source_suffix(title: &str, source: Option<&str>) -> String {
    match source {
        Some(source) => title
            .strip_suffix(source)
            .and_then(|rest| rest.trim_end().strip_suffix('-'))
            .map(|rest| rest.trim_end().to_string())
            .unwrap_or_else(|| title.to_string()),
        None => title.to_string(),
    }
}

/// Extract the first non-tracking `<img src>` from description HTML
fn extract_image_from_html(html: &str) -> Option<String> {
    let img_pattern = regex::Regex::new(r#"<img[^>]+src=["']([^"']+)["']"#).ok()?;
    let caps = img_pattern.captures(html)?;
    let url = caps.get(1)?.as_str();
    // Skip tiny tracking pixels and spacers
    if url.contains("1x1") || url.contains("pixel") || url.contains("spacer") {
        return None;
    }
    Some(url.to_string())
}

#[async_trait]
impl ProviderAdapter for GoogleNewsProvider {
    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    #[instrument(skip(self), fields(provider = GOOGLE_NEWS_PROVIDER_ID))]
    async fn fetch(&self, query: &Query) -> Result<Vec<RawArticle>, ProviderError> {
        let (endpoint, params) = self.build_request(query);
        let page_size =
            effective_page_size(query, GOOGLE_NEWS_DEFAULT_PAGE_SIZE, GOOGLE_NEWS_MAX_PAGE_SIZE);

        let result = self
            .retry
            .run(&self.profile.id, || self.fetch_once(&endpoint, &params))
            .await;

        match result {
            Ok(mut items) => {
                debug!(returned = items.len(), page_size, "Received Google News items");
                items.truncate(page_size);
                Ok(items)
            }
            Err(e) => {
                if let ProviderError::MalformedResponse(detail) = &e {
                    warn!(%detail, "Google News returned a malformed response");
                }
                Err(e)
            }
        }
    }
}
