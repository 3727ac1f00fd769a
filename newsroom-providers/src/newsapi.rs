//! NewsAPI.org `top-headlines` adapter
//!
//! https://newsapi.org/docs/endpoints/top-headlines

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use newsroom_core::{ProviderError, ProviderId, Query, RawArticle};

use crate::adapter::{effective_page_size, ProviderAdapter, ProviderProfile};
use crate::http::{status_error, HttpClient};
use crate::normalizer::FieldMapping;
use crate::retry::RetryPolicy;

pub const NEWSAPI_PROVIDER_ID: &str = "newsapi";
pub const NEWSAPI_BASE_URL: &str = "https://newsapi.org";

/// Documented maximum for `pageSize`
const NEWSAPI_MAX_PAGE_SIZE: usize = 100;
const NEWSAPI_DEFAULT_PAGE_SIZE: usize = 30;

/// Placeholder NewsAPI returns for articles pulled by their publisher
const REMOVED_MARKER: &str = "[Removed]";

const NEWSAPI_MAPPING: FieldMapping = FieldMapping {
    title: &["title"],
    url: &["url"],
    description: &["description", "content"],
    image_url: &["urlToImage"],
    source_name: &["source.name"],
    published_at: &["publishedAt"],
};

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    #[serde(rename = "totalResults")]
    total_results: Option<u64>,
    articles: Option<Vec<Value>>,
    code: Option<String>,
    message: Option<String>,
}

/// NewsAPI adapter
pub struct NewsApiProvider {
    http: Arc<dyn HttpClient>,
    api_key: String,
    endpoint: String,
    profile: ProviderProfile,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl NewsApiProvider {
    /// Create an adapter for the public NewsAPI endpoint
    pub fn new(http: Arc<dyn HttpClient>, api_key: String) -> Self {
        Self {
            http,
            api_key,
            endpoint: format!("{}/v2/top-headlines", NEWSAPI_BASE_URL),
            profile: ProviderProfile {
                id: ProviderId::new(NEWSAPI_PROVIDER_ID),
                // Links point at many publishers, so there is no common base
                base_url: None,
                mapping: NEWSAPI_MAPPING,
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

    /// Request parameters for a query
    ///
    /// `top-headlines` rejects requests without any filter, so a bare
    /// "top stories" query asks for English headlines.
    fn build_params(&self, query: &Query) -> Vec<(String, String)> {
        let query = query.normalized();
        let mut params = vec![("apiKey".to_string(), self.api_key.clone())];

        if let Some(country) = &query.country {
            params.push(("country".to_string(), country.clone()));
        }
        if let Some(category) = &query.category {
            params.push(("category".to_string(), category.clone()));
        }
        if let Some(free_text) = &query.free_text {
            params.push(("q".to_string(), free_text.clone()));
        }
        if query.is_top_stories() {
            params.push(("language".to_string(), "en".to_string()));
        }

        let page_size =
            effective_page_size(&query, NEWSAPI_DEFAULT_PAGE_SIZE, NEWSAPI_MAX_PAGE_SIZE);
        params.push(("pageSize".to_string(), page_size.to_string()));

        params
    }

    async fn fetch_once(
        &self,
        params: &[(String, String)],
    ) -> Result<Vec<RawArticle>, ProviderError> {
        let response = self
            .http
            .get(&self.endpoint, params, self.request_timeout)
            .await?;

        parse_response(response.status, &response.body)
    }
}

/// Translate a NewsAPI response into raw articles or a taxonomy error
fn parse_response(status: u16, body: &[u8]) -> Result<Vec<RawArticle>, ProviderError> {
    let parsed: Result<NewsApiResponse, _> = serde_json::from_slice(body);

    if let Some(error) = status_error(status, format!("HTTP {}", status)) {
        let detail = parsed
            .ok()
            .and_then(|r| r.message)
            .unwrap_or_else(|| format!("HTTP {}", status));
        return Err(match error {
            ProviderError::Unauthorized(_) => ProviderError::Unauthorized(detail),
            ProviderError::Unavailable(_) => ProviderError::Unavailable(detail),
            ProviderError::MalformedResponse(_) => ProviderError::MalformedResponse(detail),
            ProviderError::RateLimited => ProviderError::RateLimited,
        });
    }

    let response = parsed.map_err(|e| ProviderError::malformed(format!("invalid JSON: {}", e)))?;

    if response.status != "ok" {
        let message = response
            .message
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(match response.code.as_deref() {
            Some("apiKeyInvalid" | "apiKeyMissing" | "apiKeyDisabled") => {
                ProviderError::Unauthorized(message)
            }
            Some("rateLimited" | "apiKeyExhausted") => ProviderError::RateLimited,
            Some("unexpectedError") => ProviderError::Unavailable(message),
            _ => ProviderError::MalformedResponse(message),
        });
    }

    let articles = response
        .articles
        .ok_or_else(|| ProviderError::malformed("response has no articles field"))?;

    info!(
        total_results = response.total_results.unwrap_or_default(),
        returned = articles.len(),
        "Received NewsAPI headlines"
    );

    Ok(articles
        .into_iter()
        .filter(|a| a.get("title").and_then(Value::as_str) != Some(REMOVED_MARKER))
        .map(RawArticle::new)
        .collect())
}

#[async_trait]
impl ProviderAdapter for NewsApiProvider {
    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    #[instrument(skip(self), fields(provider = NEWSAPI_PROVIDER_ID))]
    async fn fetch(&self, query: &Query) -> Result<Vec<RawArticle>, ProviderError> {
        let params = self.build_params(query);
        let result = self
            .retry
            .run(&self.profile.id, || self.fetch_once(&params))
            .await;

        if let Err(ProviderError::MalformedResponse(detail)) = &result {
            warn!(%detail, "NewsAPI returned a malformed response");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, TransportError};
    use crate::testing::ScriptedHttp;

    fn ok_body() -> &'static str {
        r#"{
            "status": "ok",
            "totalResults": 3,
            "articles": [
                {"source": {"id": null, "name": "The Hindu"}, "title": "ISRO readies launch",
                 "url": "https://example.in/isro", "publishedAt": "2025-03-01T09:00:00Z"},
                {"source": {"id": null, "name": "[Removed]"}, "title": "[Removed]",
                 "url": "https://removed.com"},
                {"source": {"id": "mint", "name": "Mint"}, "title": "Startups raise funds",
                 "url": "https://example.in/funds", "publishedAt": "2025-03-01T08:00:00Z"}
            ]
        }"#
    }

    #[tokio::test]
    async fn test_fetch_success_filters_removed() {
        let http = ScriptedHttp::new(vec![Ok(HttpResponse::new(200, ok_body()))]);
        let provider = NewsApiProvider::new(http.clone(), "key".into());

        let query = Query::top_stories().with_country("in").with_category("technology");
        let articles = provider.fetch_articles(&query).await.unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].source_name(), Some("The Hindu"));
        assert_eq!(http.param(0, "country").as_deref(), Some("in"));
        assert_eq!(http.param(0, "category").as_deref(), Some("technology"));
        assert_eq!(http.param(0, "pageSize").as_deref(), Some("30"));
        assert_eq!(http.param(0, "language"), None);
    }

    #[tokio::test]
    async fn test_page_size_clamped() {
        let http = ScriptedHttp::new(vec![Ok(HttpResponse::new(200, ok_body()))]);
        let provider = NewsApiProvider::new(http.clone(), "key".into());

        provider
            .fetch(&Query::top_stories().with_page_size(1000))
            .await
            .unwrap();

        assert_eq!(http.param(0, "pageSize").as_deref(), Some("100"));
        assert_eq!(http.param(0, "language").as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_unauthorized_not_retried() {
        let body = r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid"}"#;
        let http = ScriptedHttp::new(vec![
            Ok(HttpResponse::new(401, body)),
            Ok(HttpResponse::new(200, ok_body())),
        ]);
        let provider = NewsApiProvider::new(http.clone(), "bad".into());

        let result = provider.fetch(&Query::top_stories()).await;

        assert_eq!(
            result,
            Err(ProviderError::Unauthorized("Your API key is invalid".into()))
        );
        assert_eq!(http.requests.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_status() {
        let body = r#"{"status":"error","code":"rateLimited","message":"Too many requests"}"#;
        let http = ScriptedHttp::new(vec![Ok(HttpResponse::new(429, body))]);
        let provider = NewsApiProvider::new(http.clone(), "key".into());

        assert_eq!(
            provider.fetch(&Query::top_stories()).await,
            Err(ProviderError::RateLimited)
        );
        assert_eq!(http.requests.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_retried_then_succeeds() {
        let http = ScriptedHttp::new(vec![
            Err(TransportError::Timeout),
            Ok(HttpResponse::new(502, "bad gateway")),
            Ok(HttpResponse::new(200, ok_body())),
        ]);
        let provider = NewsApiProvider::new(http.clone(), "key".into());

        let raw = provider.fetch(&Query::top_stories()).await.unwrap();

        assert_eq!(raw.len(), 2);
        assert_eq!(http.requests.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let http = ScriptedHttp::new(vec![Ok(HttpResponse::new(200, "<html>oops</html>"))]);
        let provider = NewsApiProvider::new(http, "key".into());

        assert!(matches!(
            provider.fetch(&Query::top_stories()).await,
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_relative_image_from_publisher_dropped() {
        let body = r#"{
            "status": "ok",
            "totalResults": 1,
            "articles": [
                {"source": {"id": null, "name": "Publisher"}, "title": "Story",
                 "url": "https://publisher.example/story", "urlToImage": "/img/a.png"}
            ]
        }"#;
        let http = ScriptedHttp::new(vec![Ok(HttpResponse::new(200, body))]);
        let provider = NewsApiProvider::new(http, "key".into());

        let articles = provider.fetch_articles(&Query::top_stories()).await.unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].url().as_str(), "https://publisher.example/story");
        assert_eq!(articles[0].image_url(), None);
    }

    #[test]
    fn test_error_code_in_ok_status() {
        let body = br#"{"status":"error","code":"parametersMissing","message":"missing"}"#;
        assert_eq!(
            parse_response(200, body),
            Err(ProviderError::MalformedResponse("missing".into()))
        );

        let exhausted =
            br#"{"status":"error","code":"apiKeyExhausted","message":"Too many requests today"}"#;
        assert_eq!(parse_response(200, exhausted), Err(ProviderError::RateLimited));

        let disabled = br#"{"status":"error","code":"apiKeyDisabled","message":"disabled"}"#;
        assert_eq!(
            parse_response(200, disabled),
            Err(ProviderError::Unauthorized("disabled".into()))
        );
    }
}
