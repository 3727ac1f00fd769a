//! Article data structures for headline aggregation

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::canonical::{canonical_url_key, collapse_whitespace, content_id, strip_tracking};

/// Identifier of an upstream headline provider (e.g. "newsapi")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One article exactly as a provider delivered it
///
/// JSON providers pass their article objects through unchanged; feed
/// providers convert each entry into an object first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawArticle(Value);

impl RawArticle {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Look up a dotted path such as `source.name`
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.0, |value, segment| value.get(segment))
    }

    /// Look up a dotted path holding a non-blank string
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get_path(path)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Canonical, provider-agnostic article
///
/// Fields are private so an article cannot be changed after creation; the
/// `with_*` builders consume the value and never touch title or URL, which
/// keeps `id` consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    /// Content hash of normalized title + canonical URL
    id: String,
    title: String,
    url: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    published_at: Option<DateTime<Utc>>,
    /// Adapter that produced this article
    provider: ProviderId,
}

impl Article {
    /// Create an article; returns `None` when the title is blank
    pub fn new(title: &str, url: Url, provider: ProviderId) -> Option<Self> {
        let title = collapse_whitespace(title);
        if title.is_empty() {
            return None;
        }
        let url = strip_tracking(&url);
        Some(Self {
            id: content_id(&title, &url),
            title,
            url,
            description: None,
            image_url: None,
            source_name: None,
            published_at: None,
            provider,
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        let description = collapse_whitespace(description);
        self.description = (!description.is_empty()).then_some(description);
        self
    }

    pub fn with_image_url(mut self, image_url: Url) -> Self {
        self.image_url = Some(image_url);
        self
    }

    pub fn with_source_name(mut self, source_name: &str) -> Self {
        let source_name = collapse_whitespace(source_name);
        self.source_name = (!source_name.is_empty()).then_some(source_name);
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Lower-cased canonical URL used for duplicate detection
    pub fn canonical_url(&self) -> String {
        canonical_url_key(&self.url)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn image_url(&self) -> Option<&Url> {
        self.image_url.as_ref()
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }
}
