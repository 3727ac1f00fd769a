//! Raw provider article → canonical [`Article`]
//!
//! Each provider declares a [`FieldMapping`]: for every canonical field, the
//! ordered list of dotted paths to try in the raw object. The normalizer never
//! guesses at field names outside that table.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;
use url::{ParseError, Url};

use newsroom_core::{collapse_whitespace, Article, RawArticle};

use crate::adapter::ProviderProfile;

/// Per-provider field lookup table
#[derive(Debug, Clone)]
pub struct FieldMapping {
    pub title: &'static [&'static str],
    pub url: &'static [&'static str],
    pub description: &'static [&'static str],
    pub image_url: &'static [&'static str],
    pub source_name: &'static [&'static str],
    pub published_at: &'static [&'static str],
}

fn first_str<'a>(raw: &'a RawArticle, paths: &[&str]) -> Option<&'a str> {
    paths.iter().find_map(|path| raw.get_str(path))
}

/// Normalize one raw article
///
/// Returns `None` when the record has neither a usable title nor a usable
/// URL, or when it lacks a resolvable URL. A missing title falls back to the
/// description.
pub fn normalize(raw: &RawArticle, profile: &ProviderProfile) -> Option<Article> {
    let mapping = &profile.mapping;
    let base_url = profile.base_url.as_ref();

    let title = first_str(raw, mapping.title).map(collapse_whitespace);
    let url_text = first_str(raw, mapping.url);

    if title.is_none() && url_text.is_none() {
        debug!(provider = %profile.id, "Dropping raw article without title or url");
        return None;
    }

    let Some(url) = url_text.and_then(|text| resolve_url(text, base_url)) else {
        debug!(provider = %profile.id, url = ?url_text, "Dropping raw article without usable url");
        return None;
    };

    let description = first_str(raw, mapping.description)
        .map(strip_html)
        .filter(|d| !d.is_empty());

    let title = match title.filter(|t| !t.is_empty()) {
        Some(title) => title,
        None => description.clone()?,
    };

    let mut article = Article::new(&title, url, profile.id.clone())?;

    if let Some(description) = &description {
        article = article.with_description(description);
    }
    if let Some(image_url) =
        first_str(raw, mapping.image_url).and_then(|text| resolve_url(text, base_url))
    {
        article = article.with_image_url(image_url);
    }
    if let Some(source_name) = first_str(raw, mapping.source_name) {
        article = article.with_source_name(source_name);
    }
    if let Some(published_at) = first_str(raw, mapping.published_at).and_then(parse_timestamp) {
        article = article.with_published_at(published_at);
    }

    Some(article)
}

/// Normalize a batch, keeping input order and logging how many were dropped
pub fn normalize_batch(raw: &[RawArticle], profile: &ProviderProfile) -> Vec<Article> {
    let articles: Vec<Article> = raw.iter().filter_map(|r| normalize(r, profile)).collect();

    if articles.len() < raw.len() {
        debug!(
            provider = %profile.id,
            dropped = raw.len() - articles.len(),
            kept = articles.len(),
            "Dropped unusable raw articles"
        );
    }

    articles
}

/// Parse an absolute http(s) URL, resolving relative links against `base`
///
/// Relative links without a base are rejected rather than emitted broken.
fn resolve_url(text: &str, base: Option<&Url>) -> Option<Url> {
    let text = text.trim();
    let url = match Url::parse(text) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => base?.join(text).ok()?,
        Err(_) => return None,
    };

    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Parse RFC 3339, RFC 2822, or a naive `YYYY-MM-DD HH:MM:SS` (UTC)
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_rfc2822(text))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Strip HTML tags and common entities, collapsing whitespace
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                result.push(' ');
            }
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    collapse_whitespace(
        &result
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&"),
    )
}
