//! Headline query value object

use serde::{Deserialize, Serialize};

use crate::canonical::collapse_whitespace;

/// Filters for one headline request; also the cache key
///
/// An empty query is legal and means "top stories".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    /// Two-letter country code (e.g. "in", "us")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Topic category (e.g. "technology")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Free-text search terms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_text: Option<String>,
    /// Requested number of articles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

impl Query {
    pub fn top_stories() -> Self {
        Self::default()
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_free_text(mut self, free_text: &str) -> Self {
        self.free_text = Some(free_text.to_string());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Canonical form: trimmed text, blank fields absent, codes lower-cased
    ///
    /// Equivalent requests normalize to equal queries and share a cache entry.
    pub fn normalized(&self) -> Self {
        fn clean(field: &Option<String>, lowercase: bool) -> Option<String> {
            field.as_deref().map(collapse_whitespace).and_then(|s| {
                if s.is_empty() {
                    None
                } else if lowercase {
                    Some(s.to_lowercase())
                } else {
                    Some(s)
                }
            })
        }

        Self {
            country: clean(&self.country, true),
            category: clean(&self.category, true),
            free_text: clean(&self.free_text, false),
            page_size: self.page_size.filter(|&n| n > 0),
        }
    }

    /// True when no filter dimension is set
    pub fn is_top_stories(&self) -> bool {
        let q = self.normalized();
        q.country.is_none() && q.category.is_none() && q.free_text.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_equivalence() {
        let a = Query::top_stories()
            .with_country(" IN ")
            .with_category("Technology")
            .with_free_text("  ");
        let b = Query::top_stories().with_country("in").with_category("technology");
        assert_eq!(a.normalized(), b.normalized());
    }

    #[test]
    fn test_top_stories() {
        assert!(Query::top_stories().is_top_stories());
        assert!(Query::top_stories().with_page_size(10).is_top_stories());
        assert!(!Query::top_stories().with_free_text("election").is_top_stories());
    }

    #[test]
    fn test_zero_page_size_is_absent() {
        assert_eq!(Query::top_stories().with_page_size(0).normalized().page_size, None);
    }
}
