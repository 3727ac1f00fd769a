//! Duplicate collapsing for merged provider output
//!
//! The exact pass drops repeats of an article id or canonical URL. The
//! optional near-duplicate pass collapses headlines that read the same and
//! were published close together, preferring higher-priority providers.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use newsroom_core::{Article, ProviderId};

/// Settings for the title-similarity pass
#[derive(Debug, Clone, PartialEq)]
pub struct NearDuplicatePolicy {
    /// Minimum Jaccard similarity of title token sets, in `(0, 1]`
    pub threshold: f64,
    /// Maximum distance between the two `published_at` values
    pub window: Duration,
}

impl Default for NearDuplicatePolicy {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            window: Duration::from_secs(6 * 60 * 60),
        }
    }
}

/// Stable, idempotent article deduplicator
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    near_duplicates: Option<NearDuplicatePolicy>,
    priority: Vec<ProviderId>,
}

impl Deduplicator {
    /// Exact matching only
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_near_duplicates(mut self, policy: Option<NearDuplicatePolicy>) -> Self {
        self.near_duplicates = policy;
        self
    }

    /// Provider order used to pick the survivor among near-duplicates
    ///
    /// Providers not listed rank after every listed one.
    pub fn with_priority(mut self, priority: Vec<ProviderId>) -> Self {
        self.priority = priority;
        self
    }

    pub fn dedupe(&self, articles: Vec<Article>) -> Vec<Article> {
        let before = articles.len();
        let unique = exact_pass(articles);

        let result = match &self.near_duplicates {
            Some(policy) => self.similarity_pass(unique, policy),
            None => unique,
        };

        if result.len() < before {
            debug!(before, after = result.len(), "Collapsed duplicate articles");
        }
        result
    }

    fn rank(&self, provider: &ProviderId) -> usize {
        self.priority
            .iter()
            .position(|p| p == provider)
            .unwrap_or(self.priority.len())
    }

    fn similarity_pass(
        &self,
        articles: Vec<Article>,
        policy: &NearDuplicatePolicy,
    ) -> Vec<Article> {
        let tokens: Vec<HashSet<String>> =
            articles.iter().map(|a| title_tokens(a.title())).collect();

        let mut order: Vec<usize> = (0..articles.len()).collect();
        order.sort_by_key(|&i| (self.rank(articles[i].provider()), i));

        let mut kept: Vec<usize> = Vec::with_capacity(articles.len());
        for candidate in order {
            let duplicate_of = kept.iter().copied().find(|&survivor| {
                within_window(
                    articles[candidate].published_at(),
                    articles[survivor].published_at(),
                    policy.window,
                ) && jaccard(&tokens[candidate], &tokens[survivor]) >= policy.threshold
            });

            match duplicate_of {
                Some(survivor) => debug!(
                    dropped = articles[candidate].id(),
                    kept = articles[survivor].id(),
                    "Dropping near-duplicate headline"
                ),
                None => kept.push(candidate),
            }
        }

        let mut keep = vec![false; articles.len()];
        for index in kept {
            keep[index] = true;
        }

        articles
            .into_iter()
            .zip(keep)
            .filter_map(|(article, keep)| keep.then_some(article))
            .collect()
    }
}

/// First occurrence wins on either id or canonical URL
fn exact_pass(articles: Vec<Article>) -> Vec<Article> {
    let mut seen_ids = HashSet::new();
    let mut seen_urls = HashSet::new();

    articles
        .into_iter()
        .filter(|article| {
            let new_id = seen_ids.insert(article.id().to_string());
            let new_url = seen_urls.insert(article.canonical_url());
            new_id && new_url
        })
        .collect()
}

fn within_window(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>, window: Duration) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs().to_std().is_ok_and(|gap| gap <= window),
        _ => false,
    }
}

/// Lowercased alphanumeric words of a title
pub fn title_tokens(title: &str) -> HashSet<String> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard similarity of two token sets; two empty sets score zero
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
