//! Business logic services for the Newsroom pipeline
//!
//! This crate turns provider adapters into a single headline feed:
//! duplicate collapsing, per-provider request budgets with a write-through
//! cache, and concurrent fan-out with partial-result reporting.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod dedup;
pub mod headline_service;

pub use aggregator::{
    order_by_recency, AggregateError, AggregateResult, Aggregator, AggregatorConfig,
};
pub use cache::{
    BudgetState, CacheConfig, CacheOutcome, CacheStats, ProviderBudget, ProviderCacheStats,
    RateLimit, RateLimitedCache, ServedFrom,
};
pub use config::{ConfigError, PipelineConfig};
pub use dedup::{jaccard, title_tokens, Deduplicator, NearDuplicatePolicy};
pub use headline_service::HeadlineService;
