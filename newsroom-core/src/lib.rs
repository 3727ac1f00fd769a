//! Core types for the Newsroom headline pipeline
//!
//! This crate defines the shared data structures used across the pipeline,
//! including the canonical article record, the query value object, the
//! provider error taxonomy and the injectable clock.

pub mod article;
pub mod canonical;
pub mod clock;
pub mod error;
pub mod query;

pub use article::{Article, ProviderId, RawArticle};
pub use canonical::{
    canonical_url_key, collapse_whitespace, content_id, normalize_title, strip_tracking,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, ProviderError};
pub use query::Query;
