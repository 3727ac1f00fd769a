//! Headline provider adapters
//!
//! This crate provides adapters for fetching headlines from:
//! - NewsAPI: REST `top-headlines` endpoint (API key required)
//! - Google News: RSS search feeds (no key)
//!
//! Every adapter returns raw provider articles; the [`normalizer`] turns them
//! into canonical [`newsroom_core::Article`]s through a per-provider field
//! mapping table.

pub mod adapter;
pub mod google_news;
pub mod http;
pub mod newsapi;
pub mod normalizer;
pub mod retry;

#[cfg(test)]
mod testing;

pub use adapter::{ProviderAdapter, ProviderProfile};
pub use google_news::GoogleNewsProvider;
pub use http::{HttpClient, HttpResponse, ReqwestHttpClient, TransportError};
pub use newsapi::NewsApiProvider;
pub use normalizer::{normalize, FieldMapping};
pub use retry::RetryPolicy;
