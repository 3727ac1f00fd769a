//! Provider error taxonomy

use serde::Serialize;
use thiserror::Error;

/// Errors a provider fetch can end in
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProviderError {
    /// Bad or missing credential; fatal, never retried or cached
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request budget exhausted, locally or upstream
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Network failure, timeout or 5xx
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Response did not match the provider's schema
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Discriminant of [`ProviderError`], used to parameterize retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthorized,
    RateLimited,
    Unavailable,
    MalformedResponse,
}

impl ProviderError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ProviderError::Unauthorized(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        ProviderError::Unavailable(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        ProviderError::MalformedResponse(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Unauthorized(_) => ErrorKind::Unauthorized,
            ProviderError::RateLimited => ErrorKind::RateLimited,
            ProviderError::Unavailable(_) => ErrorKind::Unavailable,
            ProviderError::MalformedResponse(_) => ErrorKind::MalformedResponse,
        }
    }

    /// Whether a cached entry may stand in for this failure
    pub fn allows_cache_fallback(&self) -> bool {
        matches!(
            self,
            ProviderError::Unavailable(_) | ProviderError::MalformedResponse(_)
        )
    }
}
