//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;

use newsroom_core::ProviderId;
use newsroom_services::BudgetState;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    providers: Vec<ProviderId>,
    /// Providers whose request budget is spent for the current window
    throttled: Vec<ProviderId>,
}

/// Health check handler
///
/// Degraded once every provider is throttled, since only cached data can
/// be served until a window resets.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let providers = state.headline_service.provider_ids();
    let throttled: Vec<ProviderId> = state
        .headline_service
        .cache_stats()
        .providers
        .into_iter()
        .filter(|p| p.state == BudgetState::Throttled)
        .map(|p| p.provider)
        .collect();

    let healthy = providers.iter().any(|p| !throttled.contains(p));
    let (code, status) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            providers,
            throttled,
        }),
    )
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use serde_json::json;

    use newsroom_core::{ProviderError, Query, RawArticle};
    use newsroom_services::{CacheConfig, RateLimit};

    use crate::routes::testing::{get, state, state_with_cache, FixedProvider};

    fn story() -> RawArticle {
        RawArticle::new(json!({
            "title": "Monsoon arrives early",
            "url": "https://example.in/monsoon",
        }))
    }

    #[tokio::test]
    async fn test_healthy_with_open_budgets() {
        let provider = FixedProvider::new("newsapi", Ok(vec![story()]));

        let (status, body) = get(state(vec![provider]), "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("healthy"));
        assert_eq!(body["providers"], json!(["newsapi"]));
        assert_eq!(body["throttled"], json!([]));
    }

    #[tokio::test]
    async fn test_degraded_when_every_provider_throttled() {
        let newsapi = FixedProvider::new("newsapi", Ok(vec![story()]));
        let google = FixedProvider::new("google_news", Err(ProviderError::RateLimited));
        let config = CacheConfig {
            default_rate_limit: RateLimit::new(1, Duration::from_secs(3600)),
            ..CacheConfig::default()
        };
        let state = state_with_cache(vec![newsapi, google], config);

        state
            .headline_service
            .headlines(&Query::top_stories())
            .await
            .unwrap();
        let (status, body) = get(state, "/api/health").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], json!("degraded"));
        assert_eq!(body["throttled"], json!(["google_news", "newsapi"]));
    }
}
