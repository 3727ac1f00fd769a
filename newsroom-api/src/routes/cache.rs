//! Cache inspection endpoints

use axum::{extract::State, response::Json, routing::get, Router};

use newsroom_services::CacheStats;

use crate::AppState;

/// GET /api/cache/stats - Entry counts and request budget usage per provider
async fn get_cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.headline_service.cache_stats())
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/cache/stats", get(get_cache_stats))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use newsroom_core::{Query, RawArticle};

    use crate::routes::testing::{get, state, FixedProvider};

    #[tokio::test]
    async fn test_stats_report_entries_and_budget() {
        let provider = FixedProvider::new(
            "newsapi",
            Ok(vec![RawArticle::new(json!({
                "title": "Rupee steadies",
                "url": "https://example.in/rupee",
            }))]),
        );
        let state = state(vec![provider]);
        state
            .headline_service
            .headlines(&Query::top_stories())
            .await
            .unwrap();

        let (status, body) = get(state, "/api/cache/stats").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ttl_secs"], json!(300));
        assert_eq!(body["max_entries_per_provider"], json!(100));
        let newsapi = &body["providers"][0];
        assert_eq!(newsapi["provider"], json!("newsapi"));
        assert_eq!(newsapi["entries"], json!(1));
        assert_eq!(newsapi["fresh_entries"], json!(1));
        assert_eq!(newsapi["requests_used"], json!(1));
        assert_eq!(newsapi["window_limit"], json!(60));
        assert_eq!(newsapi["state"], json!("open"));
    }
}
