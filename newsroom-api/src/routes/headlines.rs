//! Headline endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, info};

use newsroom_core::Query as HeadlineQuery;
use newsroom_services::AggregateError;

use crate::AppState;

/// Query parameters for headlines
#[derive(Debug, Default, Deserialize)]
pub struct HeadlinesParams {
    /// Two-letter country code
    pub country: Option<String>,
    pub category: Option<String>,
    /// Free-text search
    pub q: Option<String>,
    /// Maximum number of articles
    pub page_size: Option<usize>,
}

impl HeadlinesParams {
    fn into_query(self) -> HeadlineQuery {
        HeadlineQuery {
            country: self.country,
            category: self.category,
            free_text: self.q,
            page_size: self.page_size,
        }
        .normalized()
    }
}

/// Create headline routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/headlines", get(get_headlines))
}

/// GET /api/headlines - Merged, deduplicated headlines across providers
///
/// Provider failures are reported in the body (`partial`, `errors`); only a
/// total failure maps to 502.
async fn get_headlines(
    State(state): State<AppState>,
    Query(params): Query<HeadlinesParams>,
) -> impl IntoResponse {
    let query = params.into_query();

    match state.headline_service.headlines(&query).await {
        Ok(result) => {
            info!(
                articles = result.articles.len(),
                partial = result.partial,
                "Serving headlines"
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(err) => {
            let message = err.to_string();
            let AggregateError::AllProvidersFailed { errors } = err;
            error!(%message, "Failed to fetch headlines");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "error": message,
                    "errors": errors,
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use newsroom_core::{ProviderError, RawArticle};

    use crate::routes::testing::{get, state, FixedProvider};

    #[tokio::test]
    async fn test_partial_headlines() {
        let ok = FixedProvider::new(
            "newsapi",
            Ok(vec![RawArticle::new(json!({
                "title": "Chipmaker unveils new fab",
                "url": "https://example.in/fab",
                "publishedAt": "2025-03-01T10:00:00Z",
            }))]),
        );
        let down = FixedProvider::new("google_news", Err(ProviderError::unavailable("503")));

        let (status, body) = get(
            state(vec![ok, down]),
            "/api/headlines?country=IN&category=technology&page_size=10",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["partial"], json!(true));
        assert_eq!(body["articles"][0]["title"], json!("Chipmaker unveils new fab"));
        assert_eq!(body["errors"]["google_news"]["kind"], json!("unavailable"));
        assert_eq!(body["served_from"]["newsapi"], json!("live"));
    }

    #[tokio::test]
    async fn test_all_providers_failed_is_bad_gateway() {
        let bad_key = FixedProvider::new("newsapi", Err(ProviderError::unauthorized("bad key")));

        let (status, body) = get(state(vec![bad_key]), "/api/headlines").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["errors"]["newsapi"]["kind"], json!("unauthorized"));
        assert_eq!(body["errors"]["newsapi"]["detail"], json!("bad key"));
    }

    #[test]
    fn test_params_into_query() {
        let params = HeadlinesParams {
            country: Some("IN".to_string()),
            q: Some("  ".to_string()),
            page_size: Some(0),
            ..HeadlinesParams::default()
        };

        assert_eq!(params.into_query(), HeadlineQuery::top_stories().with_country("in"));
    }
}
