//! API route definitions

mod cache;
mod headlines;
mod health;
#[cfg(test)]
mod testing;

use axum::Router;

use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(headlines::routes())
        .merge(health::routes())
        .merge(cache::routes())
}
