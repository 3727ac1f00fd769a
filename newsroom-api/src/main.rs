//! Newsroom API Server
//!
//! HTTP API that serves aggregated headlines from the configured providers.

mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, Method},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsroom_core::SystemClock;
use newsroom_providers::ReqwestHttpClient;
use newsroom_services::{HeadlineService, PipelineConfig};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub headline_service: Arc<HeadlineService>,
}

/// Router with every API route and middleware attached
pub fn app(state: AppState) -> Router {
    // Configure CORS for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,newsroom_api=debug")),
        )
        .init();

    info!("Starting Newsroom API");

    let config = PipelineConfig::from_env()?;
    let headline_service = HeadlineService::from_config(
        &config,
        Arc::new(ReqwestHttpClient::new()),
        Arc::new(SystemClock),
    )?;
    let headline_service = Arc::new(headline_service);
    info!(
        providers = ?headline_service.provider_ids(),
        cache_ttl_secs = config.cache_ttl.as_secs(),
        "Headline service initialized"
    );

    // Drop cache entries past stale retention in the background
    let service_for_purge = Arc::clone(&headline_service);
    let purge_every = config.cache_ttl.max(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(purge_every);
        loop {
            interval.tick().await;
            service_for_purge.purge_expired();
        }
    });

    let app = app(AppState { headline_service });

    // Start server
    let port = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
