pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod fleet;
pub mod health;
pub mod rate_limit;
pub mod session_manager;
pub mod sse;
pub mod state;
pub mod webhooks;

use std::any::Any;
use std::time::Duration;

use axum::Router;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use config::ServerConfig;
use error::{AppError, INTERNAL_ERROR_MESSAGE};
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);
    (build_router(state.clone()), state)
}

/// Build the router around an existing state (e.g. one with a test clock).
pub fn build_router(state: AppState) -> Router<()> {
    // Issuer and webhook sit behind the per-IP rate limiter
    let gated_routes = Router::new()
        .route("/trigger", post(api::issue_session))
        .route("/webhook", post(webhooks::rebuild::rebuild_webhook))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::api_rate_limit_layer,
        ));

    let session_routes = Router::new()
        .route("/{session}", get(api::get_session))
        .route("/{session}/config", patch(api::update_mission))
        .route("/{session}/launch", post(api::launch))
        .route("/{session}/deploy", post(api::deploy))
        .route("/{session}/stream", get(sse::session_stream));

    let api_routes = Router::new()
        .merge(gated_routes)
        .nest("/sessions", session_routes)
        .route("/projects", get(api::list_projects))
        .fallback(api_not_found);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api/v1", api_routes)
        .fallback_service(ServeDir::new(&state.config.web_root))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

async fn api_not_found() -> AppError {
    AppError::NotFound("No such endpoint".to_string())
}

/// Converts a handler panic into the generic JSON 500.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    tracing::error!(detail, "Request handler panicked");
    AppError::Internal(INTERNAL_ERROR_MESSAGE.to_string()).into_response()
}

/// Background task that evicts idle sessions and stale rate-limit buckets.
pub fn spawn_session_reaper(state: AppState) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_secs(state.config.sessions.idle_check_interval_secs.max(1));
    let max_idle = Duration::from_secs(state.config.sessions.idle_timeout_secs);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = {
                let mut sessions = state.sessions.write().await;
                sessions.cleanup_idle_sessions(max_idle)
            };
            if removed > 0 {
                tracing::info!(removed, "Evicted idle sessions");
            }
            state
                .api_rate_limiter
                .cleanup(rate_limit::STALE_BUCKET_AGE)
                .await;
        }
    })
}
