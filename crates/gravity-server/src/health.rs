use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub sessions: SessionInfo,
    pub connections: ConnectionInfo,
}

#[derive(Serialize)]
pub struct SessionInfo {
    pub active: usize,
    pub max: usize,
}

#[derive(Serialize)]
pub struct ConnectionInfo {
    pub sse: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let sse = state.sse_subscriber_count.load(Ordering::Relaxed);
    let active = state.sessions.read().await.len();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        sessions: SessionInfo {
            active,
            max: state.config.limits.max_sessions,
        },
        connections: ConnectionInfo { sse },
    })
}

/// GET /ready — not ready while the session table is full.
pub async fn readiness_check(State(state): State<AppState>) -> &'static str {
    let active = state.sessions.read().await.len();
    if active >= state.config.limits.max_sessions {
        return "not ready: session limit reached";
    }
    "ready"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "healthy",
            version: "0.1.0",
            sessions: SessionInfo { active: 2, max: 10 },
            connections: ConnectionInfo { sse: 3 },
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"healthy\""));
        assert!(json.contains("\"active\":2"));
        assert!(json.contains("\"sse\":3"));
    }
}
