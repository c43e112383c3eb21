use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use serde::Serialize;

use crate::auth::{SECRET_TOKEN_HEADER, verify_shared_secret};
use crate::error::AppError;
use crate::state::AppState;

/// Fixed refusal body; never hints at which part of the token was wrong.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized: Invalid or missing token";

/// Acknowledgement returned once the token checks out.
#[derive(Debug, Serialize)]
pub struct RebuildAck {
    pub message: &'static str,
    pub status: &'static str,
}

/// POST /api/v1/webhook — authenticated rebuild trigger.
///
/// Only the `x-secret-token` header is inspected; the body is ignored.
pub async fn rebuild_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RebuildAck>, AppError> {
    let Some(ref secret) = state.auth.webhook_secret else {
        tracing::error!("Rebuild webhook called but no secret is configured");
        return Err(AppError::Configuration(
            "Configuration Error: webhook secret is not set".to_string(),
        ));
    };

    let provided = headers
        .get(SECRET_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    if !verify_shared_secret(provided, secret) {
        tracing::warn!(
            token_present = provided.is_some(),
            "Rejected rebuild webhook with bad token"
        );
        return Err(AppError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string()));
    }

    tracing::info!("Authenticated rebuild webhook received");
    tracing::info!("Agents launched: rebuild sequence initiated");

    Ok(Json(RebuildAck {
        message: "agents launched",
        status: "rebuild_initiated",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthFileConfig, GitHubConfig, ServerConfig};
    use axum::http::HeaderValue;
    use axum::response::IntoResponse;

    fn state_with_secret(secret: Option<&str>) -> AppState {
        AppState::new(ServerConfig {
            auth: AuthFileConfig {
                webhook_secret: secret.map(str::to_string),
            },
            github: GitHubConfig {
                enabled: false,
                ..GitHubConfig::default()
            },
            ..ServerConfig::default()
        })
    }

    fn token_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SECRET_TOKEN_HEADER, HeaderValue::from_str(token).unwrap());
        headers
    }

    #[tokio::test]
    async fn valid_token_acknowledged() {
        let state = state_with_secret(Some("gravity2026secret"));
        let Json(ack) = rebuild_webhook(State(state), token_headers("gravity2026secret"))
            .await
            .unwrap();
        assert_eq!(ack.message, "agents launched");
        assert_eq!(ack.status, "rebuild_initiated");
    }

    #[tokio::test]
    async fn wrong_token_unauthorized() {
        let state = state_with_secret(Some("gravity2026secret"));
        let err = rebuild_webhook(State(state), token_headers("guess"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == UNAUTHORIZED_MESSAGE));
    }

    #[tokio::test]
    async fn missing_token_unauthorized() {
        let state = state_with_secret(Some("gravity2026secret"));
        let err = rebuild_webhook(State(state), HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.into_response().status(),
            axum::http::StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn unconfigured_secret_is_server_error() {
        let state = state_with_secret(None);
        let err = rebuild_webhook(State(state), token_headers("gravity2026secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
