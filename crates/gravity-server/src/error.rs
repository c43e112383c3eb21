use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use gravity_core::session::InvalidSessionId;
use gravity_core::simulator::SimError;

/// Body of every 500 that must not leak details.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Conflict(String),
    /// Server misconfiguration the caller cannot fix (e.g. missing secret).
    Configuration(String),
    Unavailable(String),
    RateLimited,
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(m)
            | Self::NotFound(m)
            | Self::Unauthorized(m)
            | Self::Conflict(m)
            | Self::Configuration(m)
            | Self::Unavailable(m)
            | Self::Internal(m) => write!(f, "{m}"),
            Self::RateLimited => write!(f, "Too many requests"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Configuration(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<SimError> for AppError {
    fn from(err: SimError) -> Self {
        match err {
            SimError::InvalidConfig(_) => Self::BadRequest(err.to_string()),
            _ => Self::Conflict(err.to_string()),
        }
    }
}

impl From<InvalidSessionId> for AppError {
    fn from(err: InvalidSessionId) -> Self {
        Self::BadRequest(format!("invalid session id: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gravity_core::mission::MissionConfigError;
    use gravity_core::simulator::Phase;

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                AppError::Configuration("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Unavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (AppError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn sim_errors_map_to_conflict_or_bad_request() {
        let conflict: AppError = SimError::AlreadyLaunched(Phase::Running).into();
        assert!(matches!(conflict, AppError::Conflict(_)));

        let bad: AppError =
            SimError::InvalidConfig(MissionConfigError::ProjectCountOutOfRange(9)).into();
        assert!(matches!(bad, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn body_is_json_error_field() {
        let resp = AppError::Unauthorized("nope".into()).into_response();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "nope");
    }
}
