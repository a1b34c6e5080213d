//! HTTP error responses for the public API

use crate::error::MatchmakingError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Body returned to unmatched players
pub const NO_MATCH_MESSAGE: &str = "no match for the player, try to join the lobby again";

/// API errors converted to `{"error": ...}` responses
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request with invalid input.
    #[error("{0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Internal server error; details are logged, not returned.
    #[error("{0}")]
    Internal(String),
}

impl From<MatchmakingError> for ApiError {
    fn from(err: MatchmakingError) -> Self {
        match err {
            MatchmakingError::InvalidJoinRequest { reason } => ApiError::BadRequest(reason),
            MatchmakingError::InvalidJoinId { .. } => {
                ApiError::BadRequest("join_id is not valid UUID".to_string())
            }
            MatchmakingError::InvalidMatchId { .. } => {
                ApiError::BadRequest("match_id is not valid UUID".to_string())
            }
            MatchmakingError::LeaderboardNotFound { .. } => {
                ApiError::NotFound("leaderboard not found".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<MatchmakingError>() {
            Ok(known) => known.into(),
            Err(other) => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(message) => {
                error!("Internal API error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matchmaking_errors_map_to_client_messages() {
        let err: ApiError = MatchmakingError::InvalidJoinId {
            value: "x".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "join_id is not valid UUID"));

        let err: ApiError = anyhow::Error::from(MatchmakingError::LeaderboardNotFound {
            match_id: "x".to_string(),
        })
        .into();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "leaderboard not found"));

        let err: ApiError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
