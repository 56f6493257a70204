//! Error responses for authentication failures.
//!
//! Clients only ever see a generic message. The validation kind and cause
//! are logged for operators.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::ValidationError;

/// Seconds a client should wait before retrying after a key fetch failure.
const RETRY_AFTER_SECS: &str = "5";

/// Why a request could not be authenticated.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthRejection {
    /// A required session cookie is absent or empty.
    #[error("missing session cookie {0}")]
    MissingCookie(&'static str),

    /// The ID token failed validation.
    #[error(transparent)]
    InvalidToken(#[from] ValidationError),

    /// The token is valid but its subject is not allowed.
    #[error("user is not allowed")]
    UserNotAllowed,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidToken(err) => err.into_response(),
            Self::MissingCookie(_) | Self::UserNotAllowed => unauthorized(),
        }
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        if self.is_retryable() {
            tracing::warn!(kind = %self.kind(), error = %self, "Token validation unavailable");

            let mut response = (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "temporarily_unavailable",
                    "message": "Authentication is temporarily unavailable"
                })),
            )
                .into_response();
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from_static(RETRY_AFTER_SECS),
            );
            return response;
        }

        tracing::info!(kind = %self.kind(), error = %self, "Token rejected");
        unauthorized()
    }
}

fn unauthorized() -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": "Unauthorized"
        })),
    )
        .into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer"),
    );
    response
}
