use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use idgate_auth::{AuthToken, IdTokenAuth, ValidationError};
use serde::Deserialize;
use serde_json::json;

use crate::server::AppState;

pub async fn up() -> &'static str {
    "up!"
}

#[derive(Debug, Deserialize)]
pub struct ValidateTokenRequest {
    pub token: String,
    /// Expected audience; the configured default applies when absent or empty.
    #[serde(default)]
    pub audience: Option<String>,
}

/// RPC-style validation endpoint for other services.
pub async fn validate_token(
    State(state): State<AppState>,
    Json(req): Json<ValidateTokenRequest>,
) -> Result<Json<AuthToken>, RpcError> {
    let token = state
        .auth
        .validator
        .validate(req.audience.as_deref(), &req.token)
        .await?;
    Ok(Json(token))
}

/// Returns the principal of the cookie-authenticated caller.
pub async fn me(auth: IdTokenAuth) -> Json<AuthToken> {
    Json(auth.token)
}

/// Maps validation failures onto RPC status codes without leaking details.
#[derive(Debug)]
pub struct RpcError(ValidationError);

impl From<ValidationError> for RpcError {
    fn from(err: ValidationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let err = self.0;
        if err.is_retryable() {
            tracing::warn!(kind = %err.kind(), error = %err, "validate-token unavailable");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "code": "UNAVAILABLE",
                    "message": "token validation is temporarily unavailable"
                })),
            )
                .into_response();
        }

        tracing::info!(kind = %err.kind(), error = %err, "validate-token rejected");
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "code": "INVALID_ARGUMENT",
                "message": "invalid token"
            })),
        )
            .into_response()
    }
}
