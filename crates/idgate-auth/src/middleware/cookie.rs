//! Cookie-based ID token authentication extractor.
//!
//! Browser sessions carry the provider ID token and its refresh token in two
//! cookies. Both must be present and non-empty; the ID token is validated
//! against the default audience.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use idgate_auth::middleware::{AuthState, IdTokenAuth};
//!
//! async fn protected_handler(auth: IdTokenAuth) -> String {
//!     format!("Hello, {}!", auth.token.uid())
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .with_state(auth_state);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

use crate::token::{AuthToken, TokenValidator};

use super::error::AuthRejection;

/// Cookie carrying the provider ID token.
pub const ID_TOKEN_COOKIE: &str = "ID_TOKEN";

/// Cookie carrying the provider refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "REFRESH_TOKEN";

/// State required by the [`IdTokenAuth`] extractor.
///
/// Include it in the application state and expose it via `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    /// Token validator shared by every request.
    pub validator: Arc<TokenValidator>,

    /// Subjects allowed through. `None` admits every valid token; an empty
    /// set admits nobody.
    pub allowed_users: Option<Arc<HashSet<String>>>,
}

impl AuthState {
    #[must_use]
    pub fn new(validator: Arc<TokenValidator>) -> Self {
        Self {
            validator,
            allowed_users: None,
        }
    }

    /// Restricts access to the given subjects.
    #[must_use]
    pub fn with_allowed_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_users = Some(Arc::new(users.into_iter().map(Into::into).collect()));
        self
    }

    fn is_allowed(&self, subject: &str) -> bool {
        self.allowed_users
            .as_ref()
            .is_none_or(|users| users.contains(subject))
    }
}

/// Axum extractor that authenticates a request from its session cookies.
///
/// # Errors
///
/// Rejects with [`AuthRejection`] if either cookie is missing or empty, the
/// ID token fails validation, or the subject is not on the allow list.
#[derive(Debug, Clone)]
pub struct IdTokenAuth {
    /// The validated principal.
    pub token: AuthToken,

    /// The refresh token cookie, passed through for session renewal.
    pub refresh_token: String,
}

impl<S> FromRequestParts<S> for IdTokenAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        let id_token = cookie_value(&jar, ID_TOKEN_COOKIE)?;
        let refresh_token = cookie_value(&jar, REFRESH_TOKEN_COOKIE)?;

        let token = auth_state
            .validator
            .validate(None, &id_token)
            .await
            .map_err(AuthRejection::InvalidToken)?;

        if !auth_state.is_allowed(token.subject()) {
            tracing::warn!(subject = %token.subject(), "Subject not on the allowed users list");
            return Err(AuthRejection::UserNotAllowed);
        }

        Ok(Self {
            token,
            refresh_token,
        })
    }
}

fn cookie_value(jar: &CookieJar, name: &'static str) -> Result<String, AuthRejection> {
    match jar.get(name).map(|cookie| cookie.value().trim()) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => {
            tracing::debug!(cookie = name, "Session cookie missing or empty");
            Err(AuthRejection::MissingCookie(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::{AuthConfig, KeyCacheConfig};
    use crate::keys::{KeyCache, KeySource};
    use crate::testing::{K1_CERT, K1_KEY, ScriptedSource, document, mint};
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::routing::get;
    use serde_json::json;
    use tower::ServiceExt;

    const NOW: u64 = 1_700_000_000;

    fn auth_state() -> AuthState {
        let source = Arc::new(ScriptedSource::new(vec![Ok(document(
            &[("k1", K1_CERT)],
            None,
        ))]));
        let cache = KeyCache::new(source as Arc<dyn KeySource>, KeyCacheConfig::default());
        let config = AuthConfig::default().with_default_audience("proj1");
        let validator = TokenValidator::with_clock(&config, cache, Arc::new(FixedClock::new(NOW)));
        AuthState::new(Arc::new(validator))
    }

    fn id_token(sub: &str) -> String {
        mint(
            &json!({"alg": "RS256", "kid": "k1"}),
            &json!({
                "iss": "https://securetoken.google.com/proj1",
                "aud": "proj1",
                "auth_time": NOW - 10,
                "exp": NOW + 3600,
                "sub": sub,
                "user_id": sub,
            }),
            K1_KEY,
        )
    }

    fn app(state: AuthState) -> Router {
        Router::new()
            .route(
                "/me",
                get(|auth: IdTokenAuth| async move {
                    format!("{}:{}", auth.token.uid(), auth.refresh_token)
                }),
            )
            .with_state(state)
    }

    async fn call(app: Router, cookie: Option<String>) -> (StatusCode, String) {
        let mut request = Request::builder().uri("/me");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_valid_cookies() {
        let cookie = format!("ID_TOKEN={}; REFRESH_TOKEN=r1", id_token("u1"));
        let (status, body) = call(app(auth_state()), Some(cookie)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "u1:r1");
    }

    #[tokio::test]
    async fn test_missing_cookies() {
        let (status, _) = call(app(auth_state()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let cookie = format!("ID_TOKEN={}", id_token("u1"));
        let (status, _) = call(app(auth_state()), Some(cookie)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let cookie = format!("ID_TOKEN={}; REFRESH_TOKEN=", id_token("u1"));
        let (status, _) = call(app(auth_state()), Some(cookie)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized_without_details() {
        let (status, body) = call(
            app(auth_state()),
            Some("ID_TOKEN=garbage; REFRESH_TOKEN=r1".to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(!body.contains("MalformedToken"));
    }

    #[tokio::test]
    async fn test_allowed_users() {
        let state = auth_state().with_allowed_users(["u1"]);

        let cookie = format!("ID_TOKEN={}; REFRESH_TOKEN=r1", id_token("u1"));
        let (status, _) = call(app(state.clone()), Some(cookie)).await;
        assert_eq!(status, StatusCode::OK);

        let cookie = format!("ID_TOKEN={}; REFRESH_TOKEN=r1", id_token("u2"));
        let (status, _) = call(app(state), Some(cookie)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_empty_allow_list_admits_nobody() {
        let state = auth_state().with_allowed_users(Vec::<String>::new());

        for sub in ["u1", "u2"] {
            let cookie = format!("ID_TOKEN={}; REFRESH_TOKEN=r1", id_token(sub));
            let (status, _) = call(app(state.clone()), Some(cookie)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }
}
