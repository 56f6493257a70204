//! HTTP middleware for authentication.
//!
//! - [`IdTokenAuth`] - Axum extractor authenticating a request from its
//!   `ID_TOKEN` / `REFRESH_TOKEN` session cookies
//! - [`AuthRejection`] - Generic 401 / 503 responses for failed authentication

pub mod cookie;
pub mod error;

pub use cookie::{AuthState, ID_TOKEN_COOKIE, IdTokenAuth, REFRESH_TOKEN_COOKIE};
pub use error::AuthRejection;
