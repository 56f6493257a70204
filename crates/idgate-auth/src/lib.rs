//! # idgate-auth
//!
//! Identity token validation engine for idgate.
//!
//! This crate verifies ID tokens issued by the external identity provider
//! and turns them into a typed [`AuthToken`] principal:
//! - Signing key retrieval and caching with single-flight refresh
//! - Compact token parsing and RS256 signature verification
//! - Expiry, issuer, audience and `auth_time` checks
//! - Strictly typed claim mapping with a residual claim bag
//! - An Axum extractor for cookie-authenticated requests
//!
//! ## Modules
//!
//! - [`config`] - Validation and key cache configuration
//! - [`error`] - The [`ValidationError`] returned by every stage
//! - [`clock`] - Time source for claim checks
//! - [`keys`] - Certificate fetching, decoding and caching
//! - [`token`] - The validation pipeline and principal
//! - [`middleware`] - HTTP extractor and error responses

pub mod clock;
pub mod config;
pub mod error;
pub mod keys;
pub mod middleware;
pub mod token;

#[cfg(test)]
mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AuthConfig, ConfigError, KeyCacheConfig};
pub use error::{ValidationError, ValidationErrorKind, ValidationResult};
pub use keys::{CertificateDocument, HttpCertificateSource, KeyCache, KeySet, KeySource};
pub use middleware::{AuthRejection, AuthState, IdTokenAuth};
pub use token::{AuthToken, TokenValidator};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use idgate_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{AuthConfig, ConfigError, KeyCacheConfig};
    pub use crate::error::{ValidationError, ValidationErrorKind, ValidationResult};
    pub use crate::keys::{KeyCache, KeySource};
    pub use crate::middleware::{AuthRejection, AuthState, IdTokenAuth};
    pub use crate::token::{AuthToken, TokenValidator};
}
