//! The token validation pipeline.
//!
//! ```text
//! raw token ─▶ ParsedToken ─▶ SignatureVerifier ─▶ ClaimsValidator ─▶ ClaimsMapper ─▶ AuthToken
//!                                   │
//!                                   ▼
//!                                KeyCache
//! ```
//!
//! The first failing stage ends validation with its error.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::{AuthConfig, ConfigError};
use crate::error::{ValidationError, ValidationErrorKind, ValidationResult};
use crate::keys::KeyCache;

use super::claims::ClaimsValidator;
use super::parser::ParsedToken;
use super::principal::{AuthToken, ClaimsMapper};
use super::verifier::SignatureVerifier;

/// Validates provider ID tokens into [`AuthToken`] principals.
///
/// Safe to share across tasks; the only shared mutable state is the key
/// cache.
///
/// # Example
///
/// ```ignore
/// use idgate_auth::{AuthConfig, TokenValidator};
///
/// let config = AuthConfig::default().with_default_audience("my-project");
/// let validator = TokenValidator::from_config(&config)?;
/// validator.warm_cache().await;
///
/// let principal = validator.validate(None, &raw_token).await?;
/// println!("{} has role {}", principal.uid(), principal.role());
/// ```
pub struct TokenValidator {
    default_audience: Option<String>,
    verifier: SignatureVerifier,
    claims: ClaimsValidator,
}

impl TokenValidator {
    /// Creates a validator over an existing key cache, using the system clock.
    #[must_use]
    pub fn new(config: &AuthConfig, key_cache: KeyCache) -> Self {
        Self::with_clock(config, key_cache, Arc::new(SystemClock))
    }

    /// Creates a validator with an explicit time source.
    #[must_use]
    pub fn with_clock(config: &AuthConfig, key_cache: KeyCache, clock: Arc<dyn Clock>) -> Self {
        Self {
            default_audience: config.default_audience.clone(),
            verifier: SignatureVerifier::new(key_cache),
            claims: ClaimsValidator::new(config.issuer_base.clone(), config.leeway, clock),
        }
    }

    /// Creates a validator that fetches keys from the configured certificate
    /// endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let key_cache = KeyCache::from_config(config.keys.clone())?;
        Ok(Self::new(config, key_cache))
    }

    #[must_use]
    pub fn key_cache(&self) -> &KeyCache {
        self.verifier.key_cache()
    }

    #[must_use]
    pub fn default_audience(&self) -> Option<&str> {
        self.default_audience.as_deref()
    }

    /// Pre-fetches signing keys so the first request does not pay for it.
    pub async fn warm_cache(&self) {
        self.key_cache().warm().await;
    }

    /// Validates `token` for `audience`, or for the default audience when
    /// `audience` is `None` or empty.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] of the first failing stage.
    /// `AudienceMismatch` if no audience was given and none is configured.
    pub async fn validate(&self, audience: Option<&str>, token: &str) -> ValidationResult<AuthToken> {
        let audience = self.resolve_audience(audience)?;

        self.run(audience, token)
            .await
            .inspect(|principal| {
                tracing::debug!(uid = %principal.uid(), audience = %audience, "Token validated");
            })
            .inspect_err(|err| {
                tracing::debug!(kind = %err.kind(), error = %err, audience = %audience, "Token rejected");
            })
    }

    async fn run(&self, audience: &str, token: &str) -> ValidationResult<AuthToken> {
        let parsed = ParsedToken::parse(token)?;
        self.verifier.verify(&parsed).await?;
        self.claims.validate(parsed.claims(), audience)?;
        ClaimsMapper::map(parsed.into_claims())
    }

    fn resolve_audience<'a>(&'a self, audience: Option<&'a str>) -> ValidationResult<&'a str> {
        match audience.filter(|aud| !aud.is_empty()) {
            Some(aud) => Ok(aud),
            None => self.default_audience.as_deref().ok_or_else(|| {
                ValidationError::new(
                    ValidationErrorKind::AudienceMismatch,
                    "no expected audience supplied and no default audience configured",
                )
            }),
        }
    }
}
