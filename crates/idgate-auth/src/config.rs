//! Token validation configuration.
//!
//! [`AuthConfig`] controls the claim checks (issuer convention, default
//! audience, clock skew) and embeds [`KeyCacheConfig`], which controls how
//! the provider's signing certificates are fetched and cached.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default issuer base; the expected issuer is `<base>/<audience>`.
pub const DEFAULT_ISSUER_BASE: &str = "https://securetoken.google.com";

/// Default public certificate document of the identity provider.
pub const DEFAULT_CERTIFICATES_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

/// Upper bound for every cache lifetime setting.
pub const MAX_CACHE_DURATION: Duration = Duration::from_secs(30 * 24 * 3600);

/// Root token validation configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// default_audience = "my-project"
/// leeway = "0s"
///
/// [auth.keys]
/// default_ttl = "1h"
/// stale_grace_period = "0s"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer base URL. Tokens must carry `iss = "<issuer_base>/<audience>"`.
    pub issuer_base: String,

    /// Audience used when a caller does not supply one.
    pub default_audience: Option<String>,

    /// Clock skew tolerance applied to `exp` and `nbf`.
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,

    /// Signing key cache configuration.
    pub keys: KeyCacheConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer_base: DEFAULT_ISSUER_BASE.to_string(),
            default_audience: None,
            leeway: Duration::ZERO,
            keys: KeyCacheConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Sets the default audience.
    #[must_use]
    pub fn with_default_audience(mut self, audience: impl Into<String>) -> Self {
        self.default_audience = Some(audience.into());
        self
    }

    /// Sets the clock skew tolerance.
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the issuer base or certificate
    /// URL is not an absolute URL, or the TTL bounds are inconsistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.issuer_base).is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "issuer_base must be an absolute URL, got '{}'",
                self.issuer_base
            )));
        }

        if let Some(aud) = &self.default_audience
            && aud.is_empty()
        {
            return Err(ConfigError::InvalidValue(
                "default_audience cannot be empty".to_string(),
            ));
        }

        self.keys.validate()
    }
}

/// Signing key cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeyCacheConfig {
    /// URL of the provider's certificate document (kid → PEM certificate).
    pub certificates_url: String,

    /// TTL when the response carries no usable `Cache-Control: max-age`.
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,

    /// Lower bound applied to `max-age`.
    #[serde(with = "humantime_serde")]
    pub min_ttl: Duration,

    /// Upper bound applied to `max-age`.
    #[serde(with = "humantime_serde")]
    pub max_ttl: Duration,

    /// HTTP request timeout.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Maximum accepted response size in bytes.
    pub max_response_size: usize,

    /// Allow a plain `http://` certificate URL. Testing only.
    pub allow_http: bool,

    /// How long an expired key set may still be served when a refresh fails.
    /// Zero means fail closed.
    #[serde(with = "humantime_serde")]
    pub stale_grace_period: Duration,
}

impl Default for KeyCacheConfig {
    fn default() -> Self {
        Self {
            certificates_url: DEFAULT_CERTIFICATES_URL.to_string(),
            default_ttl: Duration::from_secs(3600),   // 1 hour
            min_ttl: Duration::from_secs(60),         // 1 minute
            max_ttl: Duration::from_secs(86400),      // 24 hours
            request_timeout: Duration::from_secs(10), // 10 seconds
            max_response_size: 1024 * 1024,           // 1 MB
            allow_http: false,
            stale_grace_period: Duration::ZERO,
        }
    }
}

impl KeyCacheConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the certificate document URL.
    #[must_use]
    pub fn with_certificates_url(mut self, url: impl Into<String>) -> Self {
        self.certificates_url = url.into();
        self
    }

    /// Sets the default TTL (used when Cache-Control is absent).
    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the minimum TTL.
    #[must_use]
    pub fn with_min_ttl(mut self, ttl: Duration) -> Self {
        self.min_ttl = ttl;
        self
    }

    /// Sets the maximum TTL.
    #[must_use]
    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        self.max_ttl = ttl;
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the maximum response size.
    #[must_use]
    pub fn with_max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    /// Allows HTTP (non-HTTPS) certificate URLs.
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Sets the stale grace period.
    #[must_use]
    pub fn with_stale_grace_period(mut self, grace: Duration) -> Self {
        self.stale_grace_period = grace;
        self
    }

    /// Clamps a provider `max-age` hint into the configured bounds, or falls
    /// back to the default TTL when there is no hint.
    #[must_use]
    pub fn ttl_for(&self, max_age: Option<Duration>) -> Duration {
        match max_age {
            Some(ttl) => ttl.min(self.max_ttl).max(self.min_ttl),
            None => self.default_ttl,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the URL is unparsable, the
    /// TTL bounds are zero or inverted, or a lifetime exceeds
    /// [`MAX_CACHE_DURATION`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.certificates_url).is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "certificates_url must be an absolute URL, got '{}'",
                self.certificates_url
            )));
        }

        if self.default_ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "default_ttl must be > 0".to_string(),
            ));
        }

        if self.min_ttl > self.max_ttl {
            return Err(ConfigError::InvalidValue(
                "min_ttl must be <= max_ttl".to_string(),
            ));
        }

        for (name, value) in [
            ("default_ttl", self.default_ttl),
            ("max_ttl", self.max_ttl),
            ("stale_grace_period", self.stale_grace_period),
        ] {
            if value > MAX_CACHE_DURATION {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} must be <= {}s",
                    MAX_CACHE_DURATION.as_secs()
                )));
            }
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "request_timeout must be > 0".to_string(),
            ));
        }

        if self.max_response_size == 0 {
            return Err(ConfigError::InvalidValue(
                "max_response_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
