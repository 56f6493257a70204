//! Retrieval of the provider's certificate document.
//!
//! The identity provider publishes its current signing certificates as a
//! JSON object mapping key id to PEM-encoded X.509 certificate. The HTTP
//! response's `Cache-Control: max-age` tells clients how long the document
//! may be reused.
//!
//! # Security Considerations
//!
//! - Only HTTPS URLs are allowed (configurable for testing)
//! - HTTP timeouts prevent hanging on slow endpoints
//! - Response size is limited

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderMap};
use url::Url;

use crate::config::{ConfigError, KeyCacheConfig};
use crate::error::{ValidationError, ValidationResult};

/// A fetched certificate document.
#[derive(Debug, Clone, Default)]
pub struct CertificateDocument {
    /// Key id → PEM-encoded X.509 certificate.
    pub certificates: HashMap<String, String>,

    /// Freshness hint from the response, before clamping.
    pub max_age: Option<Duration>,
}

/// Where signing certificates come from.
#[async_trait]
pub trait KeySource: Send + Sync + 'static {
    /// Fetches the current certificate document.
    ///
    /// # Errors
    ///
    /// Returns `KeyFetchError` on any transport, status, size, or decoding
    /// failure.
    async fn fetch(&self) -> ValidationResult<CertificateDocument>;
}

/// Fetches certificates from the provider's HTTPS endpoint.
#[derive(Debug, Clone)]
pub struct HttpCertificateSource {
    http_client: reqwest::Client,
    url: Url,
    max_response_size: usize,
}

impl HttpCertificateSource {
    /// Creates a source for `config.certificates_url`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the URL does not parse, uses a
    /// scheme other than HTTPS (HTTP only with `allow_http`), or the HTTP
    /// client cannot be built.
    pub fn new(config: &KeyCacheConfig) -> Result<Self, ConfigError> {
        let url = Url::parse(&config.certificates_url).map_err(|e| {
            ConfigError::InvalidValue(format!(
                "certificates_url '{}' is not a valid URL: {e}",
                config.certificates_url
            ))
        })?;
        validate_scheme(&url, config.allow_http)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            url,
            max_response_size: config.max_response_size,
        })
    }

    /// The endpoint this source fetches from.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl KeySource for HttpCertificateSource {
    async fn fetch(&self) -> ValidationResult<CertificateDocument> {
        tracing::debug!("Fetching signing certificates from {}", self.url);

        let response = self
            .http_client
            .get(self.url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to fetch certificates from {}: {}", self.url, e);
                ValidationError::key_fetch(format!("failed to fetch certificates from {}", self.url))
                    .with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValidationError::key_fetch(format!(
                "certificate endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        if let Some(len) = response.content_length()
            && len > self.max_response_size as u64
        {
            return Err(ValidationError::key_fetch(format!(
                "certificate response exceeds maximum size of {} bytes",
                self.max_response_size
            )));
        }

        let max_age = parse_max_age(response.headers());

        let body = response.bytes().await.map_err(|e| {
            ValidationError::key_fetch("failed to read certificate response body").with_source(e)
        })?;

        // Chunked responses carry no Content-Length.
        if body.len() > self.max_response_size {
            return Err(ValidationError::key_fetch(format!(
                "certificate response exceeds maximum size of {} bytes",
                self.max_response_size
            )));
        }

        let certificates: HashMap<String, String> =
            serde_json::from_slice(&body).map_err(|e| {
                tracing::warn!("Failed to parse certificates from {}: {}", self.url, e);
                ValidationError::key_fetch("certificate document is not a JSON object of strings")
                    .with_source(e)
            })?;

        tracing::debug!(
            "Fetched {} certificates from {}, max-age {:?}",
            certificates.len(),
            self.url,
            max_age
        );

        Ok(CertificateDocument {
            certificates,
            max_age,
        })
    }
}

fn validate_scheme(url: &Url, allow_http: bool) -> Result<(), ConfigError> {
    match url.scheme() {
        "https" => Ok(()),
        "http" if allow_http => Ok(()),
        scheme => Err(ConfigError::InvalidValue(format!(
            "certificates_url must use https, got '{scheme}'"
        ))),
    }
}

/// Extracts the `max-age` directive from `Cache-Control`.
///
/// `no-cache` and `no-store` yield `None` so the configured default TTL
/// applies instead of a zero lifetime.
fn parse_max_age(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(CACHE_CONTROL)?.to_str().ok()?;

    let mut max_age = None;
    for directive in value.split(',') {
        let directive = directive.trim();
        if directive.eq_ignore_ascii_case("no-cache") || directive.eq_ignore_ascii_case("no-store")
        {
            return None;
        }
        if let Some(seconds) = directive.strip_prefix("max-age=") {
            max_age = seconds.trim_matches('"').parse::<u64>().ok();
        }
    }

    max_age.map(Duration::from_secs)
}
