//! Token validation error types.
//!
//! Every stage of the validation pipeline fails with the same error type,
//! [`ValidationError`], which carries a [`ValidationErrorKind`] for
//! programmatic dispatch plus an optional chained cause for operators.
//!
//! Only [`ValidationErrorKind::KeyFetchError`] is transient. Every other kind
//! is a permanent rejection of the token that produced it.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Shared, thread-safe error cause.
type Cause = Arc<dyn StdError + Send + Sync + 'static>;

/// The specific reason a token failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    /// The signing certificates could not be fetched from the provider.
    KeyFetchError,
    /// A provider certificate could not be parsed into an RSA public key.
    CertificateParseError,
    /// The token is not three base64url segments of well-formed JSON.
    MalformedToken,
    /// The header declares an algorithm other than `RS256`.
    UnsupportedAlgorithm,
    /// The header has no string `kid`.
    KeyIdMissing,
    /// No current signing key matches the header `kid`.
    KeyNotFound,
    /// The RSA-SHA256 signature does not verify.
    SignatureInvalid,
    /// A required claim is absent.
    ClaimMissing,
    /// A well-known claim has the wrong JSON type.
    ClaimTypeMismatch,
    /// The `exp` claim is in the past.
    TokenExpired,
    /// The `nbf` claim is in the future.
    NotYetValid,
    /// The `auth_time` claim is in the future.
    AuthTimeInFuture,
    /// The `iss` claim does not match the expected issuer.
    IssuerMismatch,
    /// The `aud` claim does not match the expected audience.
    AudienceMismatch,
}

impl ValidationErrorKind {
    /// Returns the stable name of this kind, used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyFetchError => "KeyFetchError",
            Self::CertificateParseError => "CertificateParseError",
            Self::MalformedToken => "MalformedToken",
            Self::UnsupportedAlgorithm => "UnsupportedAlgorithm",
            Self::KeyIdMissing => "KeyIdMissing",
            Self::KeyNotFound => "KeyNotFound",
            Self::SignatureInvalid => "SignatureInvalid",
            Self::ClaimMissing => "ClaimMissing",
            Self::ClaimTypeMismatch => "ClaimTypeMismatch",
            Self::TokenExpired => "TokenExpired",
            Self::NotYetValid => "NotYetValid",
            Self::AuthTimeInFuture => "AuthTimeInFuture",
            Self::IssuerMismatch => "IssuerMismatch",
            Self::AudienceMismatch => "AudienceMismatch",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error produced by any stage of token validation.
///
/// The error is cheap to clone so a single failed key refresh can be handed
/// to every caller that was waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("validation error: {kind}: {message}")]
pub struct ValidationError {
    kind: ValidationErrorKind,
    message: String,
    #[source]
    source: Option<Cause>,
}

impl ValidationError {
    /// Creates a new error of the given kind.
    #[must_use]
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches an underlying cause.
    #[must_use]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates a new `KeyFetchError`.
    #[must_use]
    pub fn key_fetch(message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::KeyFetchError, message)
    }

    /// Creates a new `CertificateParseError`.
    #[must_use]
    pub fn certificate_parse(message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::CertificateParseError, message)
    }

    /// Creates a new `MalformedToken` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::MalformedToken, message)
    }

    /// Creates a new `UnsupportedAlgorithm` error.
    #[must_use]
    pub fn unsupported_algorithm(alg: impl fmt::Display) -> Self {
        Self::new(
            ValidationErrorKind::UnsupportedAlgorithm,
            format!("unexpected signing method: {alg}"),
        )
    }

    /// Creates a new `KeyIdMissing` error.
    #[must_use]
    pub fn key_id_missing(message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::KeyIdMissing, message)
    }

    /// Creates a new `KeyNotFound` error.
    #[must_use]
    pub fn key_not_found(kid: &str) -> Self {
        Self::new(
            ValidationErrorKind::KeyNotFound,
            format!("key not found for kid {kid}"),
        )
    }

    /// Creates a new `SignatureInvalid` error.
    #[must_use]
    pub fn signature_invalid() -> Self {
        Self::new(
            ValidationErrorKind::SignatureInvalid,
            "token signature is invalid",
        )
    }

    /// Creates a new `ClaimMissing` error.
    #[must_use]
    pub fn claim_missing(claim: &str) -> Self {
        Self::new(
            ValidationErrorKind::ClaimMissing,
            format!("claim {claim} not found"),
        )
    }

    /// Creates a new `ClaimTypeMismatch` error.
    #[must_use]
    pub fn claim_type_mismatch(claim: &str, expected: &str) -> Self {
        Self::new(
            ValidationErrorKind::ClaimTypeMismatch,
            format!("claim {claim} has invalid type, expected {expected}"),
        )
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ValidationErrorKind {
        self.kind
    }

    /// Returns the human-readable message (without the cause chain).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if the caller may retry the same token after backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind == ValidationErrorKind::KeyFetchError
    }
}

/// Type alias for validation results.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = ValidationError::key_not_found("abc");
        assert_eq!(
            err.to_string(),
            "validation error: KeyNotFound: key not found for kid abc"
        );
    }

    #[test]
    fn test_only_key_fetch_is_retryable() {
        assert!(ValidationError::key_fetch("down").is_retryable());
        assert!(!ValidationError::signature_invalid().is_retryable());
        assert!(!ValidationError::claim_missing("exp").is_retryable());
        assert!(!ValidationError::unsupported_algorithm("none").is_retryable());
    }

    #[test]
    fn test_source_is_chained_and_survives_clone() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = ValidationError::key_fetch("certificate fetch failed").with_source(io);
        let cloned = err.clone();

        let source = cloned.source().expect("source should be set");
        assert_eq!(source.to_string(), "timed out");
        assert_eq!(cloned.kind(), ValidationErrorKind::KeyFetchError);
    }

    #[test]
    fn test_claim_type_mismatch_message() {
        let err = ValidationError::claim_type_mismatch("exp", "number");
        assert_eq!(err.kind(), ValidationErrorKind::ClaimTypeMismatch);
        assert_eq!(err.message(), "claim exp has invalid type, expected number");
    }
}
