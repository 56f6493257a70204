//! Token signature verification.
//!
//! Only RS256 (RSASSA-PKCS1-v1_5 with SHA-256) is accepted. The algorithm is
//! checked before any key lookup, so a token declaring `none`, an HMAC
//! algorithm, or anything else never causes a certificate fetch.

use crate::error::{ValidationError, ValidationResult};
use crate::keys::KeyCache;

use super::parser::ParsedToken;

/// The only accepted signing algorithm.
pub const ALLOWED_ALGORITHM: &str = "RS256";

/// Verifies token signatures against the provider's current signing keys.
#[derive(Clone)]
pub struct SignatureVerifier {
    key_cache: KeyCache,
}

impl SignatureVerifier {
    #[must_use]
    pub fn new(key_cache: KeyCache) -> Self {
        Self { key_cache }
    }

    #[must_use]
    pub fn key_cache(&self) -> &KeyCache {
        &self.key_cache
    }

    /// Verifies that `token` was signed by the provider key named in its
    /// header.
    ///
    /// # Errors
    ///
    /// - `UnsupportedAlgorithm` if the header does not declare `RS256`
    /// - `KeyIdMissing` if the header has no string `kid`
    /// - `KeyFetchError` if the keys had to be refreshed and could not be
    /// - `KeyNotFound` / `CertificateParseError` if `kid` does not resolve
    /// - `SignatureInvalid` if the signature does not verify
    pub async fn verify(&self, token: &ParsedToken) -> ValidationResult<()> {
        check_algorithm(token)?;
        let kid = token.key_id()?;

        let keys = self.key_cache.get_keys().await?;
        let key = keys.resolve(kid)?;

        key.verify(token.signed_content(), token.signature())
            .inspect_err(|_| tracing::debug!(kid = %kid, "Token signature rejected"))
    }
}

/// Rejects any declared algorithm other than RS256.
///
/// # Errors
///
/// Returns `UnsupportedAlgorithm` for a missing, non-string, or different
/// `alg` header.
pub fn check_algorithm(token: &ParsedToken) -> ValidationResult<()> {
    match token.algorithm() {
        Some(ALLOWED_ALGORITHM) => Ok(()),
        Some(other) => Err(ValidationError::unsupported_algorithm(other)),
        None => Err(ValidationError::unsupported_algorithm("<missing>")),
    }
}
