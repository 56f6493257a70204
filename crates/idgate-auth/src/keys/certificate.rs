//! X.509 certificate decoding into RSA verification keys.

use std::fmt;

use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use sha2::Sha256;
use time::OffsetDateTime;

use crate::error::{ValidationError, ValidationResult};

/// A provider signing key: the published certificate and the RSA public key
/// extracted from it.
#[derive(Clone)]
pub struct SigningKey {
    key_id: String,
    certificate: String,
    public_key: RsaPublicKey,
    verifying_key: VerifyingKey<Sha256>,
    fetched_at: OffsetDateTime,
}

impl SigningKey {
    /// Decodes a PEM-encoded X.509 certificate and extracts its RSA public key.
    ///
    /// # Errors
    ///
    /// Returns `CertificateParseError` if the PEM block, the certificate, or
    /// the embedded public key cannot be decoded, or the key is not RSA.
    pub fn from_pem(
        key_id: impl Into<String>,
        certificate: impl Into<String>,
        fetched_at: OffsetDateTime,
    ) -> ValidationResult<Self> {
        let key_id = key_id.into();
        let certificate = certificate.into();

        let public_key = decode_public_key(&certificate).map_err(|reason| {
            ValidationError::certificate_parse(format!(
                "certificate for kid {key_id} is unusable: {reason}"
            ))
        })?;

        Ok(Self {
            verifying_key: VerifyingKey::<Sha256>::new(public_key.clone()),
            key_id,
            certificate,
            public_key,
            fetched_at,
        })
    }

    /// The key id the provider published this certificate under.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The certificate as published, PEM-encoded.
    #[must_use]
    pub fn certificate_pem(&self) -> &str {
        &self.certificate
    }

    #[must_use]
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// When the certificate document containing this key was retrieved.
    #[must_use]
    pub fn fetched_at(&self) -> OffsetDateTime {
        self.fetched_at
    }

    /// Verifies an RSASSA-PKCS1-v1_5 SHA-256 signature over `message`.
    ///
    /// # Errors
    ///
    /// Returns `SignatureInvalid` if the signature is malformed or does not
    /// verify under this key.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> ValidationResult<()> {
        let signature =
            Signature::try_from(signature).map_err(|_| ValidationError::signature_invalid())?;

        self.verifying_key
            .verify(message, &signature)
            .map_err(|_| ValidationError::signature_invalid())
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("fetched_at", &self.fetched_at)
            .finish_non_exhaustive()
    }
}

fn decode_public_key(pem: &str) -> Result<RsaPublicKey, String> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
        .map_err(|e| format!("invalid PEM block: {e}"))?;

    if pem.label != "CERTIFICATE" {
        return Err(format!("unexpected PEM label '{}'", pem.label));
    }

    let certificate = pem
        .parse_x509()
        .map_err(|e| format!("invalid X.509 certificate: {e}"))?;

    // SubjectPublicKeyInfo DER; rejects non-RSA keys.
    RsaPublicKey::from_public_key_der(certificate.public_key().raw)
        .map_err(|e| format!("certificate does not carry an RSA public key: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationErrorKind;
    use crate::testing::{K1_CERT, K1_KEY, K2_CERT, sign_rs256};

    #[test]
    fn test_from_pem_extracts_rsa_key() {
        let key = SigningKey::from_pem("k1", K1_CERT, OffsetDateTime::UNIX_EPOCH).unwrap();
        assert_eq!(key.key_id(), "k1");
        assert_eq!(key.certificate_pem(), K1_CERT);
        assert_eq!(key.fetched_at(), OffsetDateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_garbage_certificate_is_parse_error() {
        let err = SigningKey::from_pem("bad", "not a certificate", OffsetDateTime::UNIX_EPOCH)
            .unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::CertificateParseError);
        assert!(err.message().contains("kid bad"));
    }

    #[test]
    fn test_private_key_pem_is_rejected() {
        let err = SigningKey::from_pem("k1", K1_KEY, OffsetDateTime::UNIX_EPOCH).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::CertificateParseError);
    }

    #[test]
    fn test_verify_signature() {
        let key = SigningKey::from_pem("k1", K1_CERT, OffsetDateTime::UNIX_EPOCH).unwrap();
        let signature = sign_rs256(K1_KEY, b"header.payload");

        assert!(key.verify(b"header.payload", &signature).is_ok());

        let err = key.verify(b"header.payloaX", &signature).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::SignatureInvalid);
    }

    #[test]
    fn test_signature_from_other_key_fails() {
        let other = SigningKey::from_pem("k2", K2_CERT, OffsetDateTime::UNIX_EPOCH).unwrap();
        let signature = sign_rs256(K1_KEY, b"header.payload");

        let err = other.verify(b"header.payload", &signature).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::SignatureInvalid);
    }

    #[test]
    fn test_empty_signature_fails() {
        let key = SigningKey::from_pem("k1", K1_CERT, OffsetDateTime::UNIX_EPOCH).unwrap();
        let err = key.verify(b"header.payload", &[]).unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::SignatureInvalid);
    }
}
