//! Compact token decoding.
//!
//! Splits a token into its three base64url segments and decodes the header
//! and payload JSON. Nothing here is trusted yet: the declared algorithm and
//! key id are only exposed for the verifier to check.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Map, Value};

use crate::error::{ValidationError, ValidationResult};

/// A decoded, not yet verified, token.
#[derive(Debug, Clone)]
pub struct ParsedToken {
    header: Map<String, Value>,
    claims: Map<String, Value>,
    signature: Vec<u8>,
    signed_len: usize,
    raw: String,
}

impl ParsedToken {
    /// Decodes a compact `header.payload.signature` token.
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken` unless the token has exactly three segments,
    /// each unpadded base64url, with JSON objects for header and payload.
    pub fn parse(token: &str) -> ValidationResult<Self> {
        let mut segments = token.split('.');
        let (header, payload, signature) = match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => {
                return Err(ValidationError::malformed(
                    "token must have exactly three segments",
                ));
            }
        };

        let signed_len = header.len() + 1 + payload.len();
        let header = decode_object(header, "header")?;
        let claims = decode_object(payload, "payload")?;
        let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|e| {
            ValidationError::malformed("signature segment is not valid base64url").with_source(e)
        })?;

        Ok(Self {
            header,
            claims,
            signature,
            signed_len,
            raw: token.to_string(),
        })
    }

    /// The declared signing algorithm, if `alg` is a string.
    #[must_use]
    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    /// The declared key id.
    ///
    /// # Errors
    ///
    /// Returns `KeyIdMissing` if `kid` is absent or not a string.
    pub fn key_id(&self) -> ValidationResult<&str> {
        match self.header.get("kid") {
            Some(Value::String(kid)) => Ok(kid),
            Some(_) => Err(ValidationError::key_id_missing("kid was not a string")),
            None => Err(ValidationError::key_id_missing(
                "kid not found in token header",
            )),
        }
    }

    #[must_use]
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    #[must_use]
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    #[must_use]
    pub fn into_claims(self) -> Map<String, Value> {
        self.claims
    }

    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The exact bytes the signature covers: `header.payload` as received.
    #[must_use]
    pub fn signed_content(&self) -> &[u8] {
        &self.raw.as_bytes()[..self.signed_len]
    }
}

fn decode_object(segment: &str, name: &str) -> ValidationResult<Map<String, Value>> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        ValidationError::malformed(format!("{name} segment is not valid base64url")).with_source(e)
    })?;

    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(ValidationError::malformed(format!(
            "{name} is not a JSON object"
        ))),
        Err(e) => Err(
            ValidationError::malformed(format!("{name} is not valid JSON")).with_source(e),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationErrorKind;
    use serde_json::json;

    fn encode(value: &Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    fn token(header: &Value, claims: &Value, signature: &[u8]) -> String {
        format!(
            "{}.{}.{}",
            encode(header),
            encode(claims),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    fn kind(token: &str) -> ValidationErrorKind {
        ParsedToken::parse(token).unwrap_err().kind()
    }

    #[test]
    fn test_parse_well_formed_token() {
        let raw = token(
            &json!({"alg": "RS256", "kid": "k1", "typ": "JWT"}),
            &json!({"sub": "user-1", "exp": 1}),
            b"sig",
        );
        let parsed = ParsedToken::parse(&raw).unwrap();

        assert_eq!(parsed.algorithm(), Some("RS256"));
        assert_eq!(parsed.key_id().unwrap(), "k1");
        assert_eq!(parsed.claims()["sub"], "user-1");
        assert_eq!(parsed.signature(), b"sig");

        let (signed, _) = raw.rsplit_once('.').unwrap();
        assert_eq!(parsed.signed_content(), signed.as_bytes());
    }

    #[test]
    fn test_wrong_segment_count() {
        assert_eq!(kind(""), ValidationErrorKind::MalformedToken);
        assert_eq!(kind("abc"), ValidationErrorKind::MalformedToken);
        assert_eq!(kind("a.b"), ValidationErrorKind::MalformedToken);
        assert_eq!(kind("a.b.c.d"), ValidationErrorKind::MalformedToken);
    }

    #[test]
    fn test_invalid_base64() {
        let claims = encode(&json!({}));
        let raw = format!("!!!.{claims}.");
        assert_eq!(kind(&raw), ValidationErrorKind::MalformedToken);
    }

    #[test]
    fn test_padded_base64_is_rejected() {
        let header = base64::engine::general_purpose::URL_SAFE.encode(br#"{"alg": "RS256"}"#);
        assert!(header.ends_with('='));
        let raw = format!("{header}.{}.", encode(&json!({})));
        assert_eq!(kind(&raw), ValidationErrorKind::MalformedToken);
    }

    #[test]
    fn test_payload_must_be_object() {
        let raw = token(&json!({"alg": "RS256"}), &json!([1, 2, 3]), b"");
        assert_eq!(kind(&raw), ValidationErrorKind::MalformedToken);

        let raw = format!(
            "{}.{}.",
            encode(&json!({"alg": "RS256"})),
            URL_SAFE_NO_PAD.encode(b"not json")
        );
        assert_eq!(kind(&raw), ValidationErrorKind::MalformedToken);
    }

    #[test]
    fn test_empty_signature_segment_parses() {
        let raw = token(&json!({"alg": "none"}), &json!({}), b"");
        let parsed = ParsedToken::parse(&raw).unwrap();
        assert_eq!(parsed.algorithm(), Some("none"));
        assert!(parsed.signature().is_empty());
    }

    #[test]
    fn test_key_id_errors() {
        let parsed = ParsedToken::parse(&token(&json!({"alg": "RS256"}), &json!({}), b"")).unwrap();
        let err = parsed.key_id().unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::KeyIdMissing);
        assert_eq!(err.message(), "kid not found in token header");

        let parsed =
            ParsedToken::parse(&token(&json!({"alg": "RS256", "kid": 7}), &json!({}), b""))
                .unwrap();
        let err = parsed.key_id().unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::KeyIdMissing);
        assert_eq!(err.message(), "kid was not a string");
    }

    #[test]
    fn test_non_string_alg_has_no_algorithm() {
        let parsed = ParsedToken::parse(&token(&json!({"alg": 256}), &json!({}), b"")).unwrap();
        assert_eq!(parsed.algorithm(), None);
    }
}
