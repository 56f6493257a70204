//! Time, issuer, and audience checks over verified claims.
//!
//! Checks run in a fixed order so a token with several problems always
//! reports the same one: `exp`, `nbf`, `iss`, `aud`, `auth_time`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::clock::Clock;
use crate::error::{ValidationError, ValidationErrorKind, ValidationResult};

/// Validates the registered claims of a token whose signature has already
/// been verified.
#[derive(Clone)]
pub struct ClaimsValidator {
    issuer_base: String,
    leeway: Duration,
    clock: Arc<dyn Clock>,
}

impl ClaimsValidator {
    #[must_use]
    pub fn new(issuer_base: impl Into<String>, leeway: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            issuer_base: issuer_base.into().trim_end_matches('/').to_string(),
            leeway,
            clock,
        }
    }

    /// The issuer a token minted for `audience` must carry.
    #[must_use]
    pub fn expected_issuer(&self, audience: &str) -> String {
        format!("{}/{}", self.issuer_base, audience)
    }

    /// Checks `claims` against the current time and `audience`.
    ///
    /// # Errors
    ///
    /// - `ClaimMissing` / `ClaimTypeMismatch` for absent or mistyped
    ///   `exp`, `nbf`, `iss`, `aud`, `auth_time`
    /// - `TokenExpired` once `now >= exp + leeway`
    /// - `NotYetValid` while `now + leeway < nbf`
    /// - `IssuerMismatch` / `AudienceMismatch`
    /// - `AuthTimeInFuture` if `auth_time > now` (no leeway)
    pub fn validate(&self, claims: &Map<String, Value>, audience: &str) -> ValidationResult<()> {
        let now = self.clock.now_unix();
        let leeway = self.leeway.as_secs_f64();

        let exp = required_number(claims, "exp")?;
        if now >= exp + leeway {
            return Err(ValidationError::new(
                ValidationErrorKind::TokenExpired,
                format!("token expired at {exp}"),
            ));
        }

        if let Some(nbf) = optional_number(claims, "nbf")?
            && now + leeway < nbf
        {
            return Err(ValidationError::new(
                ValidationErrorKind::NotYetValid,
                format!("token is not valid before {nbf}"),
            ));
        }

        let expected_issuer = self.expected_issuer(audience);
        let iss = required_string(claims, "iss")?;
        if iss != expected_issuer {
            return Err(ValidationError::new(
                ValidationErrorKind::IssuerMismatch,
                format!("issuer {iss} does not match expected issuer {expected_issuer}"),
            ));
        }

        let aud = required_string(claims, "aud")?;
        if aud != audience {
            return Err(ValidationError::new(
                ValidationErrorKind::AudienceMismatch,
                format!("audience {aud} does not match expected audience {audience}"),
            ));
        }

        let auth_time = required_number(claims, "auth_time")?;
        if auth_time > now {
            return Err(ValidationError::new(
                ValidationErrorKind::AuthTimeInFuture,
                "auth_time is in the future",
            ));
        }

        Ok(())
    }
}

pub(crate) fn optional_number(claims: &Map<String, Value>, name: &str) -> ValidationResult<Option<f64>> {
    match claims.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| ValidationError::claim_type_mismatch(name, "number")),
    }
}

pub(crate) fn required_number(claims: &Map<String, Value>, name: &str) -> ValidationResult<f64> {
    optional_number(claims, name)?.ok_or_else(|| ValidationError::claim_missing(name))
}

pub(crate) fn required_string<'a>(
    claims: &'a Map<String, Value>,
    name: &str,
) -> ValidationResult<&'a str> {
    match claims.get(name) {
        None => Err(ValidationError::claim_missing(name)),
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(ValidationError::claim_type_mismatch(name, "string")),
    }
}
