//! The validated principal and the mapping from raw claims.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ValidationError, ValidationResult};

/// The authenticated identity described by a validated token.
///
/// Only produced by [`TokenValidator`](super::TokenValidator) after the
/// signature and every claim check have passed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthToken {
    subject: String,
    uid: String,
    issuer: String,
    audience: String,
    role: String,
    auth_time: f64,
    expires_at: f64,
    issued_at: f64,
    products: Vec<String>,
    groups: Vec<String>,
    extra_claims: Map<String, Value>,
}

impl AuthToken {
    /// The `sub` claim.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The `user_id` claim.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// When the user authenticated, in seconds since the epoch.
    #[must_use]
    pub fn auth_time(&self) -> f64 {
        self.auth_time
    }

    #[must_use]
    pub fn expires_at(&self) -> f64 {
        self.expires_at
    }

    #[must_use]
    pub fn issued_at(&self) -> f64 {
        self.issued_at
    }

    #[must_use]
    pub fn products(&self) -> &[String] {
        &self.products
    }

    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Every claim outside the well-known set, unchanged.
    #[must_use]
    pub fn extra_claims(&self) -> &Map<String, Value> {
        &self.extra_claims
    }

    /// Looks up a custom claim by name.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.extra_claims.get(name)
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    #[must_use]
    pub fn has_product(&self, product: &str) -> bool {
        self.products.iter().any(|p| p == product)
    }

    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

/// Partitions verified claims into the typed principal fields and the
/// residual claim bag.
///
/// Well-known claims are strictly typed: a present claim of the wrong JSON
/// type (including `null`) is a `ClaimTypeMismatch`. An absent optional claim
/// takes its empty value. Elements of `products` and `groups` that are not
/// strings become `""` so the array keeps its length.
pub struct ClaimsMapper;

impl ClaimsMapper {
    /// Claim names decoded into typed fields.
    pub const WELL_KNOWN: [&'static str; 10] = [
        "auth_time",
        "iss",
        "aud",
        "exp",
        "iat",
        "sub",
        "user_id",
        "role",
        "products",
        "groups",
    ];

    /// Maps `claims` into an [`AuthToken`].
    ///
    /// # Errors
    ///
    /// Returns `ClaimTypeMismatch` for a mistyped well-known claim.
    pub(crate) fn map(claims: Map<String, Value>) -> ValidationResult<AuthToken> {
        let mut token = AuthToken {
            subject: String::new(),
            uid: String::new(),
            issuer: String::new(),
            audience: String::new(),
            role: String::new(),
            auth_time: 0.0,
            expires_at: 0.0,
            issued_at: 0.0,
            products: Vec::new(),
            groups: Vec::new(),
            extra_claims: Map::new(),
        };

        for (name, value) in claims {
            match name.as_str() {
                "auth_time" => token.auth_time = number(&name, &value)?,
                "exp" => token.expires_at = number(&name, &value)?,
                "iat" => token.issued_at = number(&name, &value)?,
                "iss" => token.issuer = string(&name, value)?,
                "aud" => token.audience = string(&name, value)?,
                "sub" => token.subject = string(&name, value)?,
                "user_id" => token.uid = string(&name, value)?,
                "role" => token.role = string(&name, value)?,
                "products" => token.products = string_list(&name, value)?,
                "groups" => token.groups = string_list(&name, value)?,
                _ => {
                    token.extra_claims.insert(name, value);
                }
            }
        }

        Ok(token)
    }
}

fn number(name: &str, value: &Value) -> ValidationResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| ValidationError::claim_type_mismatch(name, "number"))
}

fn string(name: &str, value: Value) -> ValidationResult<String> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(ValidationError::claim_type_mismatch(name, "string")),
    }
}

fn string_list(name: &str, value: Value) -> ValidationResult<Vec<String>> {
    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                _ => String::new(),
            })
            .collect()),
        _ => Err(ValidationError::claim_type_mismatch(name, "array")),
    }
}
