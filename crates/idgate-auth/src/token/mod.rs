//! ID token validation.
//!
//! - [`parser`] - Compact token decoding
//! - [`verifier`] - RS256 signature verification against the key cache
//! - [`claims`] - Expiry, not-before, issuer, audience and `auth_time` checks
//! - [`principal`] - The validated [`AuthToken`] and claim mapping
//! - [`validator`] - The [`TokenValidator`] pipeline tying them together

pub mod claims;
pub mod parser;
pub mod principal;
pub mod validator;
pub mod verifier;

pub use claims::ClaimsValidator;
pub use parser::ParsedToken;
pub use principal::{AuthToken, ClaimsMapper};
pub use validator::TokenValidator;
pub use verifier::{ALLOWED_ALGORITHM, SignatureVerifier, check_algorithm};
