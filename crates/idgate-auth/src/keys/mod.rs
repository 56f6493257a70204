//! Provider signing keys: retrieval, decoding and caching.
//!
//! - [`KeySource`] - Where certificate documents come from
//! - [`HttpCertificateSource`] - Fetches the provider's published certificates
//! - [`SigningKey`] - A decoded certificate with its RSA public key
//! - [`KeyCache`] - Shared, single-flight cache of the current [`KeySet`]

pub mod cache;
pub mod certificate;
pub mod source;

pub use cache::{KeyCache, KeySet};
pub use certificate::SigningKey;
pub use source::{CertificateDocument, HttpCertificateSource, KeySource};
