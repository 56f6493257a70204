//! Shared fixtures for idgate-auth integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use idgate_auth::{
    AuthConfig, CertificateDocument, FixedClock, KeyCache, KeyCacheConfig, KeySource,
    TokenValidator, ValidationResult,
};
use parking_lot::Mutex;
use serde_json::{Value, json};

mod fixtures;

pub use fixtures::*;

pub const NOW: u64 = 1_700_000_000;
pub const PROJECT: &str = "proj1";

/// In-memory certificate source that counts fetches.
pub struct FakeKeySource {
    certificates: Mutex<HashMap<String, String>>,
    max_age: Option<Duration>,
    delay: Duration,
    fetches: AtomicUsize,
}

impl FakeKeySource {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            certificates: Mutex::new(
                entries
                    .iter()
                    .map(|(kid, pem)| ((*kid).to_string(), (*pem).to_string()))
                    .collect(),
            ),
            max_age: Some(Duration::from_secs(3600)),
            delay: Duration::ZERO,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replaces the published certificates, as a provider key rotation would.
    pub fn publish(&self, entries: &[(&str, &str)]) {
        *self.certificates.lock() = entries
            .iter()
            .map(|(kid, pem)| ((*kid).to_string(), (*pem).to_string()))
            .collect();
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for FakeKeySource {
    async fn fetch(&self) -> ValidationResult<CertificateDocument> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(CertificateDocument {
            certificates: self.certificates.lock().clone(),
            max_age: self.max_age,
        })
    }
}

pub fn validator(source: &Arc<FakeKeySource>) -> TokenValidator {
    let config = AuthConfig::default().with_default_audience(PROJECT);
    let cache = KeyCache::new(
        Arc::clone(source) as Arc<dyn KeySource>,
        KeyCacheConfig::default(),
    );
    TokenValidator::with_clock(&config, cache, Arc::new(FixedClock::new(NOW)))
}

/// Claims a freshly issued token for `PROJECT` would carry.
pub fn claims() -> Value {
    json!({
        "iss": format!("https://securetoken.google.com/{PROJECT}"),
        "aud": PROJECT,
        "auth_time": NOW - 100,
        "exp": NOW + 3600,
        "iat": NOW,
        "sub": "u1",
        "user_id": "u1",
    })
}

pub fn rs256_header(kid: &str) -> Value {
    json!({"alg": "RS256", "kid": kid, "typ": "JWT"})
}

pub fn with_claim(mut claims: Value, name: &str, value: Value) -> Value {
    claims[name] = value;
    claims
}
