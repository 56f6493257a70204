//! Shared helpers for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ValidationResult;
use crate::keys::{CertificateDocument, KeySource};

#[path = "../tests/common/fixtures.rs"]
mod fixtures;

pub use fixtures::{K1_CERT, K1_KEY, K2_CERT, K2_KEY, mint, sign_rs256};

pub fn document(entries: &[(&str, &str)], max_age: Option<Duration>) -> CertificateDocument {
    CertificateDocument {
        certificates: entries
            .iter()
            .map(|(kid, pem)| ((*kid).to_string(), (*pem).to_string()))
            .collect::<HashMap<_, _>>(),
        max_age,
    }
}

/// Key source that replays queued responses and counts fetches.
///
/// Once the queue is drained the last response is repeated.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<ValidationResult<CertificateDocument>>>,
    last: Mutex<Option<ValidationResult<CertificateDocument>>>,
    fetches: AtomicUsize,
    delay: Duration,
}

impl ScriptedSource {
    pub fn new(responses: Vec<ValidationResult<CertificateDocument>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(None),
            fetches: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for ScriptedSource {
    async fn fetch(&self) -> ValidationResult<CertificateDocument> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.responses.lock().pop_front();
        let mut last = self.last.lock();
        if let Some(next) = next {
            *last = Some(next);
        }
        last.clone().unwrap()
    }
}
