//! Signing key caching.
//!
//! [`KeyCache`] holds the most recently fetched [`KeySet`] and refreshes it
//! from a [`KeySource`] once the set's validity window has elapsed.
//!
//! # Concurrency
//!
//! - Reads are lock-free: the current set sits behind an atomic pointer and
//!   is replaced wholesale, so a reader sees either the old set or the new
//!   one, never a mix.
//! - Refresh is single-flight: while one fetch is in progress every other
//!   caller that needs keys waits on that same fetch.
//! - The fetch runs on its own task. A caller that is cancelled while
//!   waiting does not abort the refresh for anyone else.
//!
//! # Cache-Control Support
//!
//! The provider's `max-age` sets each set's lifetime, clamped between the
//! configured `min_ttl` and `max_ttl`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture, Shared};
use parking_lot::Mutex;
use time::OffsetDateTime;
use tokio::time::Instant;

use super::certificate::SigningKey;
use super::source::{CertificateDocument, HttpCertificateSource, KeySource};
use crate::config::{ConfigError, KeyCacheConfig, MAX_CACHE_DURATION};
use crate::error::{ValidationError, ValidationResult};

/// An immutable snapshot of the provider's signing keys.
#[derive(Debug)]
pub struct KeySet {
    keys: HashMap<String, SigningKey>,
    /// Key ids whose certificate could not be decoded, with the reason.
    unusable: HashMap<String, String>,
    fetched_at: OffsetDateTime,
    valid_until: Instant,
}

impl KeySet {
    /// Decodes every certificate in `document`.
    ///
    /// A certificate that fails to decode does not poison the set; its key
    /// id is remembered so lookups for it report why it cannot be used.
    #[must_use]
    pub fn from_document(document: CertificateDocument, ttl: Duration) -> Self {
        let fetched_at = OffsetDateTime::now_utc();
        let mut keys = HashMap::with_capacity(document.certificates.len());
        let mut unusable = HashMap::new();

        for (kid, pem) in document.certificates {
            match SigningKey::from_pem(kid.clone(), pem, fetched_at) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(err) => {
                    tracing::warn!(kid = %kid, error = %err, "Skipping unusable signing certificate");
                    unusable.insert(kid, err.message().to_string());
                }
            }
        }

        let now = Instant::now();
        Self {
            keys,
            unusable,
            fetched_at,
            valid_until: now
                .checked_add(ttl.min(MAX_CACHE_DURATION))
                .unwrap_or(now),
        }
    }

    /// Looks up the key for `kid`.
    ///
    /// # Errors
    ///
    /// Returns `CertificateParseError` if the provider published `kid` with
    /// an undecodable certificate, and `KeyNotFound` if it did not publish
    /// `kid` at all.
    pub fn resolve(&self, kid: &str) -> ValidationResult<&SigningKey> {
        if let Some(key) = self.keys.get(kid) {
            return Ok(key);
        }

        match self.unusable.get(kid) {
            Some(reason) => Err(ValidationError::certificate_parse(reason.clone())),
            None => Err(ValidationError::key_not_found(kid)),
        }
    }

    #[must_use]
    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.get(kid)
    }

    /// Key ids of the usable keys.
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn fetched_at(&self) -> OffsetDateTime {
        self.fetched_at
    }

    #[must_use]
    pub fn valid_until(&self) -> Instant {
        self.valid_until
    }

    /// Returns `true` until the validity window has elapsed.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        Instant::now() < self.valid_until
    }
}

type PendingRefresh = Shared<BoxFuture<'static, ValidationResult<Arc<KeySet>>>>;

/// Cache of the provider's signing keys.
///
/// Cloning is cheap; clones share the same cache.
///
/// # Example
///
/// ```ignore
/// use idgate_auth::keys::KeyCache;
///
/// let cache = KeyCache::from_config(KeyCacheConfig::default())?;
/// let keys = cache.get_keys().await?;
/// let key = keys.resolve("kid-from-token-header")?;
/// ```
#[derive(Clone)]
pub struct KeyCache {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn KeySource>,
    config: KeyCacheConfig,
    current: ArcSwapOption<KeySet>,
    in_flight: Mutex<Option<PendingRefresh>>,
}

impl KeyCache {
    /// Creates an empty cache over `source`.
    #[must_use]
    pub fn new(source: Arc<dyn KeySource>, config: KeyCacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                current: ArcSwapOption::empty(),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Creates an empty cache that fetches from `config.certificates_url`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn from_config(config: KeyCacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let source = HttpCertificateSource::new(&config)?;
        Ok(Self::new(Arc::new(source), config))
    }

    #[must_use]
    pub fn config(&self) -> &KeyCacheConfig {
        &self.inner.config
    }

    /// Returns the current key set, refreshing it first if it is missing or
    /// expired.
    ///
    /// # Errors
    ///
    /// Returns `KeyFetchError` if a refresh was needed and failed, unless the
    /// stale grace period allows the previous set to be served.
    pub async fn get_keys(&self) -> ValidationResult<Arc<KeySet>> {
        if let Some(keys) = self.inner.current.load_full()
            && keys.is_fresh()
        {
            tracing::trace!("Using cached signing keys");
            return Ok(keys);
        }

        tracing::debug!("Signing keys missing or expired, refreshing");
        match Arc::clone(&self.inner).join_or_start_refresh().await {
            Ok(keys) => Ok(keys),
            Err(err) => self.inner.serve_stale(err),
        }
    }

    /// Fetches keys and logs the outcome. A failure is not fatal: the next
    /// [`get_keys`](Self::get_keys) call retries.
    pub async fn warm(&self) {
        match self.get_keys().await {
            Ok(keys) => tracing::info!(keys = keys.len(), "Signing key cache warmed"),
            Err(err) => tracing::warn!(error = %err, "Failed to warm signing key cache"),
        }
    }

    /// Drops the current key set so the next lookup refetches.
    pub fn invalidate(&self) {
        self.inner.current.store(None);
        tracing::debug!("Invalidated signing key cache");
    }

    /// The current key set, fresh or not, without triggering a refresh.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<KeySet>> {
        self.inner.current.load_full()
    }
}

impl Inner {
    fn join_or_start_refresh(self: Arc<Self>) -> PendingRefresh {
        let mut in_flight = self.in_flight.lock();

        if let Some(pending) = in_flight.as_ref() {
            tracing::trace!("Joining in-flight signing key refresh");
            return pending.clone();
        }

        // A refresh may have completed between the caller's check and the lock.
        if let Some(keys) = self.current.load_full()
            && keys.is_fresh()
        {
            return future::ready(Ok(keys)).boxed().shared();
        }

        let inner = Arc::clone(&self);
        let task = tokio::spawn(async move { inner.refresh().await });

        let pending = async move {
            task.await.unwrap_or_else(|e| {
                Err(ValidationError::key_fetch("signing key refresh task failed").with_source(e))
            })
        }
        .boxed()
        .shared();

        *in_flight = Some(pending.clone());
        pending
    }

    async fn refresh(&self) -> ValidationResult<Arc<KeySet>> {
        let result = self.fetch_key_set().await;

        // Publish before clearing the slot so a caller that finds no refresh
        // in flight also finds the new set.
        let mut in_flight = self.in_flight.lock();
        match &result {
            Ok(keys) => {
                self.current.store(Some(Arc::clone(keys)));
                tracing::info!(
                    keys = keys.len(),
                    unusable = keys.unusable.len(),
                    "Signing keys refreshed"
                );
            }
            Err(err) => tracing::warn!(error = %err, "Signing key refresh failed"),
        }
        *in_flight = None;

        result
    }

    async fn fetch_key_set(&self) -> ValidationResult<Arc<KeySet>> {
        let document = self.source.fetch().await?;

        if document.certificates.is_empty() {
            return Err(ValidationError::key_fetch(
                "certificate document contains no keys",
            ));
        }

        let ttl = self.config.ttl_for(document.max_age);
        tracing::debug!(ttl = ?ttl, "Caching signing keys");
        Ok(Arc::new(KeySet::from_document(document, ttl)))
    }

    fn serve_stale(&self, err: ValidationError) -> ValidationResult<Arc<KeySet>> {
        let grace = self.config.stale_grace_period;

        if !grace.is_zero()
            && let Some(stale) = self.current.load_full()
            && stale
                .valid_until()
                .checked_add(grace.min(MAX_CACHE_DURATION))
                .is_some_and(|deadline| Instant::now() < deadline)
        {
            tracing::warn!(error = %err, "Serving expired signing keys after failed refresh");
            return Ok(stale);
        }

        Err(err)
    }
}
