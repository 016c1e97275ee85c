//! In-memory identity, pending code and rate limit stores.

use crate::crypto::digests_match;
use crate::error::{GuestError, Result};
use crate::providers::{IdentityRepository, PendingOtpStore, RateLimiter};
use crate::state::{ContactUpdate, GuestId, GuestIdentity, PendingOtp, StoredToken, VerifyOutcome};
use crate::validation::strip_phone_separators;
use chrono::{DateTime, Utc};
use service_portal_core::environment::{Clock, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Identity repository backed by a `HashMap`.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityRepository {
    identities: Arc<Mutex<HashMap<GuestId, GuestIdentity>>>,
}

impl InMemoryIdentityRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of guests.
    pub async fn len(&self) -> usize {
        self.identities.lock().await.len()
    }

    /// Whether no guest is registered.
    pub async fn is_empty(&self) -> bool {
        self.identities.lock().await.is_empty()
    }
}

impl IdentityRepository for InMemoryIdentityRepository {
    async fn find_by_document(&self, document: &str) -> Result<Option<GuestIdentity>> {
        Ok(self
            .identities
            .lock()
            .await
            .values()
            .find(|identity| identity.document == document)
            .cloned())
    }

    async fn find_by_id(&self, id: GuestId) -> Result<Option<GuestIdentity>> {
        Ok(self.identities.lock().await.get(&id).cloned())
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<GuestIdentity>> {
        Ok(self
            .identities
            .lock()
            .await
            .values()
            .find(|identity| {
                identity
                    .token
                    .as_ref()
                    .is_some_and(|token| digests_match(&token.hash, token_hash))
            })
            .cloned())
    }

    async fn insert(&self, identity: GuestIdentity) -> Result<()> {
        let mut identities = self.identities.lock().await;
        if identities.values().any(|i| i.document == identity.document) {
            return Err(GuestError::Conflict(
                "A user with this document is already registered; use the sign-in option."
                    .into(),
            ));
        }
        identities.insert(identity.id, identity);
        Ok(())
    }

    async fn set_token(&self, id: GuestId, token: Option<StoredToken>) -> Result<()> {
        let mut identities = self.identities.lock().await;
        let identity = identities
            .get_mut(&id)
            .ok_or_else(|| GuestError::NotFound("Guest not found".into()))?;
        identity.token = token;
        Ok(())
    }

    async fn update_contact(
        &self,
        id: GuestId,
        update: ContactUpdate,
        now: DateTime<Utc>,
    ) -> Result<GuestIdentity> {
        let mut identities = self.identities.lock().await;
        let identity = identities
            .get_mut(&id)
            .ok_or_else(|| GuestError::NotFound("Guest not found".into()))?;
        identity.apply(update, now);
        Ok(identity.clone())
    }
}

/// Pending code store backed by a `HashMap` keyed by the digits of the phone.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPendingOtpStore {
    pending: Arc<Mutex<HashMap<String, PendingOtp>>>,
}

impl InMemoryPendingOtpStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending codes.
    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Whether nothing is pending.
    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }
}

impl PendingOtpStore for InMemoryPendingOtpStore {
    async fn put(&self, pending: PendingOtp) -> Result<()> {
        let key = strip_phone_separators(&pending.phone);
        let mut map = self.pending.lock().await;
        // One pending code per document as well as per phone.
        map.retain(|k, p| *k == key || p.document != pending.document);
        map.insert(key, pending);
        Ok(())
    }

    async fn find_by_document(&self, document: &str) -> Result<Option<PendingOtp>> {
        Ok(self
            .pending
            .lock()
            .await
            .values()
            .find(|p| p.document == document)
            .cloned())
    }

    async fn verify(
        &self,
        phone: &str,
        code_hash: &str,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<VerifyOutcome> {
        let key = strip_phone_separators(phone);
        let mut map = self.pending.lock().await;
        let Some(entry) = map.get_mut(&key) else {
            return Ok(VerifyOutcome::Missing);
        };

        if entry.is_expired(now) {
            map.remove(&key);
            return Ok(VerifyOutcome::Expired);
        }

        if digests_match(&entry.code_hash, code_hash) {
            let verified = map.remove(&key).map(Box::new);
            return Ok(verified.map_or(VerifyOutcome::Missing, VerifyOutcome::Verified));
        }

        entry.attempts += 1;
        if entry.attempts >= max_attempts {
            map.remove(&key);
            return Ok(VerifyOutcome::Exhausted);
        }
        Ok(VerifyOutcome::Mismatch {
            remaining: max_attempts - entry.attempts,
        })
    }

    async fn delete(&self, phone: &str) -> Result<()> {
        self.pending
            .lock()
            .await
            .remove(&strip_phone_separators(phone));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Fixed-window rate limiter held in memory.
///
/// Windows start at the first request for a key.
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    windows: Arc<Mutex<HashMap<String, Window>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRateLimiter {
    /// Create a limiter on the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a limiter on `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRateLimiter").finish_non_exhaustive()
    }
}

impl RateLimiter for InMemoryRateLimiter {
    async fn check_and_record(&self, key: &str, max_attempts: u32, window: Duration) -> Result<()> {
        let now = self.clock.now();
        let length = chrono::Duration::from_std(window)
            .map_err(|e| GuestError::Storage(e.to_string()))?;
        let mut windows = self.windows.lock().await;

        // Drop windows that have run out so the map does not grow unbounded.
        windows.retain(|_, w| now < w.started_at + length);

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if entry.count >= max_attempts {
            let retry_after = (entry.started_at + length - now).num_seconds().max(1);
            return Err(GuestError::RateLimited {
                message: "Too many requests. Please slow down.".into(),
                retry_after_secs: u64::try_from(retry_after).unwrap_or(1),
            });
        }
        entry.count += 1;
        Ok(())
    }

    async fn reset(&self, key: &str) -> Result<()> {
        self.windows.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OtpChannel;
    use crate::crypto::hash_secret;
    use crate::state::{OtpPurpose, RegistrationForm};
    use service_portal_testing::mocks::ManualClock;

    fn identity(document: &str) -> GuestIdentity {
        GuestIdentity::from_form(
            RegistrationForm {
                document: document.into(),
                full_name: "Ana Gómez".into(),
                ..RegistrationForm::default()
            },
            Utc::now(),
        )
    }

    fn pending(phone: &str, document: &str, code: &str, now: DateTime<Utc>) -> PendingOtp {
        PendingOtp {
            phone: phone.into(),
            document: document.into(),
            code_hash: hash_secret(code),
            channel: OtpChannel::Sms,
            issued_at: now,
            expires_at: now + chrono::Duration::minutes(5),
            attempts: 0,
            last_sent_at: now,
            purpose: OtpPurpose::Login {
                identity_id: GuestId::new(),
            },
        }
    }

    #[tokio::test]
    async fn test_duplicate_document_conflicts() {
        let repo = InMemoryIdentityRepository::new();
        repo.insert(identity("10203040")).await.unwrap();
        let err = repo.insert(identity("10203040")).await.unwrap_err();
        assert!(matches!(err, GuestError::Conflict(_)));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_token_lookup_after_rotation() {
        let repo = InMemoryIdentityRepository::new();
        let guest = identity("10203040");
        let id = guest.id;
        repo.insert(guest).await.unwrap();

        for hash in ["first", "second"] {
            repo.set_token(
                id,
                Some(StoredToken {
                    hash: hash.into(),
                    issued_at: Utc::now(),
                }),
            )
            .await
            .unwrap();
        }
        assert!(repo.find_by_token_hash("first").await.unwrap().is_none());
        assert_eq!(repo.find_by_token_hash("second").await.unwrap().unwrap().id, id);
    }

    #[tokio::test]
    async fn test_verify_consumes_once() {
        let store = InMemoryPendingOtpStore::new();
        let now = Utc::now();
        store
            .put(pending("+57 300 123 4567", "10203040", "123456", now))
            .await
            .unwrap();

        let hash = hash_secret("123456");
        let first = store.verify("+573001234567", &hash, now, 5).await.unwrap();
        assert!(matches!(first, VerifyOutcome::Verified(_)));
        let replay = store.verify("+573001234567", &hash, now, 5).await.unwrap();
        assert_eq!(replay, VerifyOutcome::Missing);
    }

    #[tokio::test]
    async fn test_verify_counts_down_then_exhausts() {
        let store = InMemoryPendingOtpStore::new();
        let now = Utc::now();
        store.put(pending("+573001234567", "10203040", "123456", now)).await.unwrap();

        let wrong = hash_secret("000000");
        assert_eq!(
            store.verify("+573001234567", &wrong, now, 3).await.unwrap(),
            VerifyOutcome::Mismatch { remaining: 2 }
        );
        assert_eq!(
            store.verify("+573001234567", &wrong, now, 3).await.unwrap(),
            VerifyOutcome::Mismatch { remaining: 1 }
        );
        assert_eq!(
            store.verify("+573001234567", &wrong, now, 3).await.unwrap(),
            VerifyOutcome::Exhausted
        );
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_entry_removed() {
        let store = InMemoryPendingOtpStore::new();
        let now = Utc::now();
        store.put(pending("+573001234567", "10203040", "123456", now)).await.unwrap();

        let later = now + chrono::Duration::minutes(5) + chrono::Duration::seconds(1);
        let outcome = store
            .verify("+573001234567", &hash_secret("123456"), later, 5)
            .await
            .unwrap();
        assert_eq!(outcome, VerifyOutcome::Expired);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_code_valid_at_expiry_instant() {
        let store = InMemoryPendingOtpStore::new();
        let now = Utc::now();
        store.put(pending("+573001234567", "10203040", "123456", now)).await.unwrap();

        let outcome = store
            .verify(
                "+573001234567",
                &hash_secret("123456"),
                now + chrono::Duration::minutes(5),
                5,
            )
            .await
            .unwrap();
        assert!(matches!(outcome, VerifyOutcome::Verified(_)));
    }

    #[tokio::test]
    async fn test_put_replaces_entry_for_same_document() {
        let store = InMemoryPendingOtpStore::new();
        let now = Utc::now();
        store.put(pending("+573001234567", "10203040", "111111", now)).await.unwrap();
        store.put(pending("+573009999999", "10203040", "222222", now)).await.unwrap();
        assert_eq!(store.len().await, 1);
        let found = store.find_by_document("10203040").await.unwrap().unwrap();
        assert_eq!(found.phone, "+573009999999");
    }

    #[tokio::test]
    async fn test_rate_limiter_window() {
        let clock = ManualClock::new(Utc::now());
        let limiter = InMemoryRateLimiter::with_clock(Arc::new(clock.clone()));
        let window = Duration::from_secs(60);

        for _ in 0..3 {
            limiter.check_and_record("verify:10.0.0.1", 3, window).await.unwrap();
        }
        let err = limiter
            .check_and_record("verify:10.0.0.1", 3, window)
            .await
            .unwrap_err();
        assert!(matches!(err, GuestError::RateLimited { .. }));
        limiter.check_and_record("verify:10.0.0.2", 3, window).await.unwrap();

        clock.advance(chrono::Duration::seconds(60));
        limiter.check_and_record("verify:10.0.0.1", 3, window).await.unwrap();
    }

    #[tokio::test]
    async fn test_rate_limiter_reset() {
        let limiter = InMemoryRateLimiter::new();
        let window = Duration::from_secs(60);
        limiter.check_and_record("k", 1, window).await.unwrap();
        assert!(limiter.check_and_record("k", 1, window).await.is_err());
        limiter.reset("k").await.unwrap();
        assert!(limiter.check_and_record("k", 1, window).await.is_ok());
    }
}
