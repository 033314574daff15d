//! In-memory mock implementations of the auth ports.
//!
//! The token repo mirrors the store's conditional-write contract under a
//! mutex, so the at-most-once consumption guarantee is testable without
//! Postgres.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::auth_token::AuthToken,
    domain::entities::user_account::{UserAccount, UserRole},
    infra::rate_limit::RateLimiter,
    use_cases::auth::{AuthTokenRepo, EmailSender, UserAccountRepo},
};

// ============================================================================
// InMemoryAuthTokenRepo
// ============================================================================

/// In-memory implementation of AuthTokenRepo for testing.
#[derive(Default)]
pub struct InMemoryAuthTokenRepo {
    pub tokens: Mutex<HashMap<String, AuthToken>>,
}

impl InMemoryAuthTokenRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of unconsumed, unexpired tokens for an email (test assertions).
    pub fn live_count_for(&self, email: &str) -> usize {
        let now = Utc::now().naive_utc();
        self.tokens
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.email == email && !t.is_consumed() && !t.is_expired(now))
            .count()
    }
}

#[async_trait]
impl AuthTokenRepo for InMemoryAuthTokenRepo {
    async fn delete_unconsumed_for_email(&self, email: &str) -> AppResult<u64> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|_, t| !(t.email == email && !t.is_consumed()));
        Ok((before - tokens.len()) as u64)
    }

    async fn create(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<()> {
        self.tokens.lock().unwrap().insert(
            token_hash.to_string(),
            AuthToken {
                token_hash: token_hash.to_string(),
                email: email.to_string(),
                expires_at,
                consumed_at: None,
                created_at: Some(Utc::now().naive_utc()),
            },
        );
        Ok(())
    }

    async fn consume(&self, token_hash: &str, now: NaiveDateTime) -> AppResult<Option<String>> {
        // Single guarded transition: first caller wins, everyone else sees a
        // consumed row.
        let mut tokens = self.tokens.lock().unwrap();
        match tokens.get_mut(token_hash) {
            Some(t) if !t.is_consumed() && !t.is_expired(now) => {
                t.consumed_at = Some(now);
                Ok(Some(t.email.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn consumed_since(&self, email: &str, since: NaiveDateTime) -> AppResult<bool> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .values()
            .any(|t| t.email == email && t.consumed_at.is_some_and(|at| at >= since)))
    }

    async fn delete_expired_before(&self, cutoff: NaiveDateTime) -> AppResult<u64> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at >= cutoff);
        Ok((before - tokens.len()) as u64)
    }
}

// ============================================================================
// InMemoryUserAccountRepo
// ============================================================================

/// In-memory implementation of UserAccountRepo for testing.
#[derive(Default)]
pub struct InMemoryUserAccountRepo {
    pub users: Mutex<HashMap<Uuid, UserAccount>>,
}

impl InMemoryUserAccountRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserAccount>) -> Self {
        let map: HashMap<Uuid, UserAccount> = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: Mutex::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserAccountRepo for InMemoryUserAccountRepo {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UserAccount>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_or_create_by_email(&self, email: &str) -> AppResult<UserAccount> {
        let mut users = self.users.lock().unwrap();

        if let Some(existing) = users.values().find(|u| u.email == email) {
            return Ok(existing.clone());
        }

        let now = Utc::now().naive_utc();
        let user = UserAccount {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role: UserRole::default_for_new_accounts(),
            display_name: None,
            created_at: Some(now),
            updated_at: Some(now),
        };

        users.insert(user.id, user.clone());
        Ok(user)
    }
}

// ============================================================================
// Email senders
// ============================================================================

#[derive(Debug, Clone)]
pub struct CapturedEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Email sender that records every message instead of dispatching it.
#[derive(Default)]
pub struct InMemoryEmailSender {
    sent: Mutex<Vec<CapturedEmail>>,
}

impl InMemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn captured_emails(&self) -> Vec<CapturedEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for InMemoryEmailSender {
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> AppResult<()> {
        self.sent.lock().unwrap().push(CapturedEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Email sender whose every dispatch fails, for fail-open tests.
#[derive(Default)]
pub struct FailingEmailSender;

#[async_trait]
impl EmailSender for FailingEmailSender {
    async fn send(&self, _to: &str, _subject: &str, _html: &str, _text: &str) -> AppResult<()> {
        Err(AppError::EmailDelivery("smtp relay unreachable".into()))
    }
}

// ============================================================================
// InMemoryRateLimiter
// ============================================================================

/// In-memory rate limiter for testing.
/// Uses HashMap to track request counts per key.
pub struct InMemoryRateLimiter {
    counts: Mutex<HashMap<String, u64>>,
    max_per_ip: u64,
    max_per_email: u64,
}

impl InMemoryRateLimiter {
    pub fn new(max_per_ip: u64, max_per_email: u64) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            max_per_ip,
            max_per_email,
        }
    }

    /// Create a permissive rate limiter that never blocks (for most tests).
    pub fn permissive() -> Self {
        Self::new(u64::MAX, u64::MAX)
    }

    fn bump(&self, key: String, limit: u64) -> AppResult<()> {
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(key).or_insert(0);
        *count += 1;
        if *count > limit {
            return Err(AppError::RateLimited);
        }
        Ok(())
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check_ip(&self, ip: &str) -> AppResult<()> {
        self.bump(format!("rate:ip:{ip}"), self.max_per_ip)
    }

    async fn check_email(&self, email: &str) -> AppResult<()> {
        self.bump(
            format!("rate:email:{}", email.to_lowercase()),
            self.max_per_email,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn consume_is_first_writer_wins() {
        let repo = InMemoryAuthTokenRepo::new();
        let now = Utc::now().naive_utc();
        let expires = now + chrono::Duration::minutes(15);

        repo.create("alice@example.com", "hash-1", expires)
            .await
            .unwrap();

        assert_eq!(
            repo.consume("hash-1", now).await.unwrap().as_deref(),
            Some("alice@example.com")
        );
        assert!(repo.consume("hash-1", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn consume_ignores_expired_tokens() {
        let repo = InMemoryAuthTokenRepo::new();
        let now = Utc::now().naive_utc();

        repo.create("alice@example.com", "hash-1", now - chrono::Duration::minutes(1))
            .await
            .unwrap();

        assert!(repo.consume("hash-1", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_or_create_reuses_existing_account() {
        let repo = InMemoryUserAccountRepo::new();

        let first = repo
            .find_or_create_by_email("alice@example.com")
            .await
            .unwrap();
        let second = repo
            .find_or_create_by_email("alice@example.com")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn rate_limiter_blocks_past_the_limit() {
        let limiter = InMemoryRateLimiter::new(u64::MAX, 2);

        limiter.check_email("a@example.com").await.unwrap();
        limiter.check_email("A@example.com").await.unwrap();
        assert!(matches!(
            limiter.check_email("a@example.com").await,
            Err(AppError::RateLimited)
        ));
    }
}
