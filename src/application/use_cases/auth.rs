use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use chrono::{NaiveDateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::AppResult;
use crate::application::email_templates::magic_link_email;
use crate::domain::entities::user_account::UserAccount;

// ============================================================================
// Ports
// ============================================================================

#[async_trait]
pub trait AuthTokenRepo: Send + Sync {
    /// Remove every unconsumed token for an email. Issuing a new link calls
    /// this first so at most one live token exists per address.
    async fn delete_unconsumed_for_email(&self, email: &str) -> AppResult<u64>;

    async fn create(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<()>;

    /// Conditionally mark a token consumed and return its bound email.
    /// Must be a single conditional write: only the first caller to reach an
    /// unconsumed, unexpired row gets `Some`; everyone else gets `None`.
    async fn consume(&self, token_hash: &str, now: NaiveDateTime) -> AppResult<Option<String>>;

    /// Whether any token for this email was consumed at or after `since`.
    async fn consumed_since(&self, email: &str, since: NaiveDateTime) -> AppResult<bool>;

    /// Drop tokens whose expiry lies before `cutoff`.
    async fn delete_expired_before(&self, cutoff: NaiveDateTime) -> AppResult<u64>;
}

#[async_trait]
pub trait UserAccountRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UserAccount>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>>;
    /// Returns the existing account or creates one with the default role and
    /// an empty profile. Must tolerate two verifications racing on the same
    /// email.
    async fn find_or_create_by_email(&self, email: &str) -> AppResult<UserAccount>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> AppResult<()>;
}

// ============================================================================
// Use cases
// ============================================================================

/// Outcome of a link request. `delivered` is informational only: issuance
/// does not depend on delivery.
#[derive(Debug)]
pub struct MagicLinkIssued {
    pub link: String,
    pub delivered: bool,
}

#[derive(Clone)]
pub struct AuthUseCases {
    tokens: Arc<dyn AuthTokenRepo>,
    users: Arc<dyn UserAccountRepo>,
    email: Arc<dyn EmailSender>,
    app_origin: String,
}

impl AuthUseCases {
    pub fn new(
        tokens: Arc<dyn AuthTokenRepo>,
        users: Arc<dyn UserAccountRepo>,
        email: Arc<dyn EmailSender>,
        app_origin: String,
    ) -> Self {
        Self {
            tokens,
            users,
            email,
            app_origin,
        }
    }

    /// Issue a fresh single-use link for `email` and dispatch it.
    ///
    /// Any earlier unconsumed link for the address is invalidated first. No
    /// account is created here; that happens on verification.
    #[instrument(skip(self))]
    pub async fn request_magic_link(
        &self,
        email: &str,
        ttl_minutes: i64,
    ) -> AppResult<MagicLinkIssued> {
        self.tokens.delete_unconsumed_for_email(email).await?;

        let raw = generate_token();
        let token_hash = hash_token(&raw);
        let expires_at = (Utc::now() + chrono::Duration::minutes(ttl_minutes)).naive_utc();
        self.tokens.create(email, &token_hash, expires_at).await?;

        let link = format!(
            "{}/auth/magic?token={}",
            self.app_origin.trim_end_matches('/'),
            raw
        );
        let (subject, html, text) = magic_link_email(&self.app_origin, &link, ttl_minutes);

        // The token is already persisted; a delivery failure must not undo
        // that, so it is logged and the request still succeeds (the link can
        // be re-sent).
        let delivered = match self.email.send(email, &subject, &html, &text).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "magic link email delivery failed");
                false
            }
        };

        Ok(MagicLinkIssued { link, delivered })
    }

    /// Consume a link token and resolve the account it signs in.
    ///
    /// Returns `None` for unknown, already-consumed and expired tokens alike.
    /// The account is created on first successful verification.
    #[instrument(skip(self, raw_token))]
    pub async fn verify_magic_link(&self, raw_token: &str) -> AppResult<Option<UserAccount>> {
        let token_hash = hash_token(raw_token);
        let now = Utc::now().naive_utc();

        let Some(email) = self.tokens.consume(&token_hash, now).await? else {
            return Ok(None);
        };

        let user = self.users.find_or_create_by_email(&email).await?;
        Ok(Some(user))
    }

    /// Poll-style check for a client waiting on a link clicked elsewhere:
    /// resolves the account iff some token for `email` was consumed within
    /// the trailing window. `verify_magic_link` stays the authoritative path.
    #[instrument(skip(self))]
    pub async fn check_link_status(
        &self,
        email: &str,
        window_minutes: i64,
    ) -> AppResult<Option<UserAccount>> {
        let since = (Utc::now() - chrono::Duration::minutes(window_minutes)).naive_utc();
        if !self.tokens.consumed_since(email, since).await? {
            return Ok(None);
        }
        self.users.find_by_email(email).await
    }

    /// Delete tokens expired longer than `retain_minutes` ago. The grace
    /// period keeps consumed rows visible to `check_link_status` for the full
    /// status window even when consumption happened just before expiry.
    #[instrument(skip(self))]
    pub async fn purge_expired(&self, retain_minutes: i64) -> AppResult<u64> {
        let cutoff = (Utc::now() - chrono::Duration::minutes(retain_minutes)).naive_utc();
        self.tokens.delete_expired_before(cutoff).await
    }
}

fn generate_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    let out = hasher.finalize();
    hex::encode(out)
}
