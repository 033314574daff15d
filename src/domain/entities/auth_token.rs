use chrono::NaiveDateTime;

/// A magic link token as stored. Only the SHA-256 digest of the raw token is
/// persisted; the raw value exists solely inside the emailed URL.
///
/// `consumed_at == None` is the "unused" state. The only transition is
/// unused -> consumed, performed by a conditional update so that concurrent
/// verifications cannot both win. Expiry is derived from the clock, never
/// written back.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token_hash: String,
    pub email: String,
    pub expires_at: NaiveDateTime,
    pub consumed_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
}

impl AuthToken {
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at <= now
    }
}
