use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Capability tag attached to every account. Accounts created through
/// magic-link verification start as `Candidate`; the other roles are assigned
/// by admin tooling outside this service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    Candidate,
    Employer,
    Admin,
}

impl UserRole {
    pub fn default_for_new_accounts() -> Self {
        UserRole::Candidate
    }
}

/// A JobMatch account as resolved from the store.
///
/// The authenticator creates accounts lazily on first successful link
/// verification and otherwise only reads them; profile fields are mutated
/// elsewhere.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub display_name: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}
