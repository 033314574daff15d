//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible
//! defaults. Use the closure parameter to override specific fields as needed.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::domain::entities::user_account::{UserAccount, UserRole};

/// Create a test account with sensible defaults.
pub fn create_test_user(overrides: impl FnOnce(&mut UserAccount)) -> UserAccount {
    let mut user = UserAccount {
        id: Uuid::new_v4(),
        email: "user@example.com".to_string(),
        role: UserRole::Candidate,
        display_name: None,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut user);
    user
}

/// A fixed timestamp so fixtures are reproducible.
pub fn test_datetime() -> NaiveDateTime {
    chrono::DateTime::from_timestamp(1_750_000_000, 0)
        .expect("valid timestamp")
        .naive_utc()
}

/// Pull the raw token out of an issued magic link URL.
pub fn token_from_link(link: &str) -> String {
    link.split("token=")
        .nth(1)
        .expect("link should carry a token query parameter")
        .to_string()
}
