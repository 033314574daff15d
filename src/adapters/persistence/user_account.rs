use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::user_account::{UserAccount, UserRole},
    use_cases::auth::UserAccountRepo,
};

// Account row as stored in the db.
#[derive(sqlx::FromRow, Debug)]
struct UserAccountRow {
    id: Uuid,
    email: String,
    role: String,
    display_name: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl UserAccountRow {
    fn into_entity(self) -> UserAccount {
        let role = self.role.parse::<UserRole>().unwrap_or_else(|_| {
            tracing::warn!(
                account_id = %self.id,
                role = %self.role,
                "Unknown role in user_accounts row, falling back to candidate"
            );
            UserRole::Candidate
        });

        UserAccount {
            id: self.id,
            email: self.email,
            role,
            display_name: self.display_name,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        }
    }
}

const SELECT_COLUMNS: &str = "id, email, role, display_name, created_at, updated_at";

#[async_trait]
impl UserAccountRepo for PostgresPersistence {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UserAccount>> {
        let row: Option<UserAccountRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM user_accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(UserAccountRow::into_entity))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        let row: Option<UserAccountRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM user_accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(UserAccountRow::into_entity))
    }

    async fn find_or_create_by_email(&self, email: &str) -> AppResult<UserAccount> {
        // DO NOTHING + re-select keeps this safe when two verifications race
        // on the same address: exactly one insert wins, both resolve the row.
        let inserted: Option<UserAccountRow> = sqlx::query_as(&format!(
            "INSERT INTO user_accounts (id, email, role) VALUES ($1, $2, $3) \
             ON CONFLICT (email) DO NOTHING \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(UserRole::default_for_new_accounts().to_string())
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        if let Some(row) = inserted {
            return Ok(row.into_entity());
        }

        let row: UserAccountRow = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM user_accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.into_entity())
    }
}
