use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    use_cases::auth::AuthTokenRepo,
};

#[async_trait]
impl AuthTokenRepo for PostgresPersistence {
    async fn delete_unconsumed_for_email(&self, email: &str) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM auth_tokens WHERE email = $1 AND consumed_at IS NULL")
                .bind(email)
                .execute(self.pool())
                .await
                .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }

    async fn create(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<()> {
        sqlx::query("INSERT INTO auth_tokens (token_hash, email, expires_at) VALUES ($1, $2, $3)")
            .bind(token_hash)
            .bind(email)
            .bind(expires_at)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn consume(&self, token_hash: &str, now: NaiveDateTime) -> AppResult<Option<String>> {
        // One conditional write, not read-then-write: two racing
        // verifications cannot both observe an unconsumed row.
        let row: Option<(String,)> = sqlx::query_as(
            "UPDATE auth_tokens SET consumed_at = $2 \
             WHERE token_hash = $1 AND consumed_at IS NULL AND expires_at > $2 \
             RETURNING email",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(|(email,)| email))
    }

    async fn consumed_since(&self, email: &str, since: NaiveDateTime) -> AppResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM auth_tokens WHERE email = $1 AND consumed_at >= $2)",
        )
        .bind(email)
        .bind(since)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(exists)
    }

    async fn delete_expired_before(&self, cutoff: NaiveDateTime) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at < $1")
            .bind(cutoff)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
