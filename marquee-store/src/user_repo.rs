use async_trait::async_trait;
use marquee_core::{LedgerError, LedgerResult, UserRepository};
use marquee_shared::User;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::rows::{db_error, is_unique_violation, UserRow, USER_COLUMNS};

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn ensure_user(&self, user: &User) -> LedgerResult<()> {
        let inserted = sqlx::query(
            "INSERT INTO users (id, email, name, role, created_at) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if inserted.rows_affected() > 0 {
            info!(user_id = %user.id, role = user.role.as_str(), "User provisioned");
        }
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> LedgerResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(User::try_from).transpose()
    }

    async fn update_profile(&self, id: Uuid, name: &str, email: &str) -> LedgerResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET name = $2, email = $3 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::Conflict("Email is already taken".to_string())
            } else {
                db_error(e)
            }
        })?;

        row.ok_or(LedgerError::NotFound("User"))?.try_into()
    }
}
