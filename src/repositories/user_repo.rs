use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    models::users::{AdminIdentity, AdminUser},
    Result,
};

use super::PostgresRepo;

#[async_trait]
pub trait AdminUserRepository: Send + Sync {
    async fn find_active_by_username(&self, username: &str) -> Result<Option<AdminUser>>;
    async fn touch_last_login(&self, user_id: i32) -> Result<()>;
    async fn create_admin(
        &self,
        username: &str,
        password_hash: &str,
        email: Option<&str>,
    ) -> Result<i32>;
    /// Returns the id of the updated admin, `None` when the username is unknown.
    async fn update_password(&self, username: &str, password_hash: &str) -> Result<Option<i32>>;

    async fn create_session(
        &self,
        session_id: Uuid,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;
    /// Only unexpired sessions of active admins resolve.
    async fn find_session(&self, session_id: Uuid) -> Result<Option<AdminIdentity>>;
    async fn extend_session(&self, session_id: Uuid, expires_at: DateTime<Utc>) -> Result<bool>;
    async fn delete_session(&self, session_id: Uuid) -> Result<bool>;
    async fn delete_user_sessions(&self, user_id: i32) -> Result<u64>;
    async fn purge_expired_sessions(&self) -> Result<u64>;
}

#[async_trait]
impl AdminUserRepository for PostgresRepo {
    #[instrument(skip(self))]
    async fn find_active_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        let user = sqlx::query_as::<_, AdminUser>(
            r#"
            SELECT id, username, password_hash, email, is_active, last_login, created_at
            FROM admin_users
            WHERE username = $1 AND is_active
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        tracing::info!(user_found = user.is_some(), "Admin lookup completed");

        Ok(user)
    }

    async fn touch_last_login(&self, user_id: i32) -> Result<()> {
        sqlx::query("UPDATE admin_users SET last_login = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn create_admin(
        &self,
        username: &str,
        password_hash: &str,
        email: Option<&str>,
    ) -> Result<i32> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO admin_users (username, password_hash, email, is_active, created_at)
            VALUES ($1, $2, $3, TRUE, NOW())
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    #[instrument(skip(self, password_hash))]
    async fn update_password(&self, username: &str, password_hash: &str) -> Result<Option<i32>> {
        let id: Option<i32> = sqlx::query_scalar(
            "UPDATE admin_users SET password_hash = $2 WHERE username = $1 RETURNING id",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    async fn create_session(
        &self,
        session_id: Uuid,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO admin_sessions (id, admin_user_id, expires_at, created_at)
            VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<AdminIdentity>> {
        let identity = sqlx::query_as::<_, AdminIdentity>(
            r#"
            SELECT u.id, u.username
            FROM admin_sessions s
            JOIN admin_users u ON u.id = s.admin_user_id
            WHERE s.id = $1 AND s.expires_at > NOW() AND u.is_active
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    async fn extend_session(&self, session_id: Uuid, expires_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("UPDATE admin_sessions SET expires_at = $2 WHERE id = $1")
            .bind(session_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_user_sessions(&self, user_id: i32) -> Result<u64> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE admin_user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn purge_expired_sessions(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
