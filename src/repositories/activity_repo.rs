use async_trait::async_trait;

use crate::{models::activity::ActivityAction, Result};

use super::PostgresRepo;

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn log_activity(
        &self,
        admin_user_id: i32,
        action: ActivityAction,
        details: &str,
    ) -> Result<()>;
}

#[async_trait]
impl ActivityRepository for PostgresRepo {
    async fn log_activity(
        &self,
        admin_user_id: i32,
        action: ActivityAction,
        details: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (admin_user_id, action, details, created_at)
            VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(admin_user_id)
        .bind(action.to_str())
        .bind(details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
