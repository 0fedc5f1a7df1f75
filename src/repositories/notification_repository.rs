use crate::error::RepositoryError;
use crate::models::{NewNotification, Notification};
use sqlx::PgPool;
use uuid::Uuid;

pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a batch of notifications in one statement, returning the count
    pub async fn insert_many(&self, batch: &[NewNotification]) -> Result<u64, RepositoryError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let user_ids: Vec<Uuid> = batch.iter().map(|n| n.user_id).collect();
        let messages: Vec<String> = batch.iter().map(|n| n.message.clone()).collect();

        let rows_affected = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, message)
            SELECT * FROM UNNEST($1::uuid[], $2::text[])
            "#,
        )
        .bind(user_ids)
        .bind(messages)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }

    /// Notifications of one user, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, message, created_at, read
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT read",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Mark every unread notification of the user as read
    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let rows_affected = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE user_id = $1 AND NOT read",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }
}
