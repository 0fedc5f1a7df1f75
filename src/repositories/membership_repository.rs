use crate::error::RepositoryError;
use crate::models::{Membership, MembershipStatus};
use chrono::NaiveDateTime;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Pending request joined with the names an admin needs to decide on it
#[derive(Debug, Clone, FromRow)]
pub struct PendingRequest {
    pub user_id: Uuid,
    pub equb_id: Uuid,
    pub full_name: String,
    pub equb_name: String,
    pub join_date: NaiveDateTime,
}

/// Approved member of an equb with the date they joined
#[derive(Debug, Clone, FromRow)]
pub struct MemberJoin {
    pub user_id: Uuid,
    pub join_date: NaiveDateTime,
}

pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the membership for (user, equb)
    pub async fn find(&self, user_id: Uuid, equb_id: Uuid) -> Result<Option<Membership>, RepositoryError> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT user_id, equb_id, status, join_date
            FROM memberships
            WHERE user_id = $1 AND equb_id = $2
            "#,
        )
        .bind(user_id)
        .bind(equb_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(membership)
    }

    /// Insert or reset a membership to pending with a fresh join date
    pub async fn upsert_pending(&self, user_id: Uuid, equb_id: Uuid) -> Result<Membership, RepositoryError> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (user_id, equb_id, status, join_date)
            VALUES ($1, $2, 'pending', NOW())
            ON CONFLICT (user_id, equb_id) DO UPDATE
            SET status = 'pending', join_date = NOW()
            RETURNING user_id, equb_id, status, join_date
            "#,
        )
        .bind(user_id)
        .bind(equb_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(membership)
    }

    /// Set the status of an existing membership
    pub async fn set_status(
        &self,
        user_id: Uuid,
        equb_id: Uuid,
        status: MembershipStatus,
    ) -> Result<Membership, RepositoryError> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            UPDATE memberships
            SET status = $3
            WHERE user_id = $1 AND equb_id = $2
            RETURNING user_id, equb_id, status, join_date
            "#,
        )
        .bind(user_id)
        .bind(equb_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            RepositoryError::NotFound(format!(
                "Membership of {} in equb {} not found",
                user_id, equb_id
            ))
        })?;
        Ok(membership)
    }

    /// All pending requests, oldest first
    pub async fn list_pending(&self) -> Result<Vec<PendingRequest>, RepositoryError> {
        let requests = sqlx::query_as::<_, PendingRequest>(
            r#"
            SELECT m.user_id, m.equb_id, p.full_name, e.name AS equb_name, m.join_date
            FROM memberships m
            JOIN profiles p ON p.id = m.user_id
            JOIN equbs e ON e.id = m.equb_id
            WHERE m.status = 'pending'
            ORDER BY m.join_date ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    /// Approved member IDs of an equb in join order
    pub async fn approved_member_ids(&self, equb_id: Uuid) -> Result<Vec<Uuid>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT user_id FROM memberships
            WHERE equb_id = $1 AND status = 'approved'
            ORDER BY join_date ASC, user_id ASC
            "#,
        )
        .bind(equb_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Approved members of an equb with their join dates
    pub async fn approved_members(&self, equb_id: Uuid) -> Result<Vec<MemberJoin>, RepositoryError> {
        let members = sqlx::query_as::<_, MemberJoin>(
            r#"
            SELECT user_id, join_date FROM memberships
            WHERE equb_id = $1 AND status = 'approved'
            ORDER BY join_date ASC, user_id ASC
            "#,
        )
        .bind(equb_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    pub async fn approved_count(&self, equb_id: Uuid) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM memberships WHERE equb_id = $1 AND status = 'approved'",
        )
        .bind(equb_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Whether the user holds an approved membership in the equb
    pub async fn is_member(&self, user_id: Uuid, equb_id: Uuid) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM memberships
                WHERE user_id = $1 AND equb_id = $2 AND status = 'approved'
            )
            "#,
        )
        .bind(user_id)
        .bind(equb_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
