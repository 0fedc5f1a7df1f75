use super::contains_pattern;
use crate::error::RepositoryError;
use crate::models::{Contribution, ContributionFilter, ContributionStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Contribution joined with member and equb names for the admin list
#[derive(Debug, Clone, FromRow)]
pub struct ContributionEntry {
    pub id: Uuid,
    pub equb_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub status: String,
    pub full_name: String,
    pub equb_name: String,
}

pub struct ContributionRepository {
    pool: PgPool,
}

impl ContributionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a pending contribution dated today
    pub async fn create_pending(
        &self,
        equb_id: Uuid,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<Contribution, RepositoryError> {
        let contribution = sqlx::query_as::<_, Contribution>(
            r#"
            INSERT INTO contributions (equb_id, user_id, date, amount, status)
            VALUES ($1, $2, CURRENT_DATE, $3, 'pending')
            RETURNING id, equb_id, user_id, date, amount, status
            "#,
        )
        .bind(equb_id)
        .bind(user_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await?;
        Ok(contribution)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Contribution>, RepositoryError> {
        let contribution = sqlx::query_as::<_, Contribution>(
            "SELECT id, equb_id, user_id, date, amount, status FROM contributions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(contribution)
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: ContributionStatus,
    ) -> Result<Contribution, RepositoryError> {
        let contribution = sqlx::query_as::<_, Contribution>(
            r#"
            UPDATE contributions
            SET status = $2
            WHERE id = $1
            RETURNING id, equb_id, user_id, date, amount, status
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("Contribution {} not found", id)))?;
        Ok(contribution)
    }

    /// Admin view over all contributions, newest first
    pub async fn list(&self, filter: &ContributionFilter) -> Result<Vec<ContributionEntry>, RepositoryError> {
        let pattern = contains_pattern(filter.search.as_deref());
        let entries = sqlx::query_as::<_, ContributionEntry>(
            r#"
            SELECT c.id, c.equb_id, c.user_id, c.date, c.amount, c.status,
                   p.full_name, e.name AS equb_name
            FROM contributions c
            JOIN profiles p ON p.id = c.user_id
            JOIN equbs e ON e.id = c.equb_id
            WHERE ($1::text IS NULL OR p.full_name ILIKE $1 ESCAPE '\' OR e.name ILIKE $1 ESCAPE '\')
              AND ($2::text IS NULL OR c.status = $2)
            ORDER BY c.date DESC, c.id DESC
            "#,
        )
        .bind(pattern)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// A member's own history in one equb, newest first
    pub async fn list_for_member(
        &self,
        user_id: Uuid,
        equb_id: Uuid,
        status: Option<ContributionStatus>,
    ) -> Result<Vec<Contribution>, RepositoryError> {
        let contributions = sqlx::query_as::<_, Contribution>(
            r#"
            SELECT id, equb_id, user_id, date, amount, status
            FROM contributions
            WHERE user_id = $1 AND equb_id = $2
              AND ($3::text IS NULL OR status = $3)
            ORDER BY date DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(equb_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(contributions)
    }

    /// Sum of every paid contribution
    pub async fn total_paid(&self) -> Result<Decimal, RepositoryError> {
        let total = sqlx::query_scalar::<_, Option<Decimal>>(
            "SELECT SUM(amount) FROM contributions WHERE status = 'paid'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(total.unwrap_or(Decimal::ZERO))
    }

    /// Sum of paid contributions grouped by equb type
    pub async fn paid_by_equb_type(&self) -> Result<Vec<(String, Decimal)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, Decimal)>(
            r#"
            SELECT e.equb_type, SUM(c.amount)
            FROM contributions c
            JOIN equbs e ON e.id = c.equb_id
            WHERE c.status = 'paid'
            GROUP BY e.equb_type
            ORDER BY e.equb_type
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
