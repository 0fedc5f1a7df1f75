use super::contains_pattern;
use crate::error::RepositoryError;
use crate::models::{Cycle, Equb, EqubFilter, EqubStatus, EqubType};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

const EQUB_COLUMNS: &str = "id, created_at, created_by, name, equb_type, contribution_amount, \
     cycle, max_members, status, start_date, next_due_date, winnable_amount";

/// Column values written on create and update
#[derive(Debug, Clone)]
pub struct EqubRecord {
    pub name: String,
    pub equb_type: EqubType,
    pub contribution_amount: Decimal,
    pub cycle: Cycle,
    pub max_members: i32,
    pub status: EqubStatus,
    pub start_date: NaiveDate,
    pub next_due_date: NaiveDate,
    pub winnable_amount: Decimal,
}

/// Repository for equb data access
pub struct EqubRepository {
    pool: PgPool,
}

impl EqubRepository {
    /// Create a new EqubRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new equb
    pub async fn create(&self, created_by: Uuid, record: &EqubRecord) -> Result<Equb, RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO equbs (created_by, name, equb_type, contribution_amount, cycle,
                               max_members, status, start_date, next_due_date, winnable_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {EQUB_COLUMNS}
            "#
        );
        let equb = sqlx::query_as::<_, Equb>(&sql)
            .bind(created_by)
            .bind(&record.name)
            .bind(record.equb_type.as_str())
            .bind(record.contribution_amount)
            .bind(record.cycle.as_str())
            .bind(record.max_members)
            .bind(record.status.as_str())
            .bind(record.start_date)
            .bind(record.next_due_date)
            .bind(record.winnable_amount)
            .fetch_one(&self.pool)
            .await?;
        Ok(equb)
    }

    /// Overwrite the editable columns of an equb
    pub async fn update(&self, id: Uuid, record: &EqubRecord) -> Result<Equb, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE equbs
            SET name = $2, equb_type = $3, contribution_amount = $4, cycle = $5,
                max_members = $6, status = $7, start_date = $8, next_due_date = $9,
                winnable_amount = $10
            WHERE id = $1
            RETURNING {EQUB_COLUMNS}
            "#
        );
        let equb = sqlx::query_as::<_, Equb>(&sql)
            .bind(id)
            .bind(&record.name)
            .bind(record.equb_type.as_str())
            .bind(record.contribution_amount)
            .bind(record.cycle.as_str())
            .bind(record.max_members)
            .bind(record.status.as_str())
            .bind(record.start_date)
            .bind(record.next_due_date)
            .bind(record.winnable_amount)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Equb {} not found", id)))?;
        Ok(equb)
    }

    /// Delete an equb (cascades to memberships, contributions and winners)
    pub async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let rows_affected = sqlx::query("DELETE FROM equbs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Find an equb by UUID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Equb>, RepositoryError> {
        let sql = format!("SELECT {EQUB_COLUMNS} FROM equbs WHERE id = $1");
        let equb = sqlx::query_as::<_, Equb>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(equb)
    }

    /// List equbs matching the filter, newest first
    pub async fn list(&self, filter: &EqubFilter) -> Result<Vec<Equb>, RepositoryError> {
        let pattern = contains_pattern(filter.search.as_deref());
        let sql = format!(
            r#"
            SELECT {EQUB_COLUMNS}
            FROM equbs
            WHERE ($1::text IS NULL OR name ILIKE $1 ESCAPE '\')
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR equb_type = $3)
            ORDER BY created_at DESC
            "#
        );
        let equbs = sqlx::query_as::<_, Equb>(&sql)
            .bind(pattern)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.equb_type.map(|t| t.as_str()))
            .fetch_all(&self.pool)
            .await?;
        Ok(equbs)
    }

    /// IDs of every equb in the given status
    pub async fn ids_by_status(&self, status: EqubStatus) -> Result<Vec<Uuid>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM equbs WHERE status = $1 ORDER BY created_at ASC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Equbs in which the user holds an approved membership
    pub async fn list_for_member(&self, user_id: Uuid) -> Result<Vec<Equb>, RepositoryError> {
        let columns = EQUB_COLUMNS
            .split(", ")
            .map(|c| format!("e.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
            SELECT {columns}
            FROM equbs e
            JOIN memberships m ON m.equb_id = e.id
            WHERE m.user_id = $1 AND m.status = 'approved'
            ORDER BY e.created_at DESC
            "#
        );
        let equbs = sqlx::query_as::<_, Equb>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(equbs)
    }

    /// Flip Open -> Active. Returns false when the equb was no longer Open,
    /// so concurrent callers cannot activate it twice.
    pub async fn activate_if_open(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let rows_affected = sqlx::query(
            "UPDATE equbs SET status = 'Active' WHERE id = $1 AND status = 'Open'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Number of equbs per status
    pub async fn count_by_status(&self) -> Result<Vec<(String, i64)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM equbs GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
