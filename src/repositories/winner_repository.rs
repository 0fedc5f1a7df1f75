use crate::error::RepositoryError;
use crate::models::{Equb, EqubStatus, Winner};
use crate::rules;
use sqlx::PgPool;
use uuid::Uuid;

/// Outcome of a confirmed round
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub winner: Winner,
    pub equb: Equb,
}

pub struct WinnerRepository {
    pool: PgPool,
}

impl WinnerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Winner history of an equb ordered by round
    pub async fn list_for_equb(&self, equb_id: Uuid) -> Result<Vec<Winner>, RepositoryError> {
        let winners = sqlx::query_as::<_, Winner>(
            r#"
            SELECT id, equb_id, user_id, win_date, round
            FROM winners
            WHERE equb_id = $1
            ORDER BY round ASC
            "#,
        )
        .bind(equb_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(winners)
    }

    pub async fn winner_ids(&self, equb_id: Uuid) -> Result<Vec<Uuid>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM winners WHERE equb_id = $1 ORDER BY round ASC",
        )
        .bind(equb_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Record `user_id` as the winner of the next round of `equb_id`.
    ///
    /// Locks the equb row, re-checks status and eligibility, inserts the
    /// winner and advances the equb's due date and status in one transaction.
    pub async fn record_round(&self, equb_id: Uuid, user_id: Uuid) -> Result<RoundOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let equb = sqlx::query_as::<_, Equb>(
            r#"
            SELECT id, created_at, created_by, name, equb_type, contribution_amount,
                   cycle, max_members, status, start_date, next_due_date, winnable_amount
            FROM equbs
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(equb_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("Equb {} not found", equb_id)))?;

        if equb.status_enum() != EqubStatus::Active {
            return Err(RepositoryError::BusinessRule(format!(
                "Equb \"{}\" is {}, winners can only be drawn while Active",
                equb.name, equb.status
            )));
        }

        let approved = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM memberships WHERE equb_id = $1 AND status = 'approved'",
        )
        .bind(equb_id)
        .fetch_all(&mut *tx)
        .await?;

        let past_winners = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM winners WHERE equb_id = $1",
        )
        .bind(equb_id)
        .fetch_all(&mut *tx)
        .await?;

        if !rules::eligible_members(&approved, &past_winners).contains(&user_id) {
            return Err(RepositoryError::BusinessRule(format!(
                "User {} is not eligible to win equb \"{}\"",
                user_id, equb.name
            )));
        }

        let round = rules::next_round(past_winners.len() as i64);
        let next_due = rules::advance_due_date(equb.next_due_date, equb.cycle_enum());
        let status = rules::status_after_round(round, equb.max_members);

        let winner = sqlx::query_as::<_, Winner>(
            r#"
            INSERT INTO winners (equb_id, user_id, win_date, round)
            VALUES ($1, $2, CURRENT_DATE, $3)
            RETURNING id, equb_id, user_id, win_date, round
            "#,
        )
        .bind(equb_id)
        .bind(user_id)
        .bind(round)
        .fetch_one(&mut *tx)
        .await?;

        let equb = sqlx::query_as::<_, Equb>(
            r#"
            UPDATE equbs
            SET next_due_date = $2, status = $3
            WHERE id = $1
            RETURNING id, created_at, created_by, name, equb_type, contribution_amount,
                      cycle, max_members, status, start_date, next_due_date, winnable_amount
            "#,
        )
        .bind(equb_id)
        .bind(next_due)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RoundOutcome { winner, equb })
    }
}
