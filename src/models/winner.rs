use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Winner of one round of an equb
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Winner {
    pub id: Uuid,
    pub equb_id: Uuid,
    pub user_id: Uuid,
    pub win_date: NaiveDate,
    pub round: i32,
}
