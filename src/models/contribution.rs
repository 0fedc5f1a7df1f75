use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Payment state of a contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionStatus {
    Paid,
    Pending,
    Late,
}

impl ContributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionStatus::Paid => "paid",
            ContributionStatus::Pending => "pending",
            ContributionStatus::Late => "late",
        }
    }
}

impl FromStr for ContributionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paid" => Ok(ContributionStatus::Paid),
            "pending" => Ok(ContributionStatus::Pending),
            "late" => Ok(ContributionStatus::Late),
            _ => Err(format!("Invalid contribution status: {}", s)),
        }
    }
}

/// One member payment towards an equb
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contribution {
    pub id: Uuid,
    pub equb_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub status: String, // Stored as TEXT, use ContributionStatus enum for type safety
}

impl Contribution {
    pub fn status_enum(&self) -> ContributionStatus {
        self.status.parse().unwrap_or(ContributionStatus::Pending)
    }

    pub fn is_paid(&self) -> bool {
        self.status_enum() == ContributionStatus::Paid
    }
}

/// Admin list filter over all contributions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContributionFilter {
    /// Matched against member name or equb name
    pub search: Option<String>,
    pub status: Option<ContributionStatus>,
}
