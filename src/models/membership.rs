use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Approval state of a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    Approved,
    Rejected,
}

impl MembershipStatus {
    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Approved => "approved",
            MembershipStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for MembershipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(MembershipStatus::Pending),
            "approved" => Ok(MembershipStatus::Approved),
            "rejected" => Ok(MembershipStatus::Rejected),
            _ => Err(format!("Invalid membership status: {}", s)),
        }
    }
}

/// Membership of a user in an equb, keyed by (user_id, equb_id)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub user_id: Uuid,
    pub equb_id: Uuid,
    pub status: String, // Stored as TEXT in DB, use MembershipStatus enum for type safety
    pub join_date: NaiveDateTime,
}

impl Membership {
    /// Get the status as an enum
    pub fn status_enum(&self) -> MembershipStatus {
        self.status.parse().unwrap_or(MembershipStatus::Pending)
    }

    pub fn is_approved(&self) -> bool {
        self.status_enum() == MembershipStatus::Approved
    }
}
