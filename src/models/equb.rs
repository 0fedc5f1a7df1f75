use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of an equb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EqubStatus {
    Open,
    Active,
    Completed,
}

impl EqubStatus {
    pub const ALL: [EqubStatus; 3] = [EqubStatus::Open, EqubStatus::Active, EqubStatus::Completed];

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            EqubStatus::Open => "Open",
            EqubStatus::Active => "Active",
            EqubStatus::Completed => "Completed",
        }
    }
}

impl FromStr for EqubStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(EqubStatus::Open),
            "active" => Ok(EqubStatus::Active),
            "completed" => Ok(EqubStatus::Completed),
            _ => Err(format!("Invalid equb status: {}", s)),
        }
    }
}

/// What the pool is saving towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EqubType {
    Employee,
    Drivers,
    Merchants,
    #[serde(rename = "Cooking Oven")]
    CookingOven,
    #[serde(rename = "TV")]
    Tv,
    Fridge,
    #[serde(rename = "Washing Machine")]
    WashingMachine,
}

impl EqubType {
    pub const ALL: [EqubType; 7] = [
        EqubType::Employee,
        EqubType::Drivers,
        EqubType::Merchants,
        EqubType::CookingOven,
        EqubType::Tv,
        EqubType::Fridge,
        EqubType::WashingMachine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EqubType::Employee => "Employee",
            EqubType::Drivers => "Drivers",
            EqubType::Merchants => "Merchants",
            EqubType::CookingOven => "Cooking Oven",
            EqubType::Tv => "TV",
            EqubType::Fridge => "Fridge",
            EqubType::WashingMachine => "Washing Machine",
        }
    }
}

impl FromStr for EqubType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EqubType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Invalid equb type: {}", s))
    }
}

/// Contribution frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cycle {
    Daily,
    Weekly,
    Monthly,
}

impl Cycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cycle::Daily => "daily",
            Cycle::Weekly => "weekly",
            Cycle::Monthly => "monthly",
        }
    }
}

impl FromStr for Cycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Cycle::Daily),
            "weekly" => Ok(Cycle::Weekly),
            "monthly" => Ok(Cycle::Monthly),
            _ => Err(format!("Invalid cycle: {}", s)),
        }
    }
}

/// Equb model representing one savings pool
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Equb {
    pub id: Uuid,
    pub created_at: NaiveDateTime,
    pub created_by: Uuid,
    pub name: String,
    pub equb_type: String, // Stored as TEXT, use EqubType enum for type safety
    pub contribution_amount: Decimal,
    pub cycle: String, // Stored as TEXT, use Cycle enum for type safety
    pub max_members: i32,
    pub status: String, // Stored as TEXT, use EqubStatus enum for type safety
    pub start_date: NaiveDate,
    pub next_due_date: NaiveDate,
    pub winnable_amount: Decimal,
}

impl Equb {
    /// Get status as an enum
    pub fn status_enum(&self) -> EqubStatus {
        self.status.parse().unwrap_or(EqubStatus::Open)
    }

    /// Get cycle as an enum
    pub fn cycle_enum(&self) -> Cycle {
        self.cycle.parse().unwrap_or(Cycle::Monthly)
    }

    /// Get type as an enum
    pub fn type_enum(&self) -> Option<EqubType> {
        self.equb_type.parse().ok()
    }

    pub fn is_open(&self) -> bool {
        self.status_enum() == EqubStatus::Open
    }

    pub fn is_active(&self) -> bool {
        self.status_enum() == EqubStatus::Active
    }
}

/// Validated values for creating or editing an equb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EqubInput {
    pub name: String,
    pub equb_type: EqubType,
    pub contribution_amount: Decimal,
    pub cycle: Cycle,
    pub max_members: i32,
    pub status: Option<EqubStatus>,
    pub start_date: NaiveDate,
    pub next_due_date: Option<NaiveDate>,
}

/// Admin list filter; `None` fields match everything
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EqubFilter {
    pub search: Option<String>,
    pub status: Option<EqubStatus>,
    pub equb_type: Option<EqubType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equb_type_parses_display_names() {
        assert_eq!("Cooking Oven".parse::<EqubType>().unwrap(), EqubType::CookingOven);
        assert_eq!("tv".parse::<EqubType>().unwrap(), EqubType::Tv);
        assert!("Car".parse::<EqubType>().is_err());
    }

    #[test]
    fn test_status_and_cycle_parse() {
        assert_eq!("Active".parse::<EqubStatus>().unwrap(), EqubStatus::Active);
        assert_eq!("WEEKLY".parse::<Cycle>().unwrap(), Cycle::Weekly);
        assert!("yearly".parse::<Cycle>().is_err());
    }
}
