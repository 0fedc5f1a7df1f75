use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Application-wide role of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Profile of a registered user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub location: String,
    pub role: String, // Stored as TEXT in DB, use Role enum for type safety
    pub wallet_balance: Decimal,
    pub is_active: bool,
    pub updated_at: NaiveDateTime,
}

impl Profile {
    /// Get the role as an enum
    pub fn role_enum(&self) -> Role {
        self.role.parse().unwrap_or(Role::Member)
    }

    /// Check if the profile belongs to an administrator
    pub fn is_admin(&self) -> bool {
        self.role_enum() == Role::Admin
    }
}

/// Input for registering a new member profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub location: String,
}

/// Editable profile fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, email: Option<&str>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            email: email.map(str::to_string),
            phone: String::new(),
            location: String::new(),
            role: "member".to_string(),
            wallet_balance: Decimal::ZERO,
            is_active: true,
            updated_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_role_round_trip_and_default() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("owner".parse::<Role>().is_err());

        let mut p = profile("Abebe", None);
        assert!(!p.is_admin());
        p.role = "bogus".to_string();
        assert_eq!(p.role_enum(), Role::Member);
    }
}
