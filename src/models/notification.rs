use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Message delivered to a single user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub created_at: NaiveDateTime,
    pub read: bool,
}

/// Notification waiting to be inserted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub message: String,
}

impl NewNotification {
    pub fn new(user_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            user_id,
            message: message.into(),
        }
    }

    /// Same message for every recipient
    pub fn fan_out(user_ids: &[Uuid], message: &str) -> Vec<Self> {
        user_ids.iter().map(|id| Self::new(*id, message)).collect()
    }
}

/// Who an admin broadcast is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastTarget {
    AllMembers,
    Member(Uuid),
    EqubMembers(Uuid),
}
