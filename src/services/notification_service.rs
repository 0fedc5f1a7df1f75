use crate::auth;
use crate::error::{AppError, AppResult};
use crate::models::{BroadcastTarget, NewNotification, Notification, Profile, Role};
use crate::repositories::{MembershipRepository, NotificationRepository, ProfileRepository};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Length of the message preview echoed back to the sender of a broadcast
const SENDER_PREVIEW_CHARS: usize = 50;

/// Service for delivering and reading in-app notifications
pub struct NotificationService {
    notification_repo: Arc<NotificationRepository>,
    profile_repo: Arc<ProfileRepository>,
    membership_repo: Arc<MembershipRepository>,
}

impl NotificationService {
    pub fn new(
        notification_repo: Arc<NotificationRepository>,
        profile_repo: Arc<ProfileRepository>,
        membership_repo: Arc<MembershipRepository>,
    ) -> Self {
        Self {
            notification_repo,
            profile_repo,
            membership_repo,
        }
    }

    /// Insert a batch after a primary write has succeeded. Failures are
    /// logged and swallowed; the primary write is not rolled back.
    pub async fn deliver(&self, batch: Vec<NewNotification>) -> u64 {
        if batch.is_empty() {
            return 0;
        }
        match self.notification_repo.insert_many(&batch).await {
            Ok(count) => count,
            Err(e) => {
                error!("Failed to deliver {} notifications: {}", batch.len(), e);
                0
            }
        }
    }

    /// Send the same message to every admin
    pub async fn notify_admins(&self, message: &str) -> u64 {
        match self.profile_repo.ids_by_role(Role::Admin).await {
            Ok(ids) => self.deliver(NewNotification::fan_out(&ids, message)).await,
            Err(e) => {
                error!("Failed to look up admins for notification: {}", e);
                0
            }
        }
    }

    /// Send a message to the first admin, if there is one
    pub async fn notify_first_admin(&self, message: &str) -> u64 {
        match self.profile_repo.find_first_admin().await {
            Ok(Some(admin)) => self.deliver(vec![NewNotification::new(admin.id, message)]).await,
            Ok(None) => {
                warn!("No admin found to notify: {}", message);
                0
            }
            Err(e) => {
                error!("Failed to look up admin for notification: {}", e);
                0
            }
        }
    }

    /// Send a message to every approved member of an equb
    pub async fn notify_equb_members(&self, equb_id: Uuid, message: &str) -> u64 {
        match self.membership_repo.approved_member_ids(equb_id).await {
            Ok(ids) => self.deliver(NewNotification::fan_out(&ids, message)).await,
            Err(e) => {
                error!("Failed to look up members of equb {}: {}", equb_id, e);
                0
            }
        }
    }

    /// Admin broadcast to a set of recipients plus a copy for the sender.
    /// Returns the number of notifications inserted.
    pub async fn broadcast(
        &self,
        actor: &Profile,
        target: BroadcastTarget,
        message: &str,
    ) -> AppResult<u64> {
        auth::require_admin(actor)?;

        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation(
                "Notification message cannot be empty".to_string(),
            ));
        }

        let recipients = match target {
            BroadcastTarget::AllMembers => self.profile_repo.ids_by_role(Role::Member).await?,
            BroadcastTarget::Member(user_id) => {
                let profile = self
                    .profile_repo
                    .find_by_id(user_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Member {} not found", user_id)))?;
                vec![profile.id]
            }
            BroadcastTarget::EqubMembers(equb_id) => {
                let ids = self.membership_repo.approved_member_ids(equb_id).await?;
                if ids.is_empty() {
                    return Err(AppError::Validation(
                        "This equb has no approved members to notify".to_string(),
                    ));
                }
                ids
            }
        };

        let mut batch = NewNotification::fan_out(&recipients, message);
        batch.push(NewNotification::new(actor.id, sender_copy(message)));

        let sent = self.notification_repo.insert_many(&batch).await?;
        info!(
            "Admin {} broadcast to {:?}: {} notifications",
            actor.id, target, sent
        );
        Ok(sent)
    }

    /// Notifications of a user, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        Ok(self.notification_repo.list_for_user(user_id).await?)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        Ok(self.notification_repo.unread_count(user_id).await?)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let updated = self.notification_repo.mark_all_read(user_id).await?;
        if updated > 0 {
            info!("Marked {} notifications read for {}", updated, user_id);
        }
        Ok(updated)
    }
}

/// Copy of a broadcast kept in the sender's own inbox
pub fn sender_copy(message: &str) -> String {
    let preview: String = message.chars().take(SENDER_PREVIEW_CHARS).collect();
    format!("You sent: \"{}...\"", preview)
}
