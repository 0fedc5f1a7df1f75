use crate::auth;
use crate::error::{AppError, AppResult};
use crate::models::{Membership, MembershipStatus, NewNotification, Profile};
use crate::repositories::{EqubRepository, MembershipRepository, PendingRequest, ProfileRepository};
use crate::services::{LifecycleService, NotificationService};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Service for join requests and admin approval
pub struct MembershipService {
    equb_repo: Arc<EqubRepository>,
    membership_repo: Arc<MembershipRepository>,
    profile_repo: Arc<ProfileRepository>,
    lifecycle: Arc<LifecycleService>,
    notifications: Arc<NotificationService>,
}

impl MembershipService {
    pub fn new(
        equb_repo: Arc<EqubRepository>,
        membership_repo: Arc<MembershipRepository>,
        profile_repo: Arc<ProfileRepository>,
        lifecycle: Arc<LifecycleService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            equb_repo,
            membership_repo,
            profile_repo,
            lifecycle,
            notifications,
        }
    }

    /// Ask to join an Open equb. A previously rejected request is reset to pending.
    pub async fn request_join(&self, actor: &Profile, equb_id: Uuid) -> AppResult<Membership> {
        let equb = self
            .equb_repo
            .find_by_id(equb_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equb {} not found", equb_id)))?;

        if !equb.is_open() {
            return Err(AppError::BusinessLogic(format!(
                "Equb \"{}\" is not accepting new members",
                equb.name
            )));
        }

        if let Some(existing) = self.membership_repo.find(actor.id, equb_id).await? {
            if existing.is_approved() {
                return Err(AppError::BusinessLogic(format!(
                    "You are already a member of \"{}\"",
                    equb.name
                )));
            }
        }

        let membership = self.membership_repo.upsert_pending(actor.id, equb_id).await?;
        info!("{} requested to join equb {}", actor.id, equb_id);

        self.notifications
            .notify_first_admin(&format!(
                "{} has requested to join \"{}\".",
                actor.full_name, equb.name
            ))
            .await;

        Ok(membership)
    }

    /// All pending join requests
    pub async fn list_pending(&self, actor: &Profile) -> AppResult<Vec<PendingRequest>> {
        auth::require_admin(actor)?;
        Ok(self.membership_repo.list_pending().await?)
    }

    /// Approve or reject a request, then check whether the equb is now full
    pub async fn decide(
        &self,
        actor: &Profile,
        user_id: Uuid,
        equb_id: Uuid,
        decision: MembershipStatus,
    ) -> AppResult<Membership> {
        auth::require_admin(actor)?;
        if decision == MembershipStatus::Pending {
            return Err(AppError::Validation(
                "A decision must be approved or rejected".to_string(),
            ));
        }

        let equb = self
            .equb_repo
            .find_by_id(equb_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equb {} not found", equb_id)))?;
        let member = self
            .profile_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;
        let existing = self
            .membership_repo
            .find(user_id, equb_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No join request from {} for equb {}",
                    user_id, equb_id
                ))
            })?;

        if decision == MembershipStatus::Approved && !existing.is_approved() {
            let approved = self.membership_repo.approved_count(equb_id).await?;
            if approved >= i64::from(equb.max_members) {
                return Err(AppError::BusinessLogic(format!(
                    "Equb \"{}\" already has {} of {} members",
                    equb.name, approved, equb.max_members
                )));
            }
        }

        let membership = self
            .membership_repo
            .set_status(user_id, equb_id, decision)
            .await?;
        info!(
            "Admin {} {} {} for equb {}",
            actor.id,
            decision.as_str(),
            user_id,
            equb_id
        );

        let status = decision.as_str();
        self.notifications
            .deliver(vec![
                NewNotification::new(
                    member.id,
                    format!(
                        "Your request to join \"{}\" has been {}.",
                        equb.name, status
                    ),
                ),
                NewNotification::new(
                    actor.id,
                    format!(
                        "You have {} {}'s request for \"{}\".",
                        status, member.full_name, equb.name
                    ),
                ),
            ])
            .await;

        if let Err(e) = self.lifecycle.activate_if_full(equb_id).await {
            error!("Activation check failed for equb {}: {}", equb_id, e);
        }

        Ok(membership)
    }

    pub async fn approved_count(&self, equb_id: Uuid) -> AppResult<i64> {
        Ok(self.membership_repo.approved_count(equb_id).await?)
    }

    pub async fn is_member(&self, user_id: Uuid, equb_id: Uuid) -> AppResult<bool> {
        Ok(self.membership_repo.is_member(user_id, equb_id).await?)
    }
}
