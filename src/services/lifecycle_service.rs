use crate::error::{AppError, AppResult};
use crate::models::EqubStatus;
use crate::repositories::{EqubRepository, MembershipRepository};
use crate::rules;
use crate::services::NotificationService;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Moves equbs from Open to Active once every seat is filled
pub struct LifecycleService {
    equb_repo: Arc<EqubRepository>,
    membership_repo: Arc<MembershipRepository>,
    notifications: Arc<NotificationService>,
}

impl LifecycleService {
    pub fn new(
        equb_repo: Arc<EqubRepository>,
        membership_repo: Arc<MembershipRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            equb_repo,
            membership_repo,
            notifications,
        }
    }

    /// Activate the equb if it is Open and full. Returns true only for the
    /// call that performed the flip.
    pub async fn activate_if_full(&self, equb_id: Uuid) -> AppResult<bool> {
        let equb = self
            .equb_repo
            .find_by_id(equb_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equb {} not found", equb_id)))?;

        let approved = self.membership_repo.approved_count(equb_id).await?;
        if !rules::should_activate(equb.status_enum(), approved, equb.max_members) {
            return Ok(false);
        }

        if !self.equb_repo.activate_if_open(equb_id).await? {
            return Ok(false);
        }

        info!(
            "Equb {} ({}) is full with {} members and is now Active",
            equb.name, equb.id, approved
        );

        self.notifications
            .notify_equb_members(
                equb.id,
                &format!(
                    "The Equb group \"{}\" is now full and has become Active!",
                    equb.name
                ),
            )
            .await;

        Ok(true)
    }

    /// Check every Open equb, returning how many were activated
    pub async fn sweep(&self) -> AppResult<usize> {
        let open = self.equb_repo.ids_by_status(EqubStatus::Open).await?;
        let mut activated = 0;

        for equb_id in open {
            match self.activate_if_full(equb_id).await {
                Ok(true) => activated += 1,
                Ok(false) => {}
                Err(e) => error!("Activation check failed for equb {}: {}", equb_id, e),
            }
        }

        Ok(activated)
    }
}
