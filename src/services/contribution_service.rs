use crate::auth;
use crate::error::{AppError, AppResult};
use crate::models::{
    Contribution, ContributionFilter, ContributionStatus, Equb, NewNotification, Profile,
};
use crate::repositories::{
    ContributionEntry, ContributionRepository, EqubRepository, MembershipRepository,
};
use crate::services::NotificationService;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Service for member payments and their verification
pub struct ContributionService {
    contribution_repo: Arc<ContributionRepository>,
    equb_repo: Arc<EqubRepository>,
    membership_repo: Arc<MembershipRepository>,
    notifications: Arc<NotificationService>,
    currency: String,
}

impl ContributionService {
    pub fn new(
        contribution_repo: Arc<ContributionRepository>,
        equb_repo: Arc<EqubRepository>,
        membership_repo: Arc<MembershipRepository>,
        notifications: Arc<NotificationService>,
        currency: String,
    ) -> Self {
        Self {
            contribution_repo,
            equb_repo,
            membership_repo,
            notifications,
            currency,
        }
    }

    /// Submit this cycle's payment for admin verification
    pub async fn submit(&self, actor: &Profile, equb_id: Uuid) -> AppResult<Contribution> {
        let equb = self.find_equb(equb_id).await?;
        if !self.membership_repo.is_member(actor.id, equb_id).await? {
            return Err(AppError::Forbidden(format!(
                "Only approved members of \"{}\" can contribute",
                equb.name
            )));
        }

        let contribution = self
            .contribution_repo
            .create_pending(equb_id, actor.id, equb.contribution_amount)
            .await?;
        info!(
            "{} submitted contribution {} of {} for equb {}",
            actor.id, contribution.id, contribution.amount, equb_id
        );

        self.notifications
            .notify_first_admin(&format!(
                "New contribution of {} from {} for \"{}\".",
                self.money(contribution.amount),
                actor.full_name,
                equb.name
            ))
            .await;
        self.notifications
            .deliver(vec![NewNotification::new(
                actor.id,
                format!(
                    "Your contribution for \"{}\" has been submitted for admin verification.",
                    equb.name
                ),
            )])
            .await;

        Ok(contribution)
    }

    /// Confirm a payment and tell the member
    pub async fn mark_paid(&self, actor: &Profile, contribution_id: Uuid) -> AppResult<Contribution> {
        auth::require_admin(actor)?;
        let contribution = self
            .set_status(contribution_id, ContributionStatus::Paid)
            .await?;
        let equb = self.find_equb(contribution.equb_id).await?;

        self.notifications
            .deliver(vec![NewNotification::new(
                contribution.user_id,
                format!(
                    "Your payment of {} for \"{}\" has been confirmed.",
                    self.money(contribution.amount),
                    equb.name
                ),
            )])
            .await;

        Ok(contribution)
    }

    pub async fn mark_late(&self, actor: &Profile, contribution_id: Uuid) -> AppResult<Contribution> {
        auth::require_admin(actor)?;
        self.set_status(contribution_id, ContributionStatus::Late)
            .await
    }

    /// Every contribution with member and equb names, newest first
    pub async fn list(&self, actor: &Profile, filter: &ContributionFilter) -> AppResult<Vec<ContributionEntry>> {
        auth::require_admin(actor)?;
        Ok(self.contribution_repo.list(filter).await?)
    }

    /// The caller's own history in one equb
    pub async fn list_for_member(
        &self,
        actor: &Profile,
        equb_id: Uuid,
        status: Option<ContributionStatus>,
    ) -> AppResult<Vec<Contribution>> {
        Ok(self
            .contribution_repo
            .list_for_member(actor.id, equb_id, status)
            .await?)
    }

    async fn set_status(&self, id: Uuid, status: ContributionStatus) -> AppResult<Contribution> {
        let contribution = self.contribution_repo.set_status(id, status).await?;
        info!("Contribution {} marked {}", id, status.as_str());
        Ok(contribution)
    }

    async fn find_equb(&self, equb_id: Uuid) -> AppResult<Equb> {
        self.equb_repo
            .find_by_id(equb_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equb {} not found", equb_id)))
    }

    fn money(&self, amount: Decimal) -> String {
        format_money(amount, &self.currency)
    }
}

/// Amount without trailing zeros followed by the currency code
pub fn format_money(amount: Decimal, currency: &str) -> String {
    format!("{} {}", amount.normalize(), currency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Decimal::new(100000, 2), "ETB"), "1000 ETB");
        assert_eq!(format_money(Decimal::new(1250, 2), "ETB"), "12.5 ETB");
    }
}
