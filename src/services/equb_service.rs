use crate::auth;
use crate::error::{AppError, AppResult};
use crate::models::{Equb, EqubFilter, EqubInput, EqubStatus, Profile, Winner};
use crate::repositories::{
    EqubRecord, EqubRepository, MembershipRepository, ProfileRepository, WinnerRepository,
};
use crate::rules;
use crate::services::{LifecycleService, NotificationService};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Equb together with its approved members and winner history
#[derive(Debug, Clone)]
pub struct EqubDetails {
    pub equb: Equb,
    pub members: Vec<(Profile, NaiveDateTime)>,
    pub winners: Vec<Winner>,
}

/// Service for creating, editing and browsing equbs
pub struct EqubService {
    equb_repo: Arc<EqubRepository>,
    membership_repo: Arc<MembershipRepository>,
    profile_repo: Arc<ProfileRepository>,
    winner_repo: Arc<WinnerRepository>,
    lifecycle: Arc<LifecycleService>,
    notifications: Arc<NotificationService>,
}

impl EqubService {
    pub fn new(
        equb_repo: Arc<EqubRepository>,
        membership_repo: Arc<MembershipRepository>,
        profile_repo: Arc<ProfileRepository>,
        winner_repo: Arc<WinnerRepository>,
        lifecycle: Arc<LifecycleService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            equb_repo,
            membership_repo,
            profile_repo,
            winner_repo,
            lifecycle,
            notifications,
        }
    }

    /// Create a new equb
    pub async fn create(&self, actor: &Profile, input: EqubInput) -> AppResult<Equb> {
        auth::require_admin(actor)?;
        let record = build_record(&input, EqubStatus::Open)?;

        let equb = self.equb_repo.create(actor.id, &record).await?;
        info!(
            "Created equb {} ({}) with {} seats",
            equb.name, equb.id, equb.max_members
        );
        Ok(equb)
    }

    /// Edit an equb and tell its members
    ///
    /// Seats cannot drop below the approved members or the rounds already
    /// paid out. A resize that fills the equb activates it.
    pub async fn update(&self, actor: &Profile, id: Uuid, input: EqubInput) -> AppResult<Equb> {
        auth::require_admin(actor)?;
        let existing = self.get(id).await?;
        let record = build_record(&input, existing.status_enum())?;

        let approved = self.membership_repo.approved_count(id).await?;
        if i64::from(record.max_members) < approved {
            return Err(AppError::BusinessLogic(format!(
                "\"{}\" already has {} approved members; max members cannot be {}",
                existing.name, approved, record.max_members
            )));
        }
        let rounds = self.winner_repo.winner_ids(id).await?.len();
        if (record.max_members as usize) < rounds {
            return Err(AppError::BusinessLogic(format!(
                "\"{}\" has already paid out {} rounds; max members cannot be {}",
                existing.name, rounds, record.max_members
            )));
        }

        let equb = self.equb_repo.update(id, &record).await?;
        info!("Updated equb {} ({})", equb.name, equb.id);

        self.notifications
            .notify_equb_members(
                equb.id,
                &format!("The details for \"{}\" have been updated.", existing.name),
            )
            .await;

        match self.lifecycle.activate_if_full(equb.id).await {
            Ok(true) => self.get(equb.id).await,
            Ok(false) => Ok(equb),
            Err(e) => {
                error!("Activation check failed for equb {}: {}", equb.id, e);
                Ok(equb)
            }
        }
    }

    /// Delete an equb with its memberships, contributions and winners
    pub async fn delete(&self, actor: &Profile, id: Uuid) -> AppResult<()> {
        auth::require_admin(actor)?;
        if !self.equb_repo.delete(id).await? {
            return Err(AppError::NotFound(format!("Equb {} not found", id)));
        }
        info!("Admin {} deleted equb {}", actor.id, id);
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Equb> {
        self.equb_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equb {} not found", id)))
    }

    pub async fn list(&self, filter: &EqubFilter) -> AppResult<Vec<Equb>> {
        Ok(self.equb_repo.list(filter).await?)
    }

    pub async fn approved_count(&self, id: Uuid) -> AppResult<i64> {
        Ok(self.membership_repo.approved_count(id).await?)
    }

    /// Equb with approved members (and their join dates) and winners by round
    pub async fn details(&self, id: Uuid) -> AppResult<EqubDetails> {
        let equb = self.get(id).await?;
        let joins = self.membership_repo.approved_members(id).await?;
        let ids: Vec<Uuid> = joins.iter().map(|m| m.user_id).collect();
        let profiles = self.profile_repo.find_by_ids(&ids).await?;

        let members = joins
            .into_iter()
            .filter_map(|join| {
                profiles
                    .iter()
                    .find(|p| p.id == join.user_id)
                    .map(|p| (p.clone(), join.join_date))
            })
            .collect();

        let winners = self.winner_repo.list_for_equb(id).await?;

        Ok(EqubDetails {
            equb,
            members,
            winners,
        })
    }

    /// Equbs the user is an approved member of
    pub async fn list_for_member(&self, user_id: Uuid) -> AppResult<Vec<Equb>> {
        Ok(self.equb_repo.list_for_member(user_id).await?)
    }
}

/// Validate admin input and derive the stored columns
fn build_record(input: &EqubInput, default_status: EqubStatus) -> AppResult<EqubRecord> {
    rules::validate_equb_input(input)?;

    Ok(EqubRecord {
        name: input.name.trim().to_string(),
        equb_type: input.equb_type,
        contribution_amount: input.contribution_amount,
        cycle: input.cycle,
        max_members: input.max_members,
        status: input.status.unwrap_or(default_status),
        start_date: input.start_date,
        next_due_date: rules::initial_due_date(input.start_date, input.cycle, input.next_due_date),
        winnable_amount: rules::winnable_amount(input.contribution_amount, input.max_members),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cycle, EqubType};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn input() -> EqubInput {
        EqubInput {
            name: "  Merkato Merchants ".to_string(),
            equb_type: EqubType::Merchants,
            contribution_amount: Decimal::new(500, 0),
            cycle: Cycle::Weekly,
            max_members: 12,
            status: None,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            next_due_date: None,
        }
    }

    #[test]
    fn test_build_record_derives_columns() {
        let record = build_record(&input(), EqubStatus::Open).unwrap();
        assert_eq!(record.name, "Merkato Merchants");
        assert_eq!(record.status, EqubStatus::Open);
        assert_eq!(record.winnable_amount, Decimal::new(6000, 0));
        assert_eq!(record.next_due_date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
    }

    #[test]
    fn test_build_record_keeps_explicit_status_and_due_date() {
        let mut input = input();
        input.status = Some(EqubStatus::Active);
        input.next_due_date = NaiveDate::from_ymd_opt(2024, 1, 3);

        let record = build_record(&input, EqubStatus::Open).unwrap();
        assert_eq!(record.status, EqubStatus::Active);
        assert_eq!(record.next_due_date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn test_build_record_rejects_invalid_input() {
        let mut input = input();
        input.max_members = 0;
        assert!(matches!(
            build_record(&input, EqubStatus::Open),
            Err(AppError::Validation(_))
        ));
    }
}
