use crate::error::AppResult;
use crate::models::{EqubStatus, EqubType, Role};
use crate::repositories::{ContributionRepository, EqubRepository, ProfileRepository};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Aggregates shown on the admin dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub total_equbs: i64,
    pub total_members: i64,
    pub active_cycles: i64,
    pub total_contributions: Decimal,
    pub equbs_by_status: Vec<(EqubStatus, i64)>,
    pub contributions_by_type: Vec<(EqubType, Decimal)>,
}

pub struct AnalyticsService {
    equb_repo: Arc<EqubRepository>,
    profile_repo: Arc<ProfileRepository>,
    contribution_repo: Arc<ContributionRepository>,
}

impl AnalyticsService {
    pub fn new(
        equb_repo: Arc<EqubRepository>,
        profile_repo: Arc<ProfileRepository>,
        contribution_repo: Arc<ContributionRepository>,
    ) -> Self {
        Self {
            equb_repo,
            profile_repo,
            contribution_repo,
        }
    }

    pub async fn dashboard(&self) -> AppResult<Dashboard> {
        let (status_counts, total_members, total_contributions, paid_by_type) = futures::try_join!(
            self.equb_repo.count_by_status(),
            self.profile_repo.count_by_role(Role::Member),
            self.contribution_repo.total_paid(),
            self.contribution_repo.paid_by_equb_type(),
        )?;

        Ok(build_dashboard(
            &status_counts,
            total_members,
            total_contributions,
            &paid_by_type,
        ))
    }
}

/// Fill every status and type, with zero where the database had no rows
fn build_dashboard(
    status_counts: &[(String, i64)],
    total_members: i64,
    total_contributions: Decimal,
    paid_by_type: &[(String, Decimal)],
) -> Dashboard {
    let equbs_by_status: Vec<(EqubStatus, i64)> = EqubStatus::ALL
        .iter()
        .map(|status| {
            let count: i64 = status_counts
                .iter()
                .filter(|(s, _)| s.parse::<EqubStatus>().ok() == Some(*status))
                .map(|(_, c)| *c)
                .sum();
            (*status, count)
        })
        .collect();

    let contributions_by_type: Vec<(EqubType, Decimal)> = EqubType::ALL
        .iter()
        .map(|equb_type| {
            let total: Decimal = paid_by_type
                .iter()
                .filter(|(t, _)| t.parse::<EqubType>().ok() == Some(*equb_type))
                .map(|(_, amount)| *amount)
                .sum();
            (*equb_type, total)
        })
        .collect();

    let total_equbs: i64 = equbs_by_status.iter().map(|(_, c)| *c).sum();
    let active_cycles = equbs_by_status
        .iter()
        .find(|(s, _)| *s == EqubStatus::Active)
        .map(|(_, c)| *c)
        .unwrap_or(0);

    Dashboard {
        total_equbs,
        total_members,
        active_cycles,
        total_contributions,
        equbs_by_status,
        contributions_by_type,
    }
}
