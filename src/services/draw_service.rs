use crate::auth;
use crate::error::{AppError, AppResult};
use crate::models::{Equb, Profile};
use crate::repositories::{
    EqubRepository, MembershipRepository, ProfileRepository, RoundOutcome, WinnerRepository,
};
use crate::rules;
use crate::services::NotificationService;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const NO_ELIGIBLE_MEMBERS: &str =
    "All eligible members have already won, or there are no approved members for this Equb.";

/// Candidate picked by a draw, not yet persisted
#[derive(Debug, Clone)]
pub struct DrawPreview {
    pub equb_id: Uuid,
    pub candidate: Profile,
    pub eligible_count: usize,
}

/// Service for picking and confirming round winners
pub struct DrawService {
    equb_repo: Arc<EqubRepository>,
    membership_repo: Arc<MembershipRepository>,
    profile_repo: Arc<ProfileRepository>,
    winner_repo: Arc<WinnerRepository>,
    notifications: Arc<NotificationService>,
}

impl DrawService {
    pub fn new(
        equb_repo: Arc<EqubRepository>,
        membership_repo: Arc<MembershipRepository>,
        profile_repo: Arc<ProfileRepository>,
        winner_repo: Arc<WinnerRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            equb_repo,
            membership_repo,
            profile_repo,
            winner_repo,
            notifications,
        }
    }

    /// Approved members of the equb that have not won yet
    pub async fn eligible(&self, equb_id: Uuid) -> AppResult<Vec<Profile>> {
        self.find_equb(equb_id).await?;
        let approved = self.membership_repo.approved_member_ids(equb_id).await?;
        let past_winners = self.winner_repo.winner_ids(equb_id).await?;

        let eligible = rules::eligible_members(&approved, &past_winners);
        if eligible.is_empty() {
            return Err(AppError::BusinessLogic(NO_ELIGIBLE_MEMBERS.to_string()));
        }

        Ok(self.profile_repo.find_by_ids(&eligible).await?)
    }

    /// Pick a candidate uniformly at random without recording it
    pub async fn draw(&self, actor: &Profile, equb_id: Uuid) -> AppResult<DrawPreview> {
        let mut rng = rand::rngs::StdRng::from_entropy();
        self.draw_with(actor, equb_id, &mut rng).await
    }

    /// `draw` with a caller-supplied random source
    pub async fn draw_with<R: Rng + Send>(
        &self,
        actor: &Profile,
        equb_id: Uuid,
        rng: &mut R,
    ) -> AppResult<DrawPreview> {
        auth::require_admin(actor)?;
        let equb = self.find_equb(equb_id).await?;
        require_active(&equb)?;

        let eligible = self.eligible(equb_id).await?;
        let ids: Vec<Uuid> = eligible.iter().map(|p| p.id).collect();
        let picked = rules::draw_winner(&ids, rng)
            .ok_or_else(|| AppError::BusinessLogic(NO_ELIGIBLE_MEMBERS.to_string()))?;

        let eligible_count = eligible.len();
        let candidate = eligible
            .into_iter()
            .find(|p| p.id == picked)
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", picked)))?;

        info!(
            "Drew candidate {} for equb {} from {} eligible members",
            candidate.id, equb_id, eligible_count
        );

        Ok(DrawPreview {
            equb_id,
            candidate,
            eligible_count,
        })
    }

    /// Record the winner of the next round and announce it
    pub async fn confirm(&self, actor: &Profile, equb_id: Uuid, user_id: Uuid) -> AppResult<RoundOutcome> {
        auth::require_admin(actor)?;
        let winner = self
            .profile_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

        let outcome = self.winner_repo.record_round(equb_id, user_id).await?;
        info!(
            "{} won round {} of equb {}; equb is now {}",
            user_id, outcome.winner.round, equb_id, outcome.equb.status
        );

        self.notifications
            .notify_equb_members(
                equb_id,
                &format!(
                    "{} has won round {} of \"{}\"!",
                    winner.full_name, outcome.winner.round, outcome.equb.name
                ),
            )
            .await;

        Ok(outcome)
    }

    /// Draw and immediately confirm
    pub async fn draw_and_confirm(&self, actor: &Profile, equb_id: Uuid) -> AppResult<RoundOutcome> {
        let preview = self.draw(actor, equb_id).await?;
        self.confirm(actor, equb_id, preview.candidate.id).await
    }

    async fn find_equb(&self, equb_id: Uuid) -> AppResult<Equb> {
        self.equb_repo
            .find_by_id(equb_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equb {} not found", equb_id)))
    }
}

fn require_active(equb: &Equb) -> AppResult<()> {
    if !equb.is_active() {
        return Err(AppError::BusinessLogic(format!(
            "Equb \"{}\" is {}, winners can only be drawn while Active",
            equb.name, equb.status
        )));
    }
    Ok(())
}
