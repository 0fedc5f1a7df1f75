use crate::auth;
use crate::error::{AppError, AppResult};
use crate::models::{NewProfile, Profile, ProfileChanges, Role};
use crate::repositories::ProfileRepository;
use crate::services::NotificationService;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const CSV_HEADER: &str = "ID,Full Name,Email,Phone,Location,Role,Wallet Balance,Is Active,Updated At";

/// Service for member profiles
pub struct ProfileService {
    profile_repo: Arc<ProfileRepository>,
    notifications: Arc<NotificationService>,
}

impl ProfileService {
    pub fn new(profile_repo: Arc<ProfileRepository>, notifications: Arc<NotificationService>) -> Self {
        Self {
            profile_repo,
            notifications,
        }
    }

    /// Register a new member and tell the admins about it
    pub async fn register(&self, new_profile: NewProfile) -> AppResult<Profile> {
        if new_profile.full_name.trim().is_empty() {
            return Err(AppError::Validation("Full name cannot be empty".to_string()));
        }

        let profile = self.profile_repo.create(&new_profile, Role::Member).await?;
        info!("Registered member {} ({})", profile.full_name, profile.id);

        self.notifications
            .notify_admins(&format!(
                "{} has just registered as a new member.",
                profile.full_name
            ))
            .await;

        Ok(profile)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Profile> {
        self.profile_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", id)))
    }

    /// Resolve the caller of a request to an active profile
    pub async fn authenticate(&self, id: Uuid) -> AppResult<Profile> {
        let profile = self
            .profile_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(format!("Unknown user {}", id)))?;
        auth::require_active(&profile)?;
        Ok(profile)
    }

    pub async fn list(&self, actor: &Profile) -> AppResult<Vec<Profile>> {
        auth::require_admin(actor)?;
        Ok(self.profile_repo.list_all().await?)
    }

    /// Members whose name or email contains `search` (case-insensitive)
    pub async fn list_members(&self, actor: &Profile, search: Option<&str>) -> AppResult<Vec<Profile>> {
        auth::require_admin(actor)?;
        Ok(self.profile_repo.search_members(search).await?)
    }

    /// Admin edit of a member's contact details
    pub async fn update(&self, actor: &Profile, id: Uuid, changes: ProfileChanges) -> AppResult<Profile> {
        auth::require_admin(actor)?;
        if let Some(name) = &changes.full_name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("Full name cannot be empty".to_string()));
            }
        }

        let profile = self.profile_repo.update(id, &changes).await?;
        info!("Admin {} updated profile {}", actor.id, id);
        Ok(profile)
    }

    /// Activate or deactivate a member account
    pub async fn set_active(&self, actor: &Profile, id: Uuid, is_active: bool) -> AppResult<Profile> {
        auth::require_admin(actor)?;
        if actor.id == id && !is_active {
            return Err(AppError::BusinessLogic(
                "Administrators cannot deactivate their own account".to_string(),
            ));
        }

        let profile = self.profile_repo.set_active(id, is_active).await?;
        info!(
            "Admin {} set profile {} active={}",
            actor.id, id, is_active
        );
        Ok(profile)
    }

    /// CSV export of the (optionally filtered) member list
    pub async fn export_members_csv(&self, actor: &Profile, search: Option<&str>) -> AppResult<String> {
        let members = self.list_members(actor, search).await?;
        if members.is_empty() {
            return Err(AppError::Validation("No members to export".to_string()));
        }
        info!("Exporting {} members to CSV", members.len());
        Ok(members_csv(&members))
    }
}

/// Render profiles as CSV. Text fields are quoted with embedded quotes doubled.
pub fn members_csv(members: &[Profile]) -> String {
    let mut rows = Vec::with_capacity(members.len() + 1);
    rows.push(CSV_HEADER.to_string());

    for member in members {
        let values = [
            quote(&member.id.to_string()),
            quote(&member.full_name),
            quote(member.email.as_deref().unwrap_or("")),
            quote(&member.phone),
            quote(&member.location),
            quote(&member.role),
            member.wallet_balance.to_string(),
            if member.is_active { "True" } else { "False" }.to_string(),
            member.updated_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        ];
        rows.push(values.join(","));
    }

    rows.join("\n")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
