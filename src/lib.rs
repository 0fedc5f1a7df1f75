//! Equb Backend Library
//!
//! This module exposes the backend components for use by tests and other consumers.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod grpc_service;
pub mod models;
pub mod repositories;
pub mod rules;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use database::Database;
use repositories::*;
use services::*;
use std::sync::Arc;

/// Application state containing all repositories and services
pub struct AppState {
    pub database: Database,
    pub profile_repo: Arc<ProfileRepository>,
    pub equb_repo: Arc<EqubRepository>,
    pub membership_repo: Arc<MembershipRepository>,
    pub contribution_repo: Arc<ContributionRepository>,
    pub winner_repo: Arc<WinnerRepository>,
    pub notification_repo: Arc<NotificationRepository>,
    pub notifications: Arc<NotificationService>,
    pub profiles: Arc<ProfileService>,
    pub equbs: Arc<EqubService>,
    pub lifecycle: Arc<LifecycleService>,
    pub memberships: Arc<MembershipService>,
    pub contributions: Arc<ContributionService>,
    pub draws: Arc<DrawService>,
    pub analytics: Arc<AnalyticsService>,
    pub advisor: Arc<AdvisorService>,
}

impl AppState {
    /// Create a new AppState with initialized repositories and services
    pub fn new(pool: sqlx::PgPool, config: &AppConfig) -> Self {
        let database = Database::new(pool.clone());

        let profile_repo = Arc::new(ProfileRepository::new(pool.clone()));
        let equb_repo = Arc::new(EqubRepository::new(pool.clone()));
        let membership_repo = Arc::new(MembershipRepository::new(pool.clone()));
        let contribution_repo = Arc::new(ContributionRepository::new(pool.clone()));
        let winner_repo = Arc::new(WinnerRepository::new(pool.clone()));
        let notification_repo = Arc::new(NotificationRepository::new(pool));

        let notifications = Arc::new(NotificationService::new(
            notification_repo.clone(),
            profile_repo.clone(),
            membership_repo.clone(),
        ));
        let profiles = Arc::new(ProfileService::new(
            profile_repo.clone(),
            notifications.clone(),
        ));
        let lifecycle = Arc::new(LifecycleService::new(
            equb_repo.clone(),
            membership_repo.clone(),
            notifications.clone(),
        ));
        let equbs = Arc::new(EqubService::new(
            equb_repo.clone(),
            membership_repo.clone(),
            profile_repo.clone(),
            winner_repo.clone(),
            lifecycle.clone(),
            notifications.clone(),
        ));
        let memberships = Arc::new(MembershipService::new(
            equb_repo.clone(),
            membership_repo.clone(),
            profile_repo.clone(),
            lifecycle.clone(),
            notifications.clone(),
        ));
        let contributions = Arc::new(ContributionService::new(
            contribution_repo.clone(),
            equb_repo.clone(),
            membership_repo.clone(),
            notifications.clone(),
            config.currency.clone(),
        ));
        let draws = Arc::new(DrawService::new(
            equb_repo.clone(),
            membership_repo.clone(),
            profile_repo.clone(),
            winner_repo.clone(),
            notifications.clone(),
        ));
        let analytics = Arc::new(AnalyticsService::new(
            equb_repo.clone(),
            profile_repo.clone(),
            contribution_repo.clone(),
        ));
        let advisor = Arc::new(AdvisorService::new(config.advisor.clone()));

        Self {
            database,
            profile_repo,
            equb_repo,
            membership_repo,
            contribution_repo,
            winner_repo,
            notification_repo,
            notifications,
            profiles,
            equbs,
            lifecycle,
            memberships,
            contributions,
            draws,
            analytics,
            advisor,
        }
    }
}
