pub mod activation_monitor;
pub mod advisor_service;
pub mod analytics_service;
pub mod contribution_service;
pub mod draw_service;
pub mod equb_service;
pub mod lifecycle_service;
pub mod membership_service;
pub mod notification_service;
pub mod profile_service;

pub use activation_monitor::ActivationMonitor;
pub use advisor_service::AdvisorService;
pub use analytics_service::{AnalyticsService, Dashboard};
pub use contribution_service::ContributionService;
pub use draw_service::{DrawPreview, DrawService};
pub use equb_service::{EqubDetails, EqubService};
pub use lifecycle_service::LifecycleService;
pub use membership_service::MembershipService;
pub use notification_service::NotificationService;
pub use profile_service::ProfileService;
