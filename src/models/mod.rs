//! Domain models for the equb backend.
//!
//! Row structs map one-to-one onto the Postgres tables; enumerated columns
//! are stored as TEXT and exposed through typed accessors.

pub mod contribution;
pub mod equb;
pub mod membership;
pub mod notification;
pub mod profile;
pub mod winner;

// Re-export all models for convenient access
pub use contribution::{Contribution, ContributionFilter, ContributionStatus};
pub use equb::{Cycle, Equb, EqubFilter, EqubInput, EqubStatus, EqubType};
pub use membership::{Membership, MembershipStatus};
pub use notification::{BroadcastTarget, NewNotification, Notification};
pub use profile::{NewProfile, Profile, ProfileChanges, Role};
pub use winner::Winner;
