pub mod contribution_repository;
pub mod equb_repository;
pub mod membership_repository;
pub mod notification_repository;
pub mod profile_repository;
pub mod winner_repository;

// Re-export all repositories for convenient access
pub use contribution_repository::{ContributionEntry, ContributionRepository};
pub use equb_repository::{EqubRecord, EqubRepository};
pub use membership_repository::{MemberJoin, MembershipRepository, PendingRequest};
pub use notification_repository::NotificationRepository;
pub use profile_repository::ProfileRepository;
pub use winner_repository::{RoundOutcome, WinnerRepository};

/// `ILIKE` pattern matching `search` as a literal substring
///
/// Blank searches yield `None`. Use with `ESCAPE '\'`.
pub(crate) fn contains_pattern(search: Option<&str>) -> Option<String> {
    let search = search.map(str::trim).filter(|s| !s.is_empty())?;
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern(Some(" abe ")).as_deref(), Some("%abe%"));
        assert_eq!(contains_pattern(Some("_")).as_deref(), Some("%\\_%"));
        assert_eq!(contains_pattern(Some("50%")).as_deref(), Some("%50\\%%"));
        assert_eq!(contains_pattern(Some("a\\b")).as_deref(), Some("%a\\\\b%"));
        assert_eq!(contains_pattern(Some("   ")), None);
        assert_eq!(contains_pattern(None), None);
    }
}
