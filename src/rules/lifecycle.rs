use crate::models::{EqubInput, EqubStatus};
use rust_decimal::Decimal;
use thiserror::Error;

/// Violations of equb business rules
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RuleError {
    #[error("Equb name cannot be empty")]
    EmptyName,

    #[error("Contribution amount must be positive")]
    NonPositiveContribution,

    #[error("Max members must be greater than 0")]
    NonPositiveMaxMembers,

    #[error("Next due date cannot be before the start date")]
    DueDateBeforeStart,
}

/// Result type for rule checks
pub type RuleResult<T> = Result<T, RuleError>;

/// An Open equb becomes Active once its approved members fill every seat.
pub fn should_activate(status: EqubStatus, approved_count: i64, max_members: i32) -> bool {
    status == EqubStatus::Open && approved_count > 0 && approved_count == i64::from(max_members)
}

/// Round number for the next draw given how many winners already exist
pub fn next_round(past_winner_count: i64) -> i32 {
    i32::try_from(past_winner_count).unwrap_or(i32::MAX - 1) + 1
}

/// Status an equb moves to once `round` has been confirmed.
pub fn status_after_round(round: i32, max_members: i32) -> EqubStatus {
    if round >= max_members {
        EqubStatus::Completed
    } else {
        EqubStatus::Active
    }
}

/// Pot paid out each round
pub fn winnable_amount(contribution_amount: Decimal, max_members: i32) -> Decimal {
    contribution_amount * Decimal::from(max_members)
}

/// Check the fields an admin supplies when creating or editing an equb
pub fn validate_equb_input(input: &EqubInput) -> RuleResult<()> {
    if input.name.trim().is_empty() {
        return Err(RuleError::EmptyName);
    }
    if input.contribution_amount <= Decimal::ZERO {
        return Err(RuleError::NonPositiveContribution);
    }
    if input.max_members <= 0 {
        return Err(RuleError::NonPositiveMaxMembers);
    }
    if let Some(due) = input.next_due_date {
        if due < input.start_date {
            return Err(RuleError::DueDateBeforeStart);
        }
    }
    Ok(())
}
