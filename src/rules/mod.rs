//! Business rules for equbs, free of any I/O.
//!
//! Services load rows, ask these functions what should happen, and persist
//! the answer.

pub mod draw;
pub mod lifecycle;
pub mod schedule;

pub use draw::{draw_winner, eligible_members};
pub use lifecycle::{
    next_round, should_activate, status_after_round, validate_equb_input, winnable_amount,
    RuleError, RuleResult,
};
pub use schedule::{advance_due_date, initial_due_date, relative_time};
