use crate::models::Cycle;
use chrono::{Days, Months, NaiveDate, NaiveDateTime};

/// Move a due date forward by one cycle.
///
/// Monthly steps keep the day of month and clamp to the last day when the
/// target month is shorter (Jan 31 -> Feb 29 in a leap year).
pub fn advance_due_date(date: NaiveDate, cycle: Cycle) -> NaiveDate {
    let next = match cycle {
        Cycle::Daily => date.checked_add_days(Days::new(1)),
        Cycle::Weekly => date.checked_add_days(Days::new(7)),
        Cycle::Monthly => date.checked_add_months(Months::new(1)),
    };
    next.unwrap_or(NaiveDate::MAX)
}

/// First due date of a new equb: the explicit one, else one cycle after start.
pub fn initial_due_date(start: NaiveDate, cycle: Cycle, explicit: Option<NaiveDate>) -> NaiveDate {
    explicit.unwrap_or_else(|| advance_due_date(start, cycle))
}

/// Short "how long ago" label shown next to notifications.
pub fn relative_time(created_at: NaiveDateTime, now: NaiveDateTime) -> String {
    let seconds = (now - created_at).num_milliseconds().max(0) as f64 / 1000.0;
    let seconds = seconds.round();
    if seconds < 60.0 {
        return format!("{}s ago", seconds as i64);
    }
    let minutes = (seconds / 60.0).round();
    if minutes < 60.0 {
        return format!("{}m ago", minutes as i64);
    }
    let hours = (minutes / 60.0).round();
    if hours < 24.0 {
        return format!("{}h ago", hours as i64);
    }
    let days = (hours / 24.0).round();
    format!("{}d ago", days as i64)
}
