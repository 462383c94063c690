//! # Pet Visit Reservations
//!
//! Visits are booked in one-hour slots during opening hours. A slot is the
//! scheduled time truncated to the hour; two active reservations for the
//! same pet may not share a slot.
//!
//! ```text
//! PENDING ──► CONFIRMED ──► COMPLETED
//!    │            │
//!    └────────────┴──► CANCELLED
//! ```

use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TransitionError, ValidationError};

/// First bookable hour (UTC).
pub const OPENING_HOUR: u32 = 10;

/// Closing hour (UTC). The last slot starts one hour earlier.
pub const CLOSING_HOUR: u32 = 18;

/// How far ahead a visit may be booked.
pub const MAX_ADVANCE_DAYS: i64 = 60;

/// Largest party allowed at one visit.
pub const MAX_PARTY_SIZE: u32 = 6;

/// Reservation lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Requested by the visitor, not yet confirmed by staff.
    Pending,
    /// Confirmed by staff.
    Confirmed,
    /// The visit took place.
    Completed,
    /// Cancelled by the visitor or staff.
    Cancelled,
}

impl ReservationStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether this reservation still holds its slot.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Validate and return the next state.
    pub fn transition(self, to: ReservationStatus) -> Result<ReservationStatus, TransitionError> {
        use ReservationStatus::*;
        let allowed = matches!(
            (self, to),
            (Pending, Confirmed) | (Confirmed, Completed) | (Pending, Cancelled) | (Confirmed, Cancelled)
        );
        if allowed {
            Ok(to)
        } else {
            Err(TransitionError {
                from: self.as_str(),
                to: to.as_str(),
            })
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one-hour slot containing `at`.
pub fn slot_of(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::hours(1)).unwrap_or(at)
}

/// Check a requested visit time against `now` and opening hours.
///
/// Returns the slot start on success.
pub fn validate_visit(
    scheduled_for: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ValidationError> {
    let slot = slot_of(scheduled_for);
    if slot <= now {
        return Err(ValidationError::InvalidSchedule(
            "visit must be scheduled in the future".to_string(),
        ));
    }
    if slot > now + Duration::days(MAX_ADVANCE_DAYS) {
        return Err(ValidationError::InvalidSchedule(format!(
            "visit cannot be booked more than {MAX_ADVANCE_DAYS} days ahead"
        )));
    }
    let hour = slot.hour();
    if !(OPENING_HOUR..CLOSING_HOUR).contains(&hour) {
        return Err(ValidationError::InvalidSchedule(format!(
            "visits run from {OPENING_HOUR:02}:00 to {CLOSING_HOUR:02}:00 UTC"
        )));
    }
    Ok(slot)
}

/// Check the number of visitors.
pub fn validate_party_size(party_size: u32) -> Result<(), ValidationError> {
    if party_size == 0 || party_size > MAX_PARTY_SIZE {
        return Err(ValidationError::OutOfRange {
            field: "party_size",
            min: 1,
            max: i64::from(MAX_PARTY_SIZE),
            actual: i64::from(party_size),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap()
    }

    #[test]
    fn slot_truncates_to_hour() {
        let at = Utc.with_ymd_and_hms(2026, 5, 5, 14, 47, 12).unwrap();
        assert_eq!(slot_of(at), Utc.with_ymd_and_hms(2026, 5, 5, 14, 0, 0).unwrap());
    }

    #[test]
    fn accepts_visit_in_opening_hours() {
        let at = Utc.with_ymd_and_hms(2026, 5, 5, 17, 15, 0).unwrap();
        let slot = validate_visit(at, now()).unwrap();
        assert_eq!(slot.hour(), 17);
    }

    #[test]
    fn rejects_past_and_same_slot() {
        let past = Utc.with_ymd_and_hms(2026, 5, 3, 12, 0, 0).unwrap();
        assert!(validate_visit(past, now()).is_err());
        // 09:45 truncates to 09:00, which is before now (09:30).
        let same = Utc.with_ymd_and_hms(2026, 5, 4, 9, 45, 0).unwrap();
        assert!(validate_visit(same, now()).is_err());
    }

    #[test]
    fn rejects_outside_hours_and_far_future() {
        let early = Utc.with_ymd_and_hms(2026, 5, 5, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 5, 5, 18, 0, 0).unwrap();
        let far = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        assert!(validate_visit(early, now()).is_err());
        assert!(validate_visit(late, now()).is_err());
        assert!(validate_visit(far, now()).is_err());
    }

    #[test]
    fn party_size_bounds() {
        assert!(validate_party_size(1).is_ok());
        assert!(validate_party_size(MAX_PARTY_SIZE).is_ok());
        assert!(validate_party_size(0).is_err());
        assert!(validate_party_size(MAX_PARTY_SIZE + 1).is_err());
    }

    #[test]
    fn transitions() {
        use ReservationStatus::*;
        assert_eq!(Pending.transition(Confirmed).unwrap(), Confirmed);
        assert_eq!(Confirmed.transition(Completed).unwrap(), Completed);
        assert!(Pending.transition(Completed).is_err());
        assert!(Completed.transition(Cancelled).is_err());
        assert!(Cancelled.transition(Pending).is_err());
        assert!(Confirmed.is_active());
        assert!(!Cancelled.is_active());
    }
}
