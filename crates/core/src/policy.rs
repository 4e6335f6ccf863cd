//! Booking policy knobs and the authorization rules of each operation.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{
    errors::{BookingError, BookingResult},
    models::{Actor, Booking, BookingFilter, Role, Slot, SlotStatus},
    time_window::TimeWindow,
};

pub const DEFAULT_CANCELLATION_CUTOFF_HOURS: i64 = 24;

/// What happens to a slot whose booking gets cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotRelease {
    /// The slot goes back to `FREE` and can be booked again.
    #[default]
    Free,
    /// The slot becomes `CANCELLED` and is never offered again.
    Retire,
}

impl SlotRelease {
    pub fn slot_status(&self) -> SlotStatus {
        match self {
            SlotRelease::Free => SlotStatus::Free,
            SlotRelease::Retire => SlotStatus::Cancelled,
        }
    }
}

impl FromStr for SlotRelease {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(SlotRelease::Free),
            "retire" | "cancelled" => Ok(SlotRelease::Retire),
            other => Err(format!("unknown slot release policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPolicy {
    /// Minimum lead time before the slot start for a cancellation.
    pub cancellation_cutoff_hours: i64,
    /// Whether tutors are bound by the same cutoff as students.
    pub cutoff_applies_to_tutors: bool,
    pub release_on_cancel: SlotRelease,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            cancellation_cutoff_hours: DEFAULT_CANCELLATION_CUTOFF_HOURS,
            cutoff_applies_to_tutors: true,
            release_on_cancel: SlotRelease::Free,
        }
    }
}

impl BookingPolicy {
    pub fn cutoff(&self) -> Duration {
        Duration::hours(self.cancellation_cutoff_hours)
    }

    pub fn cutoff_applies_to(&self, role: Role) -> bool {
        match role {
            Role::Student => true,
            Role::Tutor => self.cutoff_applies_to_tutors,
            Role::Admin => false,
        }
    }

    /// Fails when fewer than the cutoff hours remain before `window` starts.
    pub fn check_cancellation_window(
        &self,
        actor: &Actor,
        window: &TimeWindow,
        now: NaiveDateTime,
    ) -> BookingResult<()> {
        if !self.cutoff_applies_to(actor.role) {
            return Ok(());
        }
        if window.start_instant() - now < self.cutoff() {
            return Err(BookingError::CancellationWindowClosed {
                cutoff_hours: self.cancellation_cutoff_hours,
            });
        }
        Ok(())
    }
}

pub fn can_publish_slot(actor: &Actor) -> bool {
    matches!(actor.role, Role::Tutor | Role::Admin)
}

pub fn can_manage_slot(actor: &Actor, slot: &Slot) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Tutor => slot.tutor_id == actor.id,
        Role::Student => false,
    }
}

pub fn can_book(actor: &Actor) -> bool {
    matches!(actor.role, Role::Student | Role::Admin)
}

pub fn can_cancel_booking(actor: &Actor, booking: &Booking, slot: &Slot) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Student => booking.student_id == actor.id,
        Role::Tutor => slot.tutor_id == actor.id,
    }
}

pub fn can_override_booking(actor: &Actor) -> bool {
    actor.is_admin()
}

pub fn can_view_booking(actor: &Actor, booking: &Booking, slot: &Slot) -> bool {
    can_cancel_booking(actor, booking, slot)
}

pub fn can_review(actor: &Actor, booking: &Booking) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Student => booking.student_id == actor.id,
        Role::Tutor => false,
    }
}

/// Narrows a booking listing to what `actor` may see.
pub fn visible_bookings(actor: &Actor, filter: BookingFilter) -> BookingFilter {
    match actor.role {
        Role::Admin => filter,
        Role::Student => BookingFilter {
            student_id: Some(actor.id),
            ..filter
        },
        Role::Tutor => BookingFilter {
            tutor_id: Some(actor.id),
            ..filter
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use uuid::Uuid;

    fn window() -> TimeWindow {
        TimeWindow::parse("2025-06-10", "10:00", "11:00").unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[rstest]
    #[case("2025-06-09 10:00", true)]
    #[case("2025-06-08 10:00", true)]
    #[case("2025-06-09 10:01", false)]
    #[case("2025-06-10 09:00", false)]
    fn student_cutoff_boundary(#[case] now: &str, #[case] allowed: bool) {
        let policy = BookingPolicy::default();
        let result = policy.check_cancellation_window(&Actor::student(Uuid::new_v4()), &window(), at(now));
        assert_eq!(result.is_ok(), allowed);
    }

    #[test]
    fn admin_is_never_bound_by_cutoff() {
        let policy = BookingPolicy::default();
        let result =
            policy.check_cancellation_window(&Actor::admin(Uuid::new_v4()), &window(), at("2025-06-10 09:59"));
        assert!(result.is_ok());
    }

    #[rstest]
    #[case(true, false)]
    #[case(false, true)]
    fn tutor_cutoff_follows_configuration(#[case] applies: bool, #[case] allowed: bool) {
        let policy = BookingPolicy {
            cutoff_applies_to_tutors: applies,
            ..BookingPolicy::default()
        };
        let result =
            policy.check_cancellation_window(&Actor::tutor(Uuid::new_v4()), &window(), at("2025-06-10 08:00"));
        assert_eq!(result.is_ok(), allowed);
    }

    #[test]
    fn closed_window_reports_configured_cutoff() {
        let policy = BookingPolicy {
            cancellation_cutoff_hours: 48,
            ..BookingPolicy::default()
        };
        let err = policy
            .check_cancellation_window(&Actor::student(Uuid::new_v4()), &window(), at("2025-06-09 10:00"))
            .unwrap_err();
        assert!(matches!(err, BookingError::CancellationWindowClosed { cutoff_hours: 48 }));
    }

    #[rstest]
    #[case("free", SlotRelease::Free)]
    #[case("RETIRE", SlotRelease::Retire)]
    #[case("cancelled", SlotRelease::Retire)]
    fn parses_release_policy(#[case] input: &str, #[case] expected: SlotRelease) {
        assert_eq!(input.parse::<SlotRelease>().unwrap(), expected);
    }

    #[test]
    fn ownership_rules() {
        let tutor = Uuid::new_v4();
        let student = Uuid::new_v4();
        let slot = Slot::new(tutor, window());
        let booking = Booking::new(slot.id, student);

        assert!(can_cancel_booking(&Actor::student(student), &booking, &slot));
        assert!(!can_cancel_booking(&Actor::student(Uuid::new_v4()), &booking, &slot));
        assert!(can_cancel_booking(&Actor::tutor(tutor), &booking, &slot));
        assert!(!can_cancel_booking(&Actor::tutor(student), &booking, &slot));
        assert!(can_cancel_booking(&Actor::admin(Uuid::new_v4()), &booking, &slot));

        assert!(can_manage_slot(&Actor::tutor(tutor), &slot));
        assert!(!can_manage_slot(&Actor::tutor(Uuid::new_v4()), &slot));
        assert!(!can_manage_slot(&Actor::student(tutor), &slot));

        assert!(can_review(&Actor::student(student), &booking));
        assert!(!can_review(&Actor::tutor(tutor), &booking));
    }

    #[test]
    fn listings_are_scoped_to_the_caller() {
        let me = Uuid::new_v4();
        let requested = BookingFilter {
            student_id: Some(Uuid::new_v4()),
            ..BookingFilter::default()
        };

        let filter = visible_bookings(&Actor::student(me), requested.clone());
        assert_eq!(filter.student_id, Some(me));

        let filter = visible_bookings(&Actor::tutor(me), requested.clone());
        assert_eq!(filter.tutor_id, Some(me));
        assert_eq!(filter.student_id, requested.student_id);

        assert_eq!(visible_bookings(&Actor::admin(me), requested.clone()), requested);
    }

    #[rstest]
    #[case(Role::Student, false, true, false)]
    #[case(Role::Tutor, true, false, false)]
    #[case(Role::Admin, true, true, true)]
    fn role_capabilities(
        #[case] role: Role,
        #[case] publish: bool,
        #[case] book: bool,
        #[case] override_status: bool,
    ) {
        let actor = Actor::new(Uuid::new_v4(), role);
        assert_eq!(can_publish_slot(&actor), publish);
        assert_eq!(can_book(&actor), book);
        assert_eq!(can_override_booking(&actor), override_status);
    }
}
