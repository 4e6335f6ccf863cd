use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    errors::{BookingError, BookingResult, StoreError},
    models::{
        Actor, Booking, BookingDetails, BookingFilter, BookingStatus, Slot, StudentSummary,
    },
    policy::{self, BookingPolicy},
    store::{BookingStorage, UnitOfWork},
};

/// Owns booking records: claiming, cancellation rules and status lookups.
#[derive(Clone)]
pub struct BookingStore {
    storage: Arc<dyn BookingStorage>,
    clock: Arc<dyn Clock>,
    policy: BookingPolicy,
}

impl BookingStore {
    pub fn new(storage: Arc<dyn BookingStorage>, clock: Arc<dyn Clock>, policy: BookingPolicy) -> Self {
        Self {
            storage,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> BookingResult<Booking> {
        self.storage
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    pub async fn status_of(&self, booking_id: Uuid) -> BookingResult<BookingStatus> {
        Ok(self.get_booking(booking_id).await?.status)
    }

    pub async fn list(&self, filter: &BookingFilter) -> BookingResult<Vec<BookingDetails>> {
        Ok(self.storage.list_bookings(filter).await?)
    }

    /// Claims `slot` for `student_id` inside a unit of work that already holds the slot lock.
    ///
    /// The slot keeps a single booking row for its whole life: a cancelled
    /// row is reactivated for the new student instead of inserting another.
    /// A unique violation on insert is reported as `SlotAlreadyBooked`, not
    /// `SlotNotClaimable`: the row that won holds an active claim.
    pub(crate) async fn claim(
        &self,
        tx: &mut dyn UnitOfWork,
        slot: &Slot,
        student_id: Uuid,
    ) -> BookingResult<Booking> {
        match tx.lock_booking_for_slot(slot.id).await? {
            Some(existing) if existing.status == BookingStatus::Active => {
                Err(BookingError::SlotAlreadyBooked)
            }
            Some(mut existing) if existing.status == BookingStatus::Cancelled => {
                debug!(
                    "Reactivating booking {} on slot {} for student {}",
                    existing.id, slot.id, student_id
                );
                existing.student_id = student_id;
                existing.status = BookingStatus::Active;
                existing.updated_at = Utc::now();
                tx.update_booking(&existing).await?;
                Ok(existing)
            }
            Some(_) => Err(BookingError::SlotNotClaimable),
            None => {
                let booking = Booking::new(slot.id, student_id);
                tx.insert_booking(&booking).await.map_err(lost_race)?;
                Ok(booking)
            }
        }
    }

    /// Moves `booking` to `status` inside a running unit of work.
    pub(crate) async fn transition(
        &self,
        tx: &mut dyn UnitOfWork,
        booking: &mut Booking,
        status: BookingStatus,
    ) -> BookingResult<()> {
        debug!("Booking {} {} -> {}", booking.id, booking.status, status);
        booking.status = status;
        booking.updated_at = Utc::now();
        tx.update_booking(booking).await?;
        Ok(())
    }

    /// Runs the regular cancellation rules: terminal state, ownership, cutoff.
    pub fn check_cancellation(&self, booking: &Booking, slot: &Slot, actor: &Actor) -> BookingResult<()> {
        if booking.status.is_terminal() {
            return Err(BookingError::BookingAlreadyTerminal);
        }
        if !policy::can_cancel_booking(actor, booking, slot) {
            warn!("Actor {} ({}) may not cancel booking {}", actor.id, actor.role, booking.id);
            return Err(BookingError::forbidden("you cannot cancel this booking"));
        }
        self.policy
            .check_cancellation_window(actor, &slot.window(), self.clock.now())
    }

    pub fn summarize(student_id: Uuid, bookings: &[BookingDetails]) -> StudentSummary {
        let mut summary = StudentSummary {
            student_id,
            ..StudentSummary::default()
        };
        for booking in bookings.iter().filter(|b| b.student_id == student_id) {
            summary.total += 1;
            match booking.status {
                BookingStatus::Active => summary.active += 1,
                BookingStatus::Completed => summary.completed += 1,
                BookingStatus::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }
}

/// A uniqueness rejection means another transaction claimed the slot first.
pub(crate) fn lost_race(err: StoreError) -> BookingError {
    match err {
        StoreError::UniqueViolation(constraint) => {
            warn!("Lost booking race on constraint {}", constraint);
            BookingError::SlotAlreadyBooked
        }
        other => BookingError::Storage(other),
    }
}
