//! Transactional entry points of the booking lifecycle.
//!
//! Every write runs in one unit of work that locks the slot row before the
//! booking row, so claims and cancellations on the same slot serialize in
//! the storage engine and never interleave.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{bookings::BookingStore, bookings::lost_race, slots::SlotStore, sweeper::Sweeper};
use crate::{
    errors::{BookingError, BookingResult},
    models::{
        Actor, Booking, BookingDetails, BookingFilter, BookingStatus, ReviewEligibility, Role,
        Slot, SlotFilter, SlotStatus, StudentSummary, SweepScope,
    },
    policy,
    store::BookingStorage,
};

#[derive(Clone)]
pub struct BookingOrchestrator {
    storage: Arc<dyn BookingStorage>,
    slots: SlotStore,
    bookings: BookingStore,
    sweeper: Sweeper,
}

impl BookingOrchestrator {
    pub fn new(
        storage: Arc<dyn BookingStorage>,
        slots: SlotStore,
        bookings: BookingStore,
        sweeper: Sweeper,
    ) -> Self {
        Self {
            storage,
            slots,
            bookings,
            sweeper,
        }
    }

    /// Claims a free slot.
    ///
    /// Students book for themselves; admins book on behalf of `student_id`.
    ///
    /// # Errors
    ///
    /// * `SlotNotFound` - no such slot
    /// * `SlotAlreadyBooked` - the slot is booked, including by a concurrent claim
    /// * `SlotNotClaimable` - the slot is cancelled or its booking already completed
    /// * `Forbidden` - tutors cannot book
    pub async fn create_booking(
        &self,
        slot_id: Uuid,
        actor: &Actor,
        student_id: Option<Uuid>,
    ) -> BookingResult<Booking> {
        if !policy::can_book(actor) {
            return Err(BookingError::forbidden("only students and administrators can book slots"));
        }
        let student_id = match actor.role {
            Role::Student => actor.id,
            _ => student_id.ok_or_else(|| {
                BookingError::Validation("studentId is required when booking for a student".to_string())
            })?,
        };

        let mut tx = self.storage.begin().await?;
        let slot = tx
            .lock_slot(slot_id)
            .await?
            .ok_or(BookingError::SlotNotFound(slot_id))?;

        match slot.status {
            SlotStatus::Free => {}
            SlotStatus::Booked => return Err(BookingError::SlotAlreadyBooked),
            SlotStatus::Cancelled => return Err(BookingError::SlotNotClaimable),
        }

        let booking = self.bookings.claim(tx.as_mut(), &slot, student_id).await?;
        self.slots
            .set_status(tx.as_mut(), slot.id, SlotStatus::Booked)
            .await?;
        tx.commit().await.map_err(lost_race)?;

        info!(
            "Booking {} created on slot {} for student {}",
            booking.id, slot.id, student_id
        );
        Ok(booking)
    }

    /// Cancels an active booking and releases its slot per policy.
    pub async fn cancel_booking(&self, booking_id: Uuid, actor: &Actor) -> BookingResult<Booking> {
        let (mut tx, slot, mut booking) = self.lock_booking(booking_id).await?;

        self.bookings.check_cancellation(&booking, &slot, actor)?;

        let release = self.bookings.policy().release_on_cancel.slot_status();
        self.bookings
            .transition(tx.as_mut(), &mut booking, BookingStatus::Cancelled)
            .await?;
        self.slots.set_status(tx.as_mut(), slot.id, release).await?;
        tx.commit().await?;

        info!(
            "Booking {} cancelled by {} {}; slot {} is now {}",
            booking.id, actor.role, actor.id, slot.id, release
        );
        Ok(booking)
    }

    /// Status update coming from the raw `PUT` surface.
    ///
    /// Administrators get the override path; everybody else may only cancel.
    pub async fn update_status(
        &self,
        booking_id: Uuid,
        actor: &Actor,
        status: BookingStatus,
    ) -> BookingResult<Booking> {
        if policy::can_override_booking(actor) {
            return self.override_status(booking_id, actor, status).await;
        }
        match status {
            BookingStatus::Cancelled => self.cancel_booking(booking_id, actor).await,
            other => Err(BookingError::forbidden(format!(
                "only administrators can set a booking to {}",
                other
            ))),
        }
    }

    /// Administrative override: sets any status, skipping cutoff and terminal checks.
    pub async fn override_status(
        &self,
        booking_id: Uuid,
        actor: &Actor,
        status: BookingStatus,
    ) -> BookingResult<Booking> {
        if !policy::can_override_booking(actor) {
            return Err(BookingError::forbidden("only administrators can override bookings"));
        }
        let (mut tx, slot, mut booking) = self.lock_booking(booking_id).await?;

        let slot_status = match status {
            BookingStatus::Active | BookingStatus::Completed => SlotStatus::Booked,
            BookingStatus::Cancelled => self.bookings.policy().release_on_cancel.slot_status(),
        };
        let previous = booking.status;
        self.bookings.transition(tx.as_mut(), &mut booking, status).await?;
        self.slots.set_status(tx.as_mut(), slot.id, slot_status).await?;
        tx.commit().await?;

        warn!(
            "Admin {} overrode booking {} from {} to {}",
            actor.id, booking.id, previous, status
        );
        Ok(booking)
    }

    /// Administrative removal of a booking row.
    ///
    /// The slot loses its only booking row, so a slot still marked BOOKED is
    /// released per policy whatever the deleted booking's status was.
    pub async fn delete_booking(&self, booking_id: Uuid, actor: &Actor) -> BookingResult<()> {
        if !policy::can_override_booking(actor) {
            return Err(BookingError::forbidden("only administrators can delete bookings"));
        }
        let (mut tx, slot, booking) = self.lock_booking(booking_id).await?;

        tx.delete_booking(booking.id).await?;
        if slot.status == SlotStatus::Booked {
            let release = self.bookings.policy().release_on_cancel.slot_status();
            self.slots.set_status(tx.as_mut(), slot.id, release).await?;
        }
        tx.commit().await?;

        warn!("Admin {} deleted booking {} on slot {}", actor.id, booking.id, slot.id);
        Ok(())
    }

    /// Sweeps ended bookings in scope, then lists.
    pub async fn list_bookings(&self, filter: &BookingFilter) -> BookingResult<Vec<BookingDetails>> {
        self.sweeper.sweep_completed(&SweepScope::from(filter)).await?;
        self.bookings.list(filter).await
    }

    /// Bookings where the caller is the student, or the tutor of the slot.
    pub async fn list_my_bookings(&self, actor: &Actor) -> BookingResult<Vec<BookingDetails>> {
        let filter = policy::visible_bookings(actor, BookingFilter::default());
        self.list_bookings(&filter).await
    }

    pub async fn list_slots(&self, filter: &SlotFilter) -> BookingResult<Vec<Slot>> {
        let scope = SweepScope {
            tutor_id: filter.tutor_id,
            ..SweepScope::default()
        };
        self.sweeper.sweep_completed(&scope).await?;
        self.slots.list_slots(filter).await
    }

    pub async fn get_booking(&self, booking_id: Uuid, actor: &Actor) -> BookingResult<Booking> {
        let (booking, slot) = self.fresh_booking(booking_id).await?;
        if !policy::can_view_booking(actor, &booking, &slot) {
            return Err(BookingError::forbidden("you cannot view this booking"));
        }
        Ok(booking)
    }

    /// Whether the booking can receive a review: it must have been held.
    pub async fn review_eligibility(
        &self,
        booking_id: Uuid,
        actor: &Actor,
    ) -> BookingResult<ReviewEligibility> {
        let (booking, _) = self.fresh_booking(booking_id).await?;
        if !policy::can_review(actor, &booking) {
            return Err(BookingError::forbidden("only the booking's student can review it"));
        }
        Ok(ReviewEligibility {
            booking_id,
            status: booking.status,
            eligible: booking.status == BookingStatus::Completed,
        })
    }

    pub async fn student_summary(&self, student_id: Uuid, actor: &Actor) -> BookingResult<StudentSummary> {
        let allowed = actor.is_admin() || (actor.role == Role::Student && actor.id == student_id);
        if !allowed {
            return Err(BookingError::forbidden("you cannot view this student's bookings"));
        }
        let filter = BookingFilter {
            student_id: Some(student_id),
            ..BookingFilter::default()
        };
        let bookings = self.list_bookings(&filter).await?;
        Ok(BookingStore::summarize(student_id, &bookings))
    }

    /// Reads a booking and its slot after sweeping that slot.
    async fn fresh_booking(&self, booking_id: Uuid) -> BookingResult<(Booking, Slot)> {
        let booking = self.bookings.get_booking(booking_id).await?;
        let scope = SweepScope {
            slot_id: Some(booking.slot_id),
            ..SweepScope::default()
        };
        self.sweeper.sweep_completed(&scope).await?;

        let booking = self.bookings.get_booking(booking_id).await?;
        let slot = self.slots.get_slot(booking.slot_id).await?;
        Ok((booking, slot))
    }

    /// Opens a unit of work holding the slot lock and then the booking lock.
    async fn lock_booking(
        &self,
        booking_id: Uuid,
    ) -> BookingResult<(Box<dyn crate::store::UnitOfWork>, Slot, Booking)> {
        let slot_id = self.bookings.get_booking(booking_id).await?.slot_id;

        let mut tx = self.storage.begin().await?;
        let slot = tx
            .lock_slot(slot_id)
            .await?
            .ok_or(BookingError::SlotNotFound(slot_id))?;
        let booking = tx
            .lock_booking_for_slot(slot_id)
            .await?
            .filter(|b| b.id == booking_id)
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        Ok((tx, slot, booking))
    }
}
