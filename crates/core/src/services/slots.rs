use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    errors::{BookingError, BookingResult},
    models::{Actor, BookingStatus, Role, Slot, SlotFilter, SlotStatus, slot::CreateSlotRequest},
    policy,
    store::{BookingStorage, UnitOfWork},
    time_window::TimeWindow,
};

/// Owns slot records: publication, deletion, status changes and free-slot listing.
#[derive(Clone)]
pub struct SlotStore {
    storage: Arc<dyn BookingStorage>,
    clock: Arc<dyn Clock>,
}

impl SlotStore {
    pub fn new(storage: Arc<dyn BookingStorage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Publishes a slot on behalf of `actor`.
    ///
    /// Tutors always publish for themselves; admins must name the tutor.
    pub async fn create_slot(&self, actor: &Actor, request: &CreateSlotRequest) -> BookingResult<Slot> {
        if !policy::can_publish_slot(actor) {
            warn!("Actor {} ({}) tried to publish a slot", actor.id, actor.role);
            return Err(BookingError::forbidden("only tutors and administrators can publish slots"));
        }

        let tutor_id = match actor.role {
            Role::Tutor => actor.id,
            _ => request.tutor_id.ok_or_else(|| {
                BookingError::Validation("tutorId is required when publishing for a tutor".to_string())
            })?,
        };

        let window = TimeWindow::parse(&request.date, &request.start_time, &request.end_time)?;
        self.publish(tutor_id, window).await
    }

    /// Persists a new `FREE` slot for `tutor_id`.
    ///
    /// # Errors
    ///
    /// * `InvalidInterval` - the window ends at or before its start
    /// * `SlotInPast` - the window does not start strictly after now
    /// * `SlotOverlap` - the window intersects another non-cancelled slot of the tutor
    pub async fn publish(&self, tutor_id: Uuid, window: TimeWindow) -> BookingResult<Slot> {
        if window.end <= window.start {
            return Err(BookingError::InvalidInterval);
        }
        if window.start_instant() <= self.clock.now() {
            return Err(BookingError::SlotInPast);
        }

        let mut tx = self.storage.begin().await?;
        tx.lock_tutor_schedule(tutor_id).await?;

        let existing = tx.tutor_slots_on(tutor_id, window.date).await?;
        if let Some(clash) = existing.iter().find(|s| s.window().overlaps(&window)) {
            debug!("Slot for tutor {} clashes with slot {}", tutor_id, clash.id);
            return Err(BookingError::SlotOverlap);
        }

        let slot = Slot::new(tutor_id, window);
        tx.insert_slot(&slot).await?;
        tx.commit().await?;

        info!(
            "Slot {} published for tutor {} on {} {}-{}",
            slot.id, tutor_id, slot.date, slot.start_time, slot.end_time
        );
        Ok(slot)
    }

    /// Changes the status of a slot inside a running unit of work.
    pub(crate) async fn set_status(
        &self,
        tx: &mut dyn UnitOfWork,
        slot_id: Uuid,
        status: SlotStatus,
    ) -> BookingResult<()> {
        debug!("Slot {} -> {}", slot_id, status);
        tx.set_slot_status(slot_id, status).await?;
        Ok(())
    }

    pub async fn delete_slot(&self, slot_id: Uuid, actor: &Actor) -> BookingResult<()> {
        let mut tx = self.storage.begin().await?;
        let slot = tx
            .lock_slot(slot_id)
            .await?
            .ok_or(BookingError::SlotNotFound(slot_id))?;

        if !policy::can_manage_slot(actor, &slot) {
            return Err(BookingError::forbidden("you cannot delete this slot"));
        }
        if slot.status != SlotStatus::Free {
            return Err(BookingError::SlotNotDeletable);
        }
        // A FREE slot with a live booking row means the two got out of step.
        if let Some(booking) = tx.lock_booking_for_slot(slot_id).await? {
            if booking.status != BookingStatus::Cancelled {
                warn!("Free slot {} still has {} booking {}", slot_id, booking.status, booking.id);
                return Err(BookingError::SlotNotDeletable);
            }
        }

        tx.delete_slot(slot_id).await?;
        tx.commit().await?;

        info!("Slot {} deleted by {} {}", slot_id, actor.role, actor.id);
        Ok(())
    }

    pub async fn get_slot(&self, slot_id: Uuid) -> BookingResult<Slot> {
        self.storage
            .get_slot(slot_id)
            .await?
            .ok_or(BookingError::SlotNotFound(slot_id))
    }

    /// Free slots, excluding any that still carry a non-cancelled booking.
    pub async fn list_free(
        &self,
        tutor_id: Option<Uuid>,
        date: Option<NaiveDate>,
    ) -> BookingResult<Vec<Slot>> {
        Ok(self.storage.list_free_slots(tutor_id, date).await?)
    }

    pub async fn list_slots(&self, filter: &SlotFilter) -> BookingResult<Vec<Slot>> {
        if filter.status == Some(SlotStatus::Free) {
            return self.list_free(filter.tutor_id, filter.date).await;
        }
        Ok(self.storage.list_slots(filter).await?)
    }
}
