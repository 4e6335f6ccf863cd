//! In-process storage engine.
//!
//! A unit of work takes the state lock for its whole lifetime, so
//! transactions run one after another. Writes go to a staged copy that
//! replaces the shared state on commit.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{BookingStorage, UnitOfWork};
use crate::{
    errors::{StoreError, StoreResult},
    models::{
        Booking, BookingDetails, BookingFilter, BookingStatus, Slot, SlotFilter, SlotStatus,
        SweepScope,
    },
};

const BOOKING_SLOT_CONSTRAINT: &str = "ux_bookings_slot";

#[derive(Debug, Clone, Default)]
struct MemoryState {
    slots: HashMap<Uuid, Slot>,
    bookings: HashMap<Uuid, Booking>,
}

impl MemoryState {
    fn booking_for_slot(&self, slot_id: Uuid) -> Option<&Booking> {
        self.bookings.values().find(|b| b.slot_id == slot_id)
    }

    fn details(&self, booking: &Booking) -> Option<BookingDetails> {
        let slot = self.slots.get(&booking.slot_id)?;
        Some(BookingDetails {
            id: booking.id,
            slot_id: booking.slot_id,
            student_id: booking.student_id,
            status: booking.status,
            tutor_id: slot.tutor_id,
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            slot_status: slot.status,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        })
    }
}

fn in_scope(details: &BookingDetails, scope: &SweepScope) -> bool {
    scope.student_id.is_none_or(|id| details.student_id == id)
        && scope.tutor_id.is_none_or(|id| details.tutor_id == id)
        && scope.slot_id.is_none_or(|id| details.slot_id == id)
}

fn sort_slots(slots: &mut [Slot]) {
    slots.sort_by_key(|s| (s.date, s.start_time, s.created_at));
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStorage for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, staged }))
    }

    async fn get_slot(&self, slot_id: Uuid) -> StoreResult<Option<Slot>> {
        Ok(self.state.lock().await.slots.get(&slot_id).cloned())
    }

    async fn list_slots(&self, filter: &SlotFilter) -> StoreResult<Vec<Slot>> {
        let state = self.state.lock().await;
        let mut slots: Vec<Slot> = state
            .slots
            .values()
            .filter(|s| filter.tutor_id.is_none_or(|id| s.tutor_id == id))
            .filter(|s| filter.date.is_none_or(|d| s.date == d))
            .filter(|s| filter.status.is_none_or(|st| s.status == st))
            .cloned()
            .collect();
        sort_slots(&mut slots);
        Ok(slots)
    }

    async fn list_free_slots(
        &self,
        tutor_id: Option<Uuid>,
        date: Option<NaiveDate>,
    ) -> StoreResult<Vec<Slot>> {
        let state = self.state.lock().await;
        let mut slots: Vec<Slot> = state
            .slots
            .values()
            .filter(|s| s.status == SlotStatus::Free)
            .filter(|s| tutor_id.is_none_or(|id| s.tutor_id == id))
            .filter(|s| date.is_none_or(|d| s.date == d))
            .filter(|s| {
                state
                    .booking_for_slot(s.id)
                    .is_none_or(|b| b.status == BookingStatus::Cancelled)
            })
            .cloned()
            .collect();
        sort_slots(&mut slots);
        Ok(slots)
    }

    async fn get_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.state.lock().await.bookings.get(&booking_id).cloned())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<BookingDetails>> {
        let state = self.state.lock().await;
        let scope = SweepScope::from(filter);
        let mut bookings: Vec<BookingDetails> = state
            .bookings
            .values()
            .filter_map(|b| state.details(b))
            .filter(|d| in_scope(d, &scope))
            .filter(|d| filter.status.is_none_or(|st| d.status == st))
            .collect();
        bookings.sort_by_key(|d| (d.date, d.start_time, d.created_at));
        Ok(bookings)
    }

    async fn complete_ended_bookings(
        &self,
        scope: &SweepScope,
        now: NaiveDateTime,
    ) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let ended: Vec<Uuid> = state
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Active)
            .filter_map(|b| state.details(b))
            .filter(|d| in_scope(d, scope))
            .filter(|d| d.date.and_time(d.end_time) < now)
            .map(|d| d.id)
            .collect();

        let stamp = Utc::now();
        for id in &ended {
            if let Some(booking) = state.bookings.get_mut(id) {
                booking.status = BookingStatus::Completed;
                booking.updated_at = stamp;
            }
        }
        Ok(ended.len() as u64)
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    // The state lock is already held, so row locks are plain reads.
    async fn lock_slot(&mut self, slot_id: Uuid) -> StoreResult<Option<Slot>> {
        Ok(self.staged.slots.get(&slot_id).cloned())
    }

    async fn lock_booking_for_slot(&mut self, slot_id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.staged.booking_for_slot(slot_id).cloned())
    }

    async fn lock_tutor_schedule(&mut self, _tutor_id: Uuid) -> StoreResult<()> {
        Ok(())
    }

    async fn tutor_slots_on(&mut self, tutor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<Slot>> {
        let mut slots: Vec<Slot> = self
            .staged
            .slots
            .values()
            .filter(|s| s.tutor_id == tutor_id && s.date == date)
            .filter(|s| s.status != SlotStatus::Cancelled)
            .cloned()
            .collect();
        sort_slots(&mut slots);
        Ok(slots)
    }

    async fn insert_slot(&mut self, slot: &Slot) -> StoreResult<()> {
        self.staged.slots.insert(slot.id, slot.clone());
        Ok(())
    }

    async fn set_slot_status(&mut self, slot_id: Uuid, status: SlotStatus) -> StoreResult<()> {
        if let Some(slot) = self.staged.slots.get_mut(&slot_id) {
            slot.status = status;
        }
        Ok(())
    }

    async fn delete_slot(&mut self, slot_id: Uuid) -> StoreResult<()> {
        self.staged
            .bookings
            .retain(|_, b| !(b.slot_id == slot_id && b.status == BookingStatus::Cancelled));
        self.staged.slots.remove(&slot_id);
        Ok(())
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        if self.staged.booking_for_slot(booking.slot_id).is_some() {
            return Err(StoreError::UniqueViolation(BOOKING_SLOT_CONSTRAINT.to_string()));
        }
        self.staged.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        if let Some(row) = self.staged.bookings.get_mut(&booking.id) {
            row.student_id = booking.student_id;
            row.status = booking.status;
            row.updated_at = booking.updated_at;
        }
        Ok(())
    }

    async fn delete_booking(&mut self, booking_id: Uuid) -> StoreResult<()> {
        self.staged.bookings.remove(&booking_id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_window::TimeWindow;

    fn slot(tutor: Uuid) -> Slot {
        Slot::new(tutor, TimeWindow::parse("2025-06-10", "10:00", "11:00").unwrap())
    }

    #[tokio::test]
    async fn dropped_unit_of_work_rolls_back() {
        let store = MemoryStore::new();
        let slot = slot(Uuid::new_v4());
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_slot(&slot).await.unwrap();
        }
        assert!(store.get_slot(slot.id).await.unwrap().is_none());

        let mut tx = store.begin().await.unwrap();
        tx.insert_slot(&slot).await.unwrap();
        tx.commit().await.unwrap();
        assert!(store.get_slot(slot.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_booking_row_for_slot_is_a_unique_violation() {
        let store = MemoryStore::new();
        let slot = slot(Uuid::new_v4());
        let mut tx = store.begin().await.unwrap();
        tx.insert_slot(&slot).await.unwrap();
        tx.insert_booking(&Booking::new(slot.id, Uuid::new_v4())).await.unwrap();

        let err = tx
            .insert_booking(&Booking::new(slot.id, Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn deleting_a_slot_drops_its_cancelled_booking_rows() {
        let store = MemoryStore::new();
        let slot = slot(Uuid::new_v4());
        let mut booking = Booking::new(slot.id, Uuid::new_v4());
        booking.status = BookingStatus::Cancelled;

        let mut tx = store.begin().await.unwrap();
        tx.insert_slot(&slot).await.unwrap();
        tx.insert_booking(&booking).await.unwrap();
        tx.delete_slot(slot.id).await.unwrap();
        tx.commit().await.unwrap();

        assert!(store.get_booking(booking.id).await.unwrap().is_none());
    }
}
