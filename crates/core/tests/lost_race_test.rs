use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use rstest::rstest;
use slotbook_core::{
    clock::ManualClock,
    errors::{BookingError, ErrorKind, StoreError, StoreResult},
    models::{
        Actor, Booking, BookingDetails, BookingFilter, Slot, SlotFilter, SlotStatus, SweepScope,
    },
    policy::BookingPolicy,
    services::Services,
    store::{BookingStorage, MemoryStore, UnitOfWork},
    time_window::TimeWindow,
};
use std::sync::Arc;
use uuid::Uuid;

/// Where the engine reports the unique index rejecting a concurrent claim.
#[derive(Debug, Clone, Copy)]
enum Rejection {
    OnInsert,
    OnCommit,
}

fn unique_violation() -> StoreError {
    StoreError::UniqueViolation("ux_bookings_slot".to_string())
}

/// Storage that behaves as if another transaction inserted the booking row
/// between our lock and our write.
struct RacedStore {
    inner: MemoryStore,
    rejection: Rejection,
}

struct RacedUnitOfWork {
    inner: Box<dyn UnitOfWork>,
    rejection: Rejection,
}

#[async_trait]
impl BookingStorage for RacedStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(RacedUnitOfWork {
            inner: self.inner.begin().await?,
            rejection: self.rejection,
        }))
    }

    async fn get_slot(&self, slot_id: Uuid) -> StoreResult<Option<Slot>> {
        self.inner.get_slot(slot_id).await
    }

    async fn list_slots(&self, filter: &SlotFilter) -> StoreResult<Vec<Slot>> {
        self.inner.list_slots(filter).await
    }

    async fn list_free_slots(
        &self,
        tutor_id: Option<Uuid>,
        date: Option<NaiveDate>,
    ) -> StoreResult<Vec<Slot>> {
        self.inner.list_free_slots(tutor_id, date).await
    }

    async fn get_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        self.inner.get_booking(booking_id).await
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<BookingDetails>> {
        self.inner.list_bookings(filter).await
    }

    async fn complete_ended_bookings(
        &self,
        scope: &SweepScope,
        now: NaiveDateTime,
    ) -> StoreResult<u64> {
        self.inner.complete_ended_bookings(scope, now).await
    }
}

#[async_trait]
impl UnitOfWork for RacedUnitOfWork {
    async fn lock_slot(&mut self, slot_id: Uuid) -> StoreResult<Option<Slot>> {
        self.inner.lock_slot(slot_id).await
    }

    async fn lock_booking_for_slot(&mut self, slot_id: Uuid) -> StoreResult<Option<Booking>> {
        self.inner.lock_booking_for_slot(slot_id).await
    }

    async fn lock_tutor_schedule(&mut self, tutor_id: Uuid) -> StoreResult<()> {
        self.inner.lock_tutor_schedule(tutor_id).await
    }

    async fn tutor_slots_on(&mut self, tutor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<Slot>> {
        self.inner.tutor_slots_on(tutor_id, date).await
    }

    async fn insert_slot(&mut self, slot: &Slot) -> StoreResult<()> {
        self.inner.insert_slot(slot).await
    }

    async fn set_slot_status(&mut self, slot_id: Uuid, status: SlotStatus) -> StoreResult<()> {
        self.inner.set_slot_status(slot_id, status).await
    }

    async fn delete_slot(&mut self, slot_id: Uuid) -> StoreResult<()> {
        self.inner.delete_slot(slot_id).await
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        match self.rejection {
            Rejection::OnInsert => Err(unique_violation()),
            Rejection::OnCommit => self.inner.insert_booking(booking).await,
        }
    }

    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        self.inner.update_booking(booking).await
    }

    async fn delete_booking(&mut self, booking_id: Uuid) -> StoreResult<()> {
        self.inner.delete_booking(booking_id).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        match self.rejection {
            // Dropping the inner unit of work discards its writes
            Rejection::OnCommit => Err(unique_violation()),
            Rejection::OnInsert => self.inner.commit().await,
        }
    }
}

fn now() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2025-06-01 08:00", "%Y-%m-%d %H:%M").unwrap()
}

#[rstest]
#[case::rejected_on_insert(Rejection::OnInsert)]
#[case::rejected_on_commit(Rejection::OnCommit)]
#[tokio::test]
async fn test_unique_violation_becomes_already_booked(#[case] rejection: Rejection) {
    let memory = MemoryStore::new();
    let clock = Arc::new(ManualClock::new(now()));

    // Publish through the plain engine so only the claim meets the rejection
    let setup = Services::new(Arc::new(memory.clone()), clock.clone(), BookingPolicy::default());
    let slot = setup
        .slots
        .publish(
            Uuid::new_v4(),
            TimeWindow::parse("2025-06-10", "10:00", "11:00").unwrap(),
        )
        .await
        .unwrap();

    let raced = Services::new(
        Arc::new(RacedStore {
            inner: memory.clone(),
            rejection,
        }),
        clock,
        BookingPolicy::default(),
    );
    let err = raced
        .orchestrator
        .create_booking(slot.id, &Actor::student(Uuid::new_v4()), None)
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::SlotAlreadyBooked));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let stored = memory.get_slot(slot.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SlotStatus::Free);
    let rows = memory
        .list_bookings(&BookingFilter {
            slot_id: Some(slot.id),
            ..BookingFilter::default()
        })
        .await
        .unwrap();
    assert!(rows.is_empty());
}
