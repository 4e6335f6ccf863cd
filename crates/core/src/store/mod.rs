//! Storage seam of the booking core.
//!
//! A [`BookingStorage`] hands out non-transactional reads and opens units of
//! work. A [`UnitOfWork`] owns one storage transaction: row locks taken
//! through it are held until [`UnitOfWork::commit`], and dropping it without
//! committing discards every write made through it.
//!
//! Lock order is slot row first, then the slot's booking row. Every engine
//! must keep the "one booking row per slot" uniqueness rule on its own and
//! report violations as [`StoreError::UniqueViolation`](crate::errors::StoreError).

pub mod memory;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::{
    errors::StoreResult,
    models::{
        Booking, BookingDetails, BookingFilter, Slot, SlotFilter, SlotStatus, SweepScope,
    },
};

pub use memory::MemoryStore;

#[async_trait]
pub trait BookingStorage: Send + Sync {
    /// Opens a transaction.
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;

    async fn get_slot(&self, slot_id: Uuid) -> StoreResult<Option<Slot>>;

    /// Slots matching every populated field of `filter`, by date then start time.
    async fn list_slots(&self, filter: &SlotFilter) -> StoreResult<Vec<Slot>>;

    /// `FREE` slots that have no booking row other than cancelled ones.
    async fn list_free_slots(
        &self,
        tutor_id: Option<Uuid>,
        date: Option<NaiveDate>,
    ) -> StoreResult<Vec<Slot>>;

    async fn get_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>>;

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<BookingDetails>>;

    /// Marks every `ACTIVE` booking in scope whose slot ended strictly before
    /// `now` as `COMPLETED`. Returns the number of rows changed.
    async fn complete_ended_bookings(
        &self,
        scope: &SweepScope,
        now: NaiveDateTime,
    ) -> StoreResult<u64>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    /// Reads the slot row and holds an exclusive lock on it.
    async fn lock_slot(&mut self, slot_id: Uuid) -> StoreResult<Option<Slot>>;

    /// Reads the booking row of a slot, if any, and holds an exclusive lock on it.
    async fn lock_booking_for_slot(&mut self, slot_id: Uuid) -> StoreResult<Option<Booking>>;

    /// Serializes slot publication for one tutor until commit.
    async fn lock_tutor_schedule(&mut self, tutor_id: Uuid) -> StoreResult<()>;

    /// Non-cancelled slots of a tutor on one date.
    async fn tutor_slots_on(&mut self, tutor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<Slot>>;

    async fn insert_slot(&mut self, slot: &Slot) -> StoreResult<()>;

    async fn set_slot_status(&mut self, slot_id: Uuid, status: SlotStatus) -> StoreResult<()>;

    /// Removes the slot together with any cancelled booking rows that still point at it.
    async fn delete_slot(&mut self, slot_id: Uuid) -> StoreResult<()>;

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()>;

    /// Persists `student_id`, `status` and `updated_at` of an existing row.
    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()>;

    async fn delete_booking(&mut self, booking_id: Uuid) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
