//! Postgres engine behind the booking core's storage seam.
//!
//! Row locks are `SELECT ... FOR UPDATE` inside a real transaction, slot
//! publication takes a transaction-scoped advisory lock per tutor, and the
//! `ux_bookings_slot` unique index backs the one-row-per-slot rule.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use eyre::Report;
use slotbook_core::{
    errors::{StoreError, StoreResult},
    models::{Booking, BookingDetails, BookingFilter, Slot, SlotFilter, SlotStatus, SweepScope},
    store::{BookingStorage, UnitOfWork},
};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    DbPool,
    models::{DbBooking, DbSlot},
    repositories::{bookings, slots},
};

const UNIQUE_VIOLATION: &str = "23505";

/// Translates a repository failure, keeping unique violations distinguishable.
fn store_error(report: Report) -> StoreError {
    if let Some(sqlx::Error::Database(db_err)) = report.downcast_ref::<sqlx::Error>() {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or("unique").to_string();
            return StoreError::UniqueViolation(constraint);
        }
    }
    StoreError::Backend(report)
}

fn db_slot(slot: &Slot) -> DbSlot {
    DbSlot {
        id: slot.id,
        tutor_id: slot.tutor_id,
        slot_date: slot.date,
        start_time: slot.start_time,
        end_time: slot.end_time,
        status: slot.status.as_str().to_string(),
        created_at: slot.created_at,
    }
}

fn db_booking(booking: &Booking) -> DbBooking {
    DbBooking {
        id: booking.id,
        slot_id: booking.slot_id,
        student_id: booking.student_id,
        status: booking.status.as_str().to_string(),
        created_at: booking.created_at,
        updated_at: booking.updated_at,
    }
}

fn convert<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = Report>,
{
    rows.into_iter()
        .map(|row| T::try_from(row).map_err(StoreError::Backend))
        .collect()
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl BookingStorage for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.map_err(|e| StoreError::Backend(e.into()))?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn get_slot(&self, slot_id: Uuid) -> StoreResult<Option<Slot>> {
        slots::get_slot_by_id(&self.pool, slot_id)
            .await
            .map_err(store_error)?
            .map(Slot::try_from)
            .transpose()
            .map_err(StoreError::Backend)
    }

    async fn list_slots(&self, filter: &SlotFilter) -> StoreResult<Vec<Slot>> {
        let rows = slots::list_slots(
            &self.pool,
            filter.tutor_id,
            filter.date,
            filter.status.as_ref().map(SlotStatus::as_str),
        )
        .await
        .map_err(store_error)?;
        convert(rows)
    }

    async fn list_free_slots(
        &self,
        tutor_id: Option<Uuid>,
        date: Option<NaiveDate>,
    ) -> StoreResult<Vec<Slot>> {
        let rows = slots::list_free_slots(&self.pool, tutor_id, date)
            .await
            .map_err(store_error)?;
        convert(rows)
    }

    async fn get_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        bookings::get_booking_by_id(&self.pool, booking_id)
            .await
            .map_err(store_error)?
            .map(Booking::try_from)
            .transpose()
            .map_err(StoreError::Backend)
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<BookingDetails>> {
        let rows = bookings::list_booking_details(
            &self.pool,
            filter.student_id,
            filter.tutor_id,
            filter.slot_id,
            filter.status.as_ref().map(|s| s.as_str()),
        )
        .await
        .map_err(store_error)?;
        convert(rows)
    }

    async fn complete_ended_bookings(
        &self,
        scope: &SweepScope,
        now: NaiveDateTime,
    ) -> StoreResult<u64> {
        bookings::complete_ended_bookings(
            &self.pool,
            now,
            scope.student_id,
            scope.tutor_id,
            scope.slot_id,
        )
        .await
        .map_err(store_error)
    }
}

/// One open Postgres transaction. Dropping it without commit rolls back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_slot(&mut self, slot_id: Uuid) -> StoreResult<Option<Slot>> {
        slots::lock_slot_by_id(&mut *self.tx, slot_id)
            .await
            .map_err(store_error)?
            .map(Slot::try_from)
            .transpose()
            .map_err(StoreError::Backend)
    }

    async fn lock_booking_for_slot(&mut self, slot_id: Uuid) -> StoreResult<Option<Booking>> {
        bookings::lock_booking_by_slot(&mut *self.tx, slot_id)
            .await
            .map_err(store_error)?
            .map(Booking::try_from)
            .transpose()
            .map_err(StoreError::Backend)
    }

    async fn lock_tutor_schedule(&mut self, tutor_id: Uuid) -> StoreResult<()> {
        slots::lock_tutor(&mut *self.tx, tutor_id)
            .await
            .map_err(store_error)
    }

    async fn tutor_slots_on(&mut self, tutor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<Slot>> {
        let rows = slots::get_active_slots_for_tutor_on(&mut *self.tx, tutor_id, date)
            .await
            .map_err(store_error)?;
        convert(rows)
    }

    async fn insert_slot(&mut self, slot: &Slot) -> StoreResult<()> {
        slots::create_slot(&mut *self.tx, &db_slot(slot))
            .await
            .map_err(store_error)
    }

    async fn set_slot_status(&mut self, slot_id: Uuid, status: SlotStatus) -> StoreResult<()> {
        slots::update_slot_status(&mut *self.tx, slot_id, status.as_str())
            .await
            .map_err(store_error)
    }

    async fn delete_slot(&mut self, slot_id: Uuid) -> StoreResult<()> {
        bookings::delete_cancelled_bookings_for_slot(&mut *self.tx, slot_id)
            .await
            .map_err(store_error)?;
        slots::delete_slot(&mut *self.tx, slot_id)
            .await
            .map_err(store_error)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        bookings::create_booking(&mut *self.tx, &db_booking(booking))
            .await
            .map_err(store_error)
    }

    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        bookings::update_booking(&mut *self.tx, &db_booking(booking))
            .await
            .map_err(store_error)
    }

    async fn delete_booking(&mut self, booking_id: Uuid) -> StoreResult<()> {
        bookings::delete_booking(&mut *self.tx, booking_id)
            .await
            .map_err(store_error)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| store_error(e.into()))
    }
}
