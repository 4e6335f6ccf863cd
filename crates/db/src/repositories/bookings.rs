use crate::models::{DbBooking, DbBookingDetails};
use chrono::NaiveDateTime;
use eyre::Result;
use sqlx::postgres::PgExecutor;
use uuid::Uuid;

const BOOKING_COLUMNS: &str = "id, slot_id, student_id, status, created_at, updated_at";

pub async fn create_booking<'e, E: PgExecutor<'e>>(executor: E, booking: &DbBooking) -> Result<()> {
    tracing::debug!(
        "Creating booking: id={}, slot_id={}, student_id={}",
        booking.id, booking.slot_id, booking.student_id
    );

    sqlx::query(
        r#"
        INSERT INTO bookings (id, slot_id, student_id, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(booking.id)
    .bind(booking.slot_id)
    .bind(booking.student_id)
    .bind(&booking.status)
    .bind(booking.created_at)
    .bind(booking.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_booking_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<DbBooking>> {
    let booking = sqlx::query_as::<_, DbBooking>(&format!(
        "SELECT {} FROM bookings WHERE id = $1",
        BOOKING_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(booking)
}

/// Reads the booking row of a slot and holds a row lock on it.
pub async fn lock_booking_by_slot<'e, E: PgExecutor<'e>>(
    executor: E,
    slot_id: Uuid,
) -> Result<Option<DbBooking>> {
    let booking = sqlx::query_as::<_, DbBooking>(&format!(
        "SELECT {} FROM bookings WHERE slot_id = $1 FOR UPDATE",
        BOOKING_COLUMNS
    ))
    .bind(slot_id)
    .fetch_optional(executor)
    .await?;

    Ok(booking)
}

pub async fn list_booking_details<'e, E: PgExecutor<'e>>(
    executor: E,
    student_id: Option<Uuid>,
    tutor_id: Option<Uuid>,
    slot_id: Option<Uuid>,
    status: Option<&str>,
) -> Result<Vec<DbBookingDetails>> {
    let bookings = sqlx::query_as::<_, DbBookingDetails>(
        r#"
        SELECT b.id, b.slot_id, b.student_id, b.status,
               s.tutor_id, s.slot_date, s.start_time, s.end_time, s.status AS slot_status,
               b.created_at, b.updated_at
        FROM bookings b
        JOIN slots s ON s.id = b.slot_id
        WHERE ($1::uuid IS NULL OR b.student_id = $1)
          AND ($2::uuid IS NULL OR s.tutor_id = $2)
          AND ($3::uuid IS NULL OR b.slot_id = $3)
          AND ($4::text IS NULL OR b.status = $4)
        ORDER BY s.slot_date ASC, s.start_time ASC, b.created_at ASC
        "#,
    )
    .bind(student_id)
    .bind(tutor_id)
    .bind(slot_id)
    .bind(status)
    .fetch_all(executor)
    .await?;

    Ok(bookings)
}

pub async fn update_booking<'e, E: PgExecutor<'e>>(executor: E, booking: &DbBooking) -> Result<()> {
    tracing::debug!(
        "Updating booking: id={}, student_id={}, status={}",
        booking.id, booking.student_id, booking.status
    );

    sqlx::query(
        r#"
        UPDATE bookings
        SET student_id = $2, status = $3, updated_at = $4
        WHERE id = $1
        "#,
    )
    .bind(booking.id)
    .bind(booking.student_id)
    .bind(&booking.status)
    .bind(booking.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn delete_booking<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM bookings WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn delete_cancelled_bookings_for_slot<'e, E: PgExecutor<'e>>(
    executor: E,
    slot_id: Uuid,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM bookings WHERE slot_id = $1 AND status = 'CANCELLED'")
        .bind(slot_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Flips `ACTIVE` bookings whose slot ended strictly before `now` to `COMPLETED`.
///
/// A single conditional statement, so concurrent passes converge on the
/// same rows and a second pass changes nothing.
pub async fn complete_ended_bookings<'e, E: PgExecutor<'e>>(
    executor: E,
    now: NaiveDateTime,
    student_id: Option<Uuid>,
    tutor_id: Option<Uuid>,
    slot_id: Option<Uuid>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE bookings b
        SET status = 'COMPLETED', updated_at = NOW()
        FROM slots s
        WHERE b.slot_id = s.id
          AND b.status = 'ACTIVE'
          AND (s.slot_date + s.end_time) < $1
          AND ($2::uuid IS NULL OR b.student_id = $2)
          AND ($3::uuid IS NULL OR s.tutor_id = $3)
          AND ($4::uuid IS NULL OR b.slot_id = $4)
        "#,
    )
    .bind(now)
    .bind(student_id)
    .bind(tutor_id)
    .bind(slot_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
