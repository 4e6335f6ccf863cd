use crate::models::DbSlot;
use chrono::NaiveDate;
use eyre::Result;
use sqlx::postgres::PgExecutor;
use uuid::Uuid;

const SLOT_COLUMNS: &str = "id, tutor_id, slot_date, start_time, end_time, status, created_at";

pub async fn create_slot<'e, E: PgExecutor<'e>>(executor: E, slot: &DbSlot) -> Result<()> {
    tracing::debug!(
        "Creating slot: id={}, tutor_id={}, date={}",
        slot.id, slot.tutor_id, slot.slot_date
    );

    sqlx::query(
        r#"
        INSERT INTO slots (id, tutor_id, slot_date, start_time, end_time, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(slot.id)
    .bind(slot.tutor_id)
    .bind(slot.slot_date)
    .bind(slot.start_time)
    .bind(slot.end_time)
    .bind(&slot.status)
    .bind(slot.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_slot_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<DbSlot>> {
    let slot = sqlx::query_as::<_, DbSlot>(&format!(
        "SELECT {} FROM slots WHERE id = $1",
        SLOT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(slot)
}

/// Reads the slot and holds a row lock on it until the transaction ends.
pub async fn lock_slot_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<DbSlot>> {
    let slot = sqlx::query_as::<_, DbSlot>(&format!(
        "SELECT {} FROM slots WHERE id = $1 FOR UPDATE",
        SLOT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(slot)
}

/// Transaction-scoped advisory lock keyed on the tutor.
pub async fn lock_tutor<'e, E: PgExecutor<'e>>(executor: E, tutor_id: Uuid) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::uuid::text, 0))")
        .bind(tutor_id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn get_active_slots_for_tutor_on<'e, E: PgExecutor<'e>>(
    executor: E,
    tutor_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<DbSlot>> {
    let slots = sqlx::query_as::<_, DbSlot>(&format!(
        r#"
        SELECT {}
        FROM slots
        WHERE tutor_id = $1 AND slot_date = $2 AND status <> 'CANCELLED'
        ORDER BY start_time ASC
        "#,
        SLOT_COLUMNS
    ))
    .bind(tutor_id)
    .bind(date)
    .fetch_all(executor)
    .await?;

    Ok(slots)
}

pub async fn list_slots<'e, E: PgExecutor<'e>>(
    executor: E,
    tutor_id: Option<Uuid>,
    date: Option<NaiveDate>,
    status: Option<&str>,
) -> Result<Vec<DbSlot>> {
    let slots = sqlx::query_as::<_, DbSlot>(&format!(
        r#"
        SELECT {}
        FROM slots
        WHERE ($1::uuid IS NULL OR tutor_id = $1)
          AND ($2::date IS NULL OR slot_date = $2)
          AND ($3::text IS NULL OR status = $3)
        ORDER BY slot_date ASC, start_time ASC, created_at ASC
        "#,
        SLOT_COLUMNS
    ))
    .bind(tutor_id)
    .bind(date)
    .bind(status)
    .fetch_all(executor)
    .await?;

    Ok(slots)
}

/// `FREE` slots whose booking row, if any, is cancelled.
pub async fn list_free_slots<'e, E: PgExecutor<'e>>(
    executor: E,
    tutor_id: Option<Uuid>,
    date: Option<NaiveDate>,
) -> Result<Vec<DbSlot>> {
    let slots = sqlx::query_as::<_, DbSlot>(
        r#"
        SELECT s.id, s.tutor_id, s.slot_date, s.start_time, s.end_time, s.status, s.created_at
        FROM slots s
        WHERE s.status = 'FREE'
          AND ($1::uuid IS NULL OR s.tutor_id = $1)
          AND ($2::date IS NULL OR s.slot_date = $2)
          AND NOT EXISTS (
              SELECT 1 FROM bookings b
              WHERE b.slot_id = s.id AND b.status <> 'CANCELLED'
          )
        ORDER BY s.slot_date ASC, s.start_time ASC, s.created_at ASC
        "#,
    )
    .bind(tutor_id)
    .bind(date)
    .fetch_all(executor)
    .await?;

    Ok(slots)
}

pub async fn update_slot_status<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, status: &str) -> Result<()> {
    tracing::debug!("Updating slot status: id={}, status={}", id, status);

    sqlx::query("UPDATE slots SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn delete_slot<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM slots WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(())
}
