use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

/// Name of the unique index that keeps a single booking row per slot.
pub const BOOKING_SLOT_INDEX: &str = "ux_bookings_slot";

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create slots table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS slots (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            tutor_id UUID NOT NULL,
            slot_date DATE NOT NULL,
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            status VARCHAR(16) NOT NULL DEFAULT 'FREE',
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_slot_range CHECK (end_time > start_time),
            CONSTRAINT valid_slot_status CHECK (status IN ('FREE', 'BOOKED', 'CANCELLED'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create bookings table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookings (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            slot_id UUID NOT NULL REFERENCES slots(id),
            student_id UUID NOT NULL,
            status VARCHAR(16) NOT NULL DEFAULT 'ACTIVE',
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_booking_status CHECK (status IN ('ACTIVE', 'CANCELLED', 'COMPLETED'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_slots_tutor_date ON slots(tutor_id, slot_date)",
        "CREATE INDEX IF NOT EXISTS idx_slots_status ON slots(status)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_student ON bookings(student_id)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings(status)",
        "CREATE UNIQUE INDEX IF NOT EXISTS ux_bookings_slot ON bookings(slot_id)",
    ];
    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}

/// Drops every table. Only used by `db-migrate --reset`.
pub async fn drop_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Dropping database schema...");

    sqlx::query("DROP TABLE IF EXISTS bookings").execute(pool).await?;
    sqlx::query("DROP TABLE IF EXISTS slots").execute(pool).await?;

    info!("Database schema dropped.");
    Ok(())
}
