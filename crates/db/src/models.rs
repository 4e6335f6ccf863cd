use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use eyre::{Report, eyre};
use serde::{Deserialize, Serialize};
use slotbook_core::models::{Booking, BookingDetails, Slot};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSlot {
    pub id: Uuid,
    pub tutor_id: Uuid,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbBooking {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub student_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A booking row joined with the columns of its slot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbBookingDetails {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub student_id: Uuid,
    pub status: String,
    pub tutor_id: Uuid,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbSlot> for Slot {
    type Error = Report;

    fn try_from(row: DbSlot) -> Result<Self, Self::Error> {
        Ok(Slot {
            id: row.id,
            tutor_id: row.tutor_id,
            date: row.slot_date,
            start_time: row.start_time,
            end_time: row.end_time,
            status: row.status.parse().map_err(|e: String| eyre!(e))?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<DbBooking> for Booking {
    type Error = Report;

    fn try_from(row: DbBooking) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            slot_id: row.slot_id,
            student_id: row.student_id,
            status: row.status.parse().map_err(|e: String| eyre!(e))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<DbBookingDetails> for BookingDetails {
    type Error = Report;

    fn try_from(row: DbBookingDetails) -> Result<Self, Self::Error> {
        Ok(BookingDetails {
            id: row.id,
            slot_id: row.slot_id,
            student_id: row.student_id,
            status: row.status.parse().map_err(|e: String| eyre!(e))?,
            tutor_id: row.tutor_id,
            date: row.slot_date,
            start_time: row.start_time,
            end_time: row.end_time,
            slot_status: row.slot_status.parse().map_err(|e: String| eyre!(e))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use slotbook_core::models::{BookingStatus, SlotStatus};

    #[test]
    fn converts_slot_rows() {
        let row = DbSlot {
            id: Uuid::new_v4(),
            tutor_id: Uuid::new_v4(),
            slot_date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            status: "BOOKED".to_string(),
            created_at: Utc::now(),
        };
        let slot = Slot::try_from(row.clone()).unwrap();
        assert_eq!(slot.id, row.id);
        assert_eq!(slot.date, row.slot_date);
        assert_eq!(slot.status, SlotStatus::Booked);
    }

    #[test]
    fn rejects_unknown_status() {
        let now = Utc::now();
        let row = DbBooking {
            id: Uuid::new_v4(),
            slot_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            status: "PENDING".to_string(),
            created_at: now,
            updated_at: now,
        };
        assert!(Booking::try_from(row.clone()).is_err());

        let ok = DbBooking {
            status: "COMPLETED".to_string(),
            ..row
        };
        assert_eq!(Booking::try_from(ok).unwrap().status, BookingStatus::Completed);
    }
}
