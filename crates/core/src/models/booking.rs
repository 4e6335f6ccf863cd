use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::slot::SlotStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Active,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Active => "ACTIVE",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }

    /// Cancelled and completed bookings accept no further lifecycle transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Active)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(BookingStatus::Active),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "COMPLETED" => Ok(BookingStatus::Completed),
            other => Err(format!("unknown booking status '{}'", other)),
        }
    }
}

/// A student's claim on exactly one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub student_id: Uuid,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(slot_id: Uuid, student_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            slot_id,
            student_id,
            status: BookingStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A booking joined with the slot it claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub student_id: Uuid,
    pub status: BookingStatus,
    pub tutor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_status: SlotStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingFilter {
    pub student_id: Option<Uuid>,
    pub tutor_id: Option<Uuid>,
    pub slot_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
}

/// Narrows which bookings a sweep pass looks at. The default covers everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepScope {
    pub student_id: Option<Uuid>,
    pub tutor_id: Option<Uuid>,
    pub slot_id: Option<Uuid>,
}

impl SweepScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn student(student_id: Uuid) -> Self {
        Self {
            student_id: Some(student_id),
            ..Self::default()
        }
    }

    pub fn tutor(tutor_id: Uuid) -> Self {
        Self {
            tutor_id: Some(tutor_id),
            ..Self::default()
        }
    }
}

impl From<&BookingFilter> for SweepScope {
    fn from(filter: &BookingFilter) -> Self {
        Self {
            student_id: filter.student_id,
            tutor_id: filter.tutor_id,
            slot_id: filter.slot_id,
        }
    }
}

/// Per-student booking counters consumed by the badge evaluator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: Uuid,
    pub total: u64,
    pub active: u64,
    pub completed: u64,
    pub cancelled: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEligibility {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub eligible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub slot_id: Uuid,
    /// Only honoured for admins booking on behalf of a student.
    pub student_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBookingRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    pub booking_id: Uuid,
    pub booking: Booking,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBookingResponse {
    pub booking: Booking,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBookingsResponse {
    pub bookings: Vec<BookingDetails>,
}
