use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::time_window::TimeWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    Free,
    Booked,
    Cancelled,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Free => "FREE",
            SlotStatus::Booked => "BOOKED",
            SlotStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FREE" => Ok(SlotStatus::Free),
            "BOOKED" => Ok(SlotStatus::Booked),
            "CANCELLED" => Ok(SlotStatus::Cancelled),
            other => Err(format!("unknown slot status '{}'", other)),
        }
    }
}

/// A bookable interval published by one tutor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: Uuid,
    pub tutor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: SlotStatus,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    /// Builds a fresh `FREE` slot for `tutor_id` covering `window`.
    pub fn new(tutor_id: Uuid, window: TimeWindow) -> Self {
        Self {
            id: Uuid::new_v4(),
            tutor_id,
            date: window.date,
            start_time: window.start,
            end_time: window.end,
            status: SlotStatus::Free,
            created_at: Utc::now(),
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            date: self.date,
            start: self.start_time,
            end: self.end_time,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotFilter {
    pub tutor_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<SlotStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlotRequest {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    /// Only honoured for admins publishing on behalf of a tutor.
    pub tutor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlotResponse {
    pub slot_id: Uuid,
    pub slot: Slot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSlotResponse {
    pub slot: Slot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSlotsResponse {
    pub slots: Vec<Slot>,
}
