use thiserror::Error;
use uuid::Uuid;

/// Failures reported by a storage engine.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write, usually a lost race.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Storage backend error: {0}")]
    Backend(#[from] eyre::Report),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Coarse failure classes exposed at the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Forbidden,
    Internal,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    #[error("End time must be after start time")]
    InvalidInterval,

    #[error("Slot must start in the future")]
    SlotInPast,

    #[error("Slot overlaps an existing slot of this tutor")]
    SlotOverlap,

    #[error("Slot {0} not found")]
    SlotNotFound(Uuid),

    #[error("Booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("Slot is not available for booking")]
    SlotNotClaimable,

    #[error("Slot is already booked")]
    SlotAlreadyBooked,

    #[error("Only free slots can be deleted")]
    SlotNotDeletable,

    #[error("Bookings can only be cancelled at least {cutoff_hours} hours before the start")]
    CancellationWindowClosed { cutoff_hours: i64 },

    #[error("Booking is already cancelled or completed")]
    BookingAlreadyTerminal,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::InvalidTimeFormat(_)
            | BookingError::InvalidInterval
            | BookingError::SlotInPast
            | BookingError::Validation(_) => ErrorKind::Validation,
            BookingError::SlotNotFound(_) | BookingError::BookingNotFound(_) => ErrorKind::NotFound,
            BookingError::SlotOverlap
            | BookingError::SlotNotClaimable
            | BookingError::SlotAlreadyBooked
            | BookingError::SlotNotDeletable
            | BookingError::CancellationWindowClosed { .. }
            | BookingError::BookingAlreadyTerminal => ErrorKind::Conflict,
            BookingError::Forbidden(_) => ErrorKind::Forbidden,
            // A race that slipped past the orchestrator is still a conflict
            BookingError::Storage(StoreError::UniqueViolation(_)) => ErrorKind::Conflict,
            BookingError::Storage(StoreError::Backend(_)) => ErrorKind::Internal,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        BookingError::Forbidden(message.into())
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
