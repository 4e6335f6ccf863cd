pub mod actor;
pub mod booking;
pub mod slot;

pub use actor::{Actor, Role};
pub use booking::{
    Booking, BookingDetails, BookingFilter, BookingStatus, ReviewEligibility, StudentSummary,
    SweepScope,
};
pub use slot::{Slot, SlotFilter, SlotStatus};
