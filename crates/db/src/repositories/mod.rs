//! Query functions, generic over the executor so the same statement runs
//! against the pool or inside an open transaction.

pub mod bookings;
pub mod slots;
