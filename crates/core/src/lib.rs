//! # SlotBook Core
//!
//! Domain types and the booking state machine for the SlotBook tutoring
//! service. Everything here is storage-agnostic: services talk to a
//! [`store::BookingStorage`] handle and never to a concrete database.
//!
//! ## Layout
//!
//! - **time_window**: naive local date/time arithmetic for slot windows
//! - **clock**: injectable source of "now"
//! - **policy**: booking policy configuration and authorization predicates
//! - **store**: unit-of-work traits plus an in-memory engine
//! - **services**: slot store, booking store, sweeper and orchestrator

pub mod clock;
pub mod errors;
pub mod models;
pub mod policy;
pub mod services;
pub mod store;
pub mod time_window;
