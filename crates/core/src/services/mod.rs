pub mod bookings;
pub mod orchestrator;
pub mod slots;
pub mod sweeper;

use std::sync::Arc;

pub use bookings::BookingStore;
pub use orchestrator::BookingOrchestrator;
pub use slots::SlotStore;
pub use sweeper::Sweeper;

use crate::{clock::Clock, policy::BookingPolicy, store::BookingStorage};

/// Every service of the booking core, wired onto one storage handle and clock.
#[derive(Clone)]
pub struct Services {
    pub slots: SlotStore,
    pub bookings: BookingStore,
    pub sweeper: Sweeper,
    pub orchestrator: BookingOrchestrator,
}

impl Services {
    pub fn new(storage: Arc<dyn BookingStorage>, clock: Arc<dyn Clock>, policy: BookingPolicy) -> Self {
        let slots = SlotStore::new(storage.clone(), clock.clone());
        let bookings = BookingStore::new(storage.clone(), clock.clone(), policy);
        let sweeper = Sweeper::new(storage.clone(), clock);
        let orchestrator =
            BookingOrchestrator::new(storage, slots.clone(), bookings.clone(), sweeper.clone());

        Self {
            slots,
            bookings,
            sweeper,
            orchestrator,
        }
    }
}
