use std::sync::Arc;
use tracing::{debug, info};

use crate::{clock::Clock, errors::BookingResult, models::SweepScope, store::BookingStorage};

/// Read-time reconciliation of bookings whose slot has already ended.
///
/// There is no background job: list reads call [`Sweeper::sweep_completed`]
/// before they query. A pass is a single conditional update, so running it
/// twice, or from two requests at once, leaves the same state as running it
/// once. Cancelled bookings never match.
#[derive(Clone)]
pub struct Sweeper {
    storage: Arc<dyn BookingStorage>,
    clock: Arc<dyn Clock>,
}

impl Sweeper {
    pub fn new(storage: Arc<dyn BookingStorage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    pub async fn sweep_completed(&self, scope: &SweepScope) -> BookingResult<u64> {
        let now = self.clock.now();
        let completed = self.storage.complete_ended_bookings(scope, now).await?;
        if completed > 0 {
            info!("Marked {} ended booking(s) as completed", completed);
        } else {
            debug!("Sweep at {} found nothing to complete", now);
        }
        Ok(completed)
    }
}
