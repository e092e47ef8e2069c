// Completion sweeper: moves scheduled reservations whose interval has
// ended into the done state, so the lifecycle converges without anyone
// calling `mark_done` by hand.

use std::sync::Arc;

use crate::clock::Clock;
use crate::coordinator::BookingCoordinator;
use crate::error::BookingError;
use crate::reservations::ReservationRepository;

pub struct CompletionSweeper {
    coordinator: Arc<BookingCoordinator>,
    reservations: Arc<dyn ReservationRepository>,
    clock: Arc<dyn Clock>,
    sweep_interval: std::time::Duration,
}

impl CompletionSweeper {
    pub fn new(
        coordinator: Arc<BookingCoordinator>,
        reservations: Arc<dyn ReservationRepository>,
        clock: Arc<dyn Clock>,
        sweep_interval: std::time::Duration,
    ) -> Self {
        Self {
            coordinator,
            reservations,
            clock,
            sweep_interval,
        }
    }

    /// One sweep pass; returns how many reservations were marked done.
    /// A failure on one reservation is logged and does not stop the pass.
    pub async fn run_once(&self) -> Result<usize, BookingError> {
        let cutoff = self.clock.now();
        let ended = self
            .reservations
            .find_scheduled_ending_before(cutoff)
            .await?;

        let mut completed = 0;
        for reservation in ended {
            match self.coordinator.mark_done(reservation.id).await {
                Ok(_) => completed += 1,
                // Lost a race with a concurrent cancel or an earlier
                // sweep; nothing to do for this one.
                Err(BookingError::InvalidTransition(_)) => {}
                Err(err) => {
                    tracing::warn!(
                        "Sweep failed to complete reservation {}: {}",
                        reservation.id,
                        err
                    );
                }
            }
        }

        if completed > 0 {
            tracing::info!("Sweep marked {} reservation(s) done", completed);
        }
        self.coordinator.evict_idle();
        Ok(completed)
    }

    /// Run sweep passes forever at the configured interval.
    /// Intended to be spawned as a background task.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(err) = self.run_once().await {
                tracing::warn!("Sweep pass failed: {}", err);
            }
        }
    }
}
