//! Periodic expiry of stale registrations.

use crate::manager::RegistrationManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Drives [`RegistrationManager::remove_old_registrations`] on a fixed cadence.
pub struct ExpirySweeper {
    manager: Arc<RegistrationManager>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(manager: Arc<RegistrationManager>, interval: Duration) -> Self {
        Self { manager, interval }
    }

    /// Run a single sweep. Returns the number of registrations evicted.
    pub async fn sweep_once(&self) -> usize {
        let evicted = self.manager.remove_old_registrations().await;
        if evicted > 0 {
            info!(
                "Expired {} registrations, {} remain",
                evicted,
                self.manager.registration_count().await
            );
        } else {
            debug!("No registrations expired this cycle");
        }
        evicted
    }

    /// Sweep forever, sleeping `interval` between cycles.
    pub async fn run(&self) {
        info!(
            "Starting expiry sweeper, interval: {:?}, retention: {:?}",
            self.interval,
            self.manager.table().retention()
        );

        loop {
            tokio::time::sleep(self.interval).await;
            self.sweep_once().await;
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Spawn the expiry sweeper as a background task.
pub fn spawn_expiry_sweeper(
    manager: Arc<RegistrationManager>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    let sweeper = ExpirySweeper::new(manager, interval);

    tokio::spawn(async move {
        sweeper.run().await;
    })
}
