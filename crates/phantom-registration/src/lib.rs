//! Phantom registration core for the rendezvous station.
//!
//! Tracks which phantom addresses currently carry a registration, checks
//! phantom reachability with a statistical TCP probe, and expires stale
//! registrations:
//! - [`RegistrationManager`] builds registrations and publishes them
//! - [`RegistrationTable`] is the only shared mutable state
//! - [`LivenessProber`] decides reachability within a fixed time budget

pub mod config;
pub mod error;
pub mod liveness;
pub mod manager;
pub mod notify;
pub mod registration;
pub mod selector;
pub mod sweeper;
pub mod telemetry;

pub use config::Config;
pub use error::{RegistrationError, RegistrationResult};
pub use liveness::LivenessProber;
pub use manager::RegistrationManager;
pub use notify::{DetectorNotifier, NoopNotifier};
pub use registration::{
    digest_of, id_of, ClientParams, PhantomRegistration, RegistrationFlags, RegistrationTable,
    SharedKeys,
};
pub use selector::AddressSelector;
pub use sweeper::{spawn_expiry_sweeper, ExpirySweeper};

use detector_client::DetectorClient;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Registration core wired from configuration.
///
/// Owns the background expiry sweeper; dropping the station stops it.
pub struct Station {
    pub manager: Arc<RegistrationManager>,
    /// Shared with the manager, for the relay path's lookups
    pub table: Arc<RegistrationTable>,
    pub prober: LivenessProber,
    sweeper: JoinHandle<()>,
}

impl Station {
    /// Build the table, notifier, manager and prober, and start sweeping
    /// expired registrations every `registry.sweep_interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_config(config: &Config, selector: Arc<dyn AddressSelector>) -> anyhow::Result<Self> {
        let notifier: Arc<dyn DetectorNotifier> = if config.detector.enabled {
            Arc::new(
                DetectorClient::new(&config.detector.url, config.detector.channel.clone())?
                    .with_timeout(config.detector.timeout),
            )
        } else {
            tracing::info!("Detector notifications disabled");
            Arc::new(NoopNotifier)
        };

        let table = Arc::new(RegistrationTable::new(config.registry.retention));
        let manager = Arc::new(RegistrationManager::new(
            selector,
            notifier,
            Arc::clone(&table),
        ));
        let sweeper = spawn_expiry_sweeper(Arc::clone(&manager), config.registry.sweep_interval);

        Ok(Self {
            manager,
            table,
            prober: LivenessProber::from_config(&config.probe),
            sweeper,
        })
    }
}

impl Drop for Station {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}
