//! Registration manager: builds, publishes and tracks phantom registrations.

use crate::error::{RegistrationError, RegistrationResult};
use crate::notify::DetectorNotifier;
use crate::registration::{
    ClientParams, PhantomRegistration, RegistrationFlags, RegistrationTable, SharedKeys,
};
use crate::selector::AddressSelector;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Façade over the registration table, the address selector and the
/// detector notifier.
pub struct RegistrationManager {
    table: Arc<RegistrationTable>,
    selector: Arc<dyn AddressSelector>,
    notifier: Arc<dyn DetectorNotifier>,
}

impl RegistrationManager {
    /// Create a manager over an existing table.
    pub fn new(
        selector: Arc<dyn AddressSelector>,
        notifier: Arc<dyn DetectorNotifier>,
        table: Arc<RegistrationTable>,
    ) -> Self {
        Self {
            table,
            selector,
            notifier,
        }
    }

    pub fn table(&self) -> &Arc<RegistrationTable> {
        &self.table
    }

    /// Build a registration from handshake output.
    ///
    /// The result is not visible to lookups until passed to
    /// [`add_registration`](Self::add_registration).
    #[instrument(skip_all, fields(generation = params.decoy_list_generation))]
    pub fn new_registration(
        &self,
        params: &ClientParams,
        keys: SharedKeys,
        flags: RegistrationFlags,
    ) -> RegistrationResult<PhantomRegistration> {
        let phantom = self
            .selector
            .select(
                keys.phantom_seed(),
                params.decoy_list_generation,
                params.v6_support,
            )
            .map_err(|e| RegistrationError::AddressSelectionFailed(e.to_string()))?;

        let registration = PhantomRegistration::new(
            phantom,
            keys,
            params.covert_address.clone(),
            params.masked_decoy_server_name.clone(),
            flags,
        );

        debug!(
            "Selected phantom {} for registration {}",
            phantom,
            registration.id_string()
        );
        Ok(registration)
    }

    /// Announce the registration to the detector and make it visible.
    ///
    /// The announcement runs as a detached task; its failure is logged and
    /// never affects the table.
    pub async fn add_registration(&self, registration: Arc<PhantomRegistration>) {
        let notifier = Arc::clone(&self.notifier);
        let announced = Arc::clone(&registration);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&announced).await {
                warn!(
                    "Failed to notify detector of {} ({}): {}",
                    announced.phantom(),
                    announced.id_string(),
                    e
                );
            }
        });

        let phantom = registration.phantom();
        let id = registration.id_string();
        self.table.register(&phantom, registration).await;

        info!("Registered phantom {} ({})", phantom, id);
    }

    /// Look up the live registration for a phantom address.
    pub async fn check_registration(&self, phantom: &IpAddr) -> Option<Arc<PhantomRegistration>> {
        self.table.check_registration(phantom).await
    }

    /// Drop registrations older than the table's retention window.
    pub async fn remove_old_registrations(&self) -> usize {
        self.table.remove_old_registrations().await
    }

    /// Number of live registrations.
    pub async fn registration_count(&self) -> usize {
        self.table.len().await
    }
}
