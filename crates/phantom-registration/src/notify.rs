//! Detector notification for new registrations.

use crate::error::RegistrationResult;
use crate::registration::PhantomRegistration;
use async_trait::async_trait;
use detector_client::{phantom_payload, DetectorClient};
use std::net::Ipv4Addr;
use tracing::debug;

/// Tells the detector about a freshly added registration.
#[async_trait]
pub trait DetectorNotifier: Send + Sync {
    async fn notify(&self, registration: &PhantomRegistration) -> RegistrationResult<()>;
}

#[async_trait]
impl DetectorNotifier for DetectorClient {
    async fn notify(&self, registration: &PhantomRegistration) -> RegistrationResult<()> {
        let Some(octets) = phantom_payload(&registration.phantom()) else {
            debug!(
                "Phantom {} is IPv6, not announced to detector",
                registration.phantom()
            );
            return Ok(());
        };

        self.publish_phantom(Ipv4Addr::from(octets)).await?;
        Ok(())
    }
}

/// Notifier used when the detector is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl DetectorNotifier for NoopNotifier {
    async fn notify(&self, _registration: &PhantomRegistration) -> RegistrationResult<()> {
        Ok(())
    }
}
