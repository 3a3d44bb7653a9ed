//! In-memory registration table with time-ordered expiry.

use super::PhantomRegistration;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// How long a registration stays valid after its latest write.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(5 * 60);

/// Live table slot: the registration plus the instant of its latest write.
struct Slot {
    registration: Arc<PhantomRegistration>,
    registered_at: Instant,
}

#[derive(Default)]
struct Inner {
    /// Registrations keyed by phantom address string
    by_address: HashMap<String, Slot>,
    /// (address, write instant) in append order
    expiry_queue: VecDeque<(String, Instant)>,
}

/// Concurrency-safe set of currently valid registrations.
///
/// Map and expiry queue sit behind one reader/writer lock so that every
/// operation observes both in a consistent state. The queue is append-only,
/// so its timestamps are non-decreasing and a sweep can stop at the first
/// entry that is still young.
///
/// A re-registered address leaves its older queue entry behind. The sweep
/// only evicts an address when the slot's own latest write is past the
/// cutoff, so a stale entry never removes a fresher registration.
pub struct RegistrationTable {
    inner: RwLock<Inner>,
    retention: Duration,
}

impl Default for RegistrationTable {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl RegistrationTable {
    /// Create an empty table.
    pub fn new(retention: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Insert or replace the registration for `address`.
    pub async fn register(&self, address: &IpAddr, registration: Arc<PhantomRegistration>) {
        self.register_at(address, registration, Instant::now()).await
    }

    /// [`register`](Self::register) with an explicit write instant.
    ///
    /// Callers must supply non-decreasing instants.
    pub async fn register_at(
        &self,
        address: &IpAddr,
        registration: Arc<PhantomRegistration>,
        now: Instant,
    ) {
        let key = address.to_string();
        let mut inner = self.inner.write().await;

        inner.by_address.insert(
            key.clone(),
            Slot {
                registration,
                registered_at: now,
            },
        );
        inner.expiry_queue.push_back((key, now));
    }

    /// Look up the live registration for `address`.
    pub async fn check_registration(&self, address: &IpAddr) -> Option<Arc<PhantomRegistration>> {
        let inner = self.inner.read().await;
        inner
            .by_address
            .get(&address.to_string())
            .map(|slot| Arc::clone(&slot.registration))
    }

    /// Evict every registration whose latest write is older than the
    /// retention window. Returns the number evicted.
    pub async fn remove_old_registrations(&self) -> usize {
        self.remove_old_registrations_at(Instant::now()).await
    }

    /// [`remove_old_registrations`](Self::remove_old_registrations) against
    /// an explicit clock reading.
    pub async fn remove_old_registrations_at(&self, now: Instant) -> usize {
        // Nothing can be older than the retention window yet.
        let Some(cutoff) = now.checked_sub(self.retention) else {
            return 0;
        };

        let mut inner = self.inner.write().await;
        let mut evicted = 0;
        let mut stale = 0;

        while let Some((_, queued_at)) = inner.expiry_queue.front() {
            if *queued_at > cutoff {
                break;
            }
            let Some((address, _)) = inner.expiry_queue.pop_front() else {
                break;
            };

            let expired = inner
                .by_address
                .get(&address)
                .is_some_and(|slot| slot.registered_at <= cutoff);

            if expired {
                inner.by_address.remove(&address);
                evicted += 1;
            } else {
                stale += 1;
            }
        }

        if evicted > 0 || stale > 0 {
            debug!(
                "Expired {} registrations, dropped {} stale queue entries ({} live)",
                evicted,
                stale,
                inner.by_address.len()
            );
        }

        evicted
    }

    /// Number of live registrations.
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_address.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.by_address.is_empty()
    }

    /// Number of pending expiry queue entries, stale ones included.
    pub async fn queued(&self) -> usize {
        self.inner.read().await.expiry_queue.len()
    }
}
