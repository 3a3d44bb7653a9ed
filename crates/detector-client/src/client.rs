//! Pub/sub client for the detector registration channel.

use crate::error::DetectorError;
use redis::AsyncCommands;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tracing::{debug, instrument};

/// Channel the detector subscribes to for new phantom addresses.
pub const DETECTOR_REG_CHANNEL: &str = "dark_decoy_map";

/// Upper bound on connecting to the detector and publishing one message.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

/// Client that announces registered phantoms to the detector.
///
/// Every publish opens a fresh connection and drops it afterwards; the
/// detector sees at most a handful of registrations per second, so there is
/// no connection pool to keep warm.
#[derive(Clone, Debug)]
pub struct DetectorClient {
    client: redis::Client,
    channel: String,
    timeout: Duration,
}

impl DetectorClient {
    /// Create a client for the given pub/sub URL and channel.
    pub fn new(url: &str, channel: impl Into<String>) -> Result<Self, DetectorError> {
        let client =
            redis::Client::open(url).map_err(|e| DetectorError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            client,
            channel: channel.into(),
            timeout: DEFAULT_PUBLISH_TIMEOUT,
        })
    }

    /// Replace the connect-and-publish timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a client publishing on the default registration channel.
    pub fn from_url(url: &str) -> Result<Self, DetectorError> {
        Self::new(url, DETECTOR_REG_CHANNEL)
    }

    /// Channel this client publishes on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Publish a phantom IPv4 address as its 4 raw network-order octets.
    ///
    /// Gives up after the client timeout so an unresponsive detector never
    /// pins the caller.
    #[instrument(skip(self))]
    pub async fn publish_phantom(&self, phantom: Ipv4Addr) -> Result<(), DetectorError> {
        tokio::time::timeout(self.timeout, self.publish_octets(phantom))
            .await
            .map_err(|_| {
                DetectorError::Connection(format!("no response within {:?}", self.timeout))
            })?
    }

    async fn publish_octets(&self, phantom: Ipv4Addr) -> Result<(), DetectorError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| DetectorError::Connection(e.to_string()))?;

        let payload = phantom.octets();
        let receivers: i64 = conn
            .publish(&self.channel, &payload[..])
            .await
            .map_err(|e| DetectorError::Publish(e.to_string()))?;

        debug!(
            "Published {} ({}) to {} subscribers",
            phantom,
            hex::encode(payload),
            receivers
        );
        Ok(())
    }
}

/// Wire form of a phantom address on the detector channel.
///
/// The detector only tracks IPv4 phantoms, so IPv6 addresses have no payload.
pub fn phantom_payload(phantom: &IpAddr) -> Option<[u8; 4]> {
    match phantom {
        IpAddr::V4(v4) => Some(v4.octets()),
        IpAddr::V6(_) => None,
    }
}
