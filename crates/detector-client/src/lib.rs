//! Client for the detector's registration pub/sub channel.

mod client;
mod error;

pub use client::{phantom_payload, DetectorClient, DEFAULT_PUBLISH_TIMEOUT, DETECTOR_REG_CHANNEL};
pub use error::DetectorError;
