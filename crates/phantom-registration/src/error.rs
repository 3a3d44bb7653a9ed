//! Error types for the registration core.

use std::time::Duration;
use thiserror::Error;

/// Registration core errors.
///
/// Table lookups never fail; absence is `None`, not an error.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The address-selection oracle could not produce a phantom.
    #[error("Failed to select phantom address: {0}")]
    AddressSelectionFailed(String),

    /// No probe reported back within the statistical window.
    #[error("Reached statistical timeout {} ms", .0.as_millis())]
    ProbeTimeout(Duration),

    /// A probe completed with a definite network failure before the deadline.
    #[error("Phantom dial failed: {0}")]
    ProbeDialError(#[source] std::io::Error),

    /// Best-effort detector notification failed. Logged, never returned
    /// from the registration path.
    #[error("Detector notification failed: {0}")]
    DetectorNotifyFailed(String),
}

impl From<detector_client::DetectorError> for RegistrationError {
    fn from(e: detector_client::DetectorError) -> Self {
        RegistrationError::DetectorNotifyFailed(e.to_string())
    }
}

/// Result alias for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;
