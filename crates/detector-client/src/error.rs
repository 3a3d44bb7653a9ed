//! Detector client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Invalid detector URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),
}
