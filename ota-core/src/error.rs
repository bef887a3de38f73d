//! Failure taxonomy for one check/install cycle.
//!
//! Everything here is non-fatal to the process: a failed cycle ends with the
//! previously active image still selected for boot, and a later cycle is
//! free to retry.

use std::fmt;

use crate::manifest::ManifestError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// Connect failure, timeout, or unexpected HTTP status.
    Network(String),
    /// Declared content length missing, non-positive, or over the ceiling.
    InvalidLength(i64),
    /// Receive buffer of the declared size could not be reserved.
    Allocation(usize),
    /// Manifest body ended before the declared length was received.
    ShortRead { expected: usize, received: usize },
    /// Manifest could not be decoded.
    Manifest(ManifestError),
    /// The inactive slot could not be prepared for the declared image size.
    InstallBegin(String),
    /// I/O failure while writing the image stream into the slot.
    Write(String),
    /// Image stream ended with fewer bytes than declared; slot not committed.
    IncompleteTransfer { expected: usize, written: usize },
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(detail) => write!(f, "network error: {}", detail),
            Self::InvalidLength(declared) => {
                write!(f, "invalid declared content length: {}", declared)
            }
            Self::Allocation(size) => {
                write!(f, "could not reserve {} byte receive buffer", size)
            }
            Self::ShortRead { expected, received } => {
                write!(f, "short read: expected {} bytes, received {}", expected, received)
            }
            Self::Manifest(err) => write!(f, "{}", err),
            Self::InstallBegin(detail) => {
                write!(f, "could not begin install: {}", detail)
            }
            Self::Write(detail) => write!(f, "flash write failed: {}", detail),
            Self::IncompleteTransfer { expected, written } => {
                write!(
                    f,
                    "incomplete transfer: expected {} bytes, wrote {}",
                    expected, written
                )
            }
        }
    }
}

impl std::error::Error for UpdateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Manifest(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ManifestError> for UpdateError {
    fn from(err: ManifestError) -> Self {
        Self::Manifest(err)
    }
}
