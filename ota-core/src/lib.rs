//! OTA Core - hardware-independent update logic for the ESP32 OTA agent
//!
//! Everything that decides whether and how to update lives here so it can be
//! tested on the host platform without ESP32 hardware. The firmware crate
//! supplies the network and flash sides through the collaborator traits in
//! [`orchestrator`].

pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod status;
pub mod version;

pub use error::UpdateError;
pub use manifest::{Manifest, ManifestError};
pub use orchestrator::{CycleOutcome, FirmwareInstall, ManifestFetch, Orchestrator, Restart};
pub use status::{SharedStatus, UpdateStatus};
pub use version::VersionCmp;
