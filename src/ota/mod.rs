// Over-the-air update plumbing: ESP-IDF implementations of the ota-core
// collaborator traits, plus the boot-time validation guard.
//
// Update flow:
// 1. Fetch manifest and decide (ota-core orchestrator)
// 2. Stream the image into the inactive slot
// 3. Verify length, commit the slot as next boot target
// 4. Restart; the next boot confirms the image or the boot loader rolls back

pub mod boot_guard;
pub mod fetcher;
pub mod installer;

pub use fetcher::EspManifestFetcher;
pub use installer::EspFirmwareInstaller;
