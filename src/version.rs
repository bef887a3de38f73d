// Centralized version information

// The compiled-in firmware version the update decision compares against.
// Kept in lockstep with the Cargo package version so the manifest, the
// running image, and the status report all agree on one identity.
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

// Full version string for the boot banner
pub fn full_version() -> String {
    format!("v{}", FIRMWARE_VERSION)
}
