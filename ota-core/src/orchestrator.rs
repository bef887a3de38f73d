//! The update-decision state machine.
//!
//! One cycle: fetch manifest, parse, compare, and on an upgrade stream the
//! image into the inactive slot and restart. Every failure before the slot
//! commit is non-fatal: the cycle ends, the previous image stays selected
//! for boot, and a later cycle is free to retry.

use crate::error::UpdateError;
use crate::manifest::{self, Manifest};
use crate::status::SharedStatus;
use crate::version::{self, VersionCmp};

/// Fetches the raw manifest document from its configured location.
/// All-or-nothing: on failure no partial body is exposed.
pub trait ManifestFetch {
    fn fetch_manifest(&mut self) -> Result<Vec<u8>, UpdateError>;
}

/// Streams a firmware image from `url` into the inactive slot and commits it
/// as the next boot target. Returns `Ok` only after the slot is committed; a
/// committed image still needs the restart to take effect.
pub trait FirmwareInstall {
    fn install(&mut self, url: &str) -> Result<(), UpdateError>;
}

/// Device restart. The on-device implementation does not return.
pub trait Restart {
    fn restart(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    Idle,
    Checking,
    Installing,
}

/// What one check/install cycle concluded.
#[derive(Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Remote version equals the running version.
    UpToDate,
    /// Remote manifest offers an older version; refused.
    DowngradeRefused(String),
    /// Fetch or parse failed before a decision could be made.
    CheckFailed(UpdateError),
    /// An upgrade was found but the install did not complete. The previous
    /// slot remains the boot target and the update stays advertised.
    InstallFailed(UpdateError),
    /// The image was committed and the restart was issued.
    Rebooting,
    /// Another cycle is already running; this trigger was a no-op.
    Busy,
}

/// Owns the one piece of shared mutable state (the update status) and
/// sequences fetch, parse, compare, install, and restart. At most one cycle
/// is active at a time; a trigger arriving mid-cycle reports [`CycleOutcome::Busy`].
pub struct Orchestrator<F, I, R> {
    fetcher: F,
    installer: I,
    restarter: R,
    status: SharedStatus,
    state: CycleState,
}

impl<F, I, R> Orchestrator<F, I, R>
where
    F: ManifestFetch,
    I: FirmwareInstall,
    R: Restart,
{
    pub fn new(fetcher: F, installer: I, restarter: R, status: SharedStatus) -> Self {
        Self {
            fetcher,
            installer,
            restarter,
            status,
            state: CycleState::Idle,
        }
    }

    pub fn status(&self) -> SharedStatus {
        SharedStatus::clone(&self.status)
    }

    pub fn is_busy(&self) -> bool {
        self.state != CycleState::Idle
    }

    /// Run one full check/install cycle.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        if self.state != CycleState::Idle {
            log::warn!("Update cycle already in progress, ignoring trigger");
            return CycleOutcome::Busy;
        }
        self.state = CycleState::Checking;
        let outcome = self.check_and_apply();
        self.state = CycleState::Idle;
        outcome
    }

    fn check_and_apply(&mut self) -> CycleOutcome {
        let body = match self.fetcher.fetch_manifest() {
            Ok(body) => body,
            Err(err) => {
                log::warn!("Manifest fetch failed: {}", err);
                return CycleOutcome::CheckFailed(err);
            }
        };

        let manifest = match manifest::parse_manifest(&body) {
            Ok(manifest) => manifest,
            Err(err) => {
                log::warn!("Manifest rejected: {}", err);
                return CycleOutcome::CheckFailed(err.into());
            }
        };

        let current = self.status.lock().unwrap().current_version.clone();
        match version::compare(&current, &manifest.version) {
            VersionCmp::NoChange => {
                log::info!("Already running latest version: {}", current);
                self.status.lock().unwrap().latest_known_version = manifest.version;
                CycleOutcome::UpToDate
            }
            VersionCmp::Downgrade => {
                log::warn!(
                    "Manifest offers older version {} (current {}), refusing",
                    manifest.version,
                    current
                );
                CycleOutcome::DowngradeRefused(manifest.version)
            }
            VersionCmp::Upgrade => {
                log::info!(
                    "New version available: {} (current: {})",
                    manifest.version,
                    current
                );
                self.apply(manifest)
            }
        }
    }

    fn apply(&mut self, manifest: Manifest) -> CycleOutcome {
        // Record the finding before the install attempt so the status
        // reflects the real manifest state even if the install fails.
        {
            let mut status = self.status.lock().unwrap();
            status.latest_known_version = manifest.version.clone();
            status.update_available = true;
        }

        self.state = CycleState::Installing;
        match self.installer.install(&manifest.firmware_url) {
            Ok(()) => {
                log::info!("Firmware {} committed, restarting", manifest.version);
                self.restarter.restart();
                CycleOutcome::Rebooting
            }
            Err(err) => {
                log::error!("Install failed: {}; previous image stays active", err);
                CycleOutcome::InstallFailed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{self, UpdateStatus};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct ScriptedFetcher {
        responses: VecDeque<Result<Vec<u8>, UpdateError>>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<Vec<u8>, UpdateError>>) -> Self {
            Self {
                responses: responses.into(),
            }
        }

        fn body(body: &[u8]) -> Self {
            Self::new(vec![Ok(body.to_vec())])
        }
    }

    impl ManifestFetch for ScriptedFetcher {
        fn fetch_manifest(&mut self) -> Result<Vec<u8>, UpdateError> {
            self.responses
                .pop_front()
                .expect("fetcher called more times than scripted")
        }
    }

    /// Records each install call together with a status snapshot taken at
    /// call time, so tests can assert the status was written first.
    struct RecordingInstaller {
        watch: SharedStatus,
        calls: Arc<Mutex<Vec<(String, UpdateStatus)>>>,
        fail_with: Option<UpdateError>,
    }

    impl FirmwareInstall for RecordingInstaller {
        fn install(&mut self, url: &str) -> Result<(), UpdateError> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), status::snapshot(&self.watch)));
            match self.fail_with.take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    struct FlagRestart(Arc<AtomicBool>);

    impl Restart for FlagRestart {
        fn restart(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    struct Harness {
        status: SharedStatus,
        installs: Arc<Mutex<Vec<(String, UpdateStatus)>>>,
        restarted: Arc<AtomicBool>,
    }

    fn agent(
        current: &str,
        fetcher: ScriptedFetcher,
        install_failure: Option<UpdateError>,
    ) -> (
        Orchestrator<ScriptedFetcher, RecordingInstaller, FlagRestart>,
        Harness,
    ) {
        let shared = status::shared(current);
        let installs = Arc::new(Mutex::new(Vec::new()));
        let restarted = Arc::new(AtomicBool::new(false));
        let installer = RecordingInstaller {
            watch: SharedStatus::clone(&shared),
            calls: Arc::clone(&installs),
            fail_with: install_failure,
        };
        let orchestrator = Orchestrator::new(
            fetcher,
            installer,
            FlagRestart(Arc::clone(&restarted)),
            SharedStatus::clone(&shared),
        );
        (
            orchestrator,
            Harness {
                status: shared,
                installs,
                restarted,
            },
        )
    }

    #[test]
    fn equal_version_is_up_to_date_and_does_not_install() {
        let body = br#"{"version":"1.0.2","firmware_url":"https://example/fw.bin"}"#;
        let (mut orchestrator, harness) = agent("1.0.2", ScriptedFetcher::body(body), None);

        assert_eq!(orchestrator.run_cycle(), CycleOutcome::UpToDate);

        let status = status::snapshot(&harness.status);
        assert!(!status.update_available);
        assert_eq!(status.latest_known_version, "1.0.2");
        assert!(harness.installs.lock().unwrap().is_empty());
        assert!(!harness.restarted.load(Ordering::SeqCst));
    }

    #[test]
    fn newer_version_installs_and_restarts() {
        let body = br#"{"version":"1.0.3","firmware_url":"https://example/fw.bin"}"#;
        let (mut orchestrator, harness) = agent("1.0.2", ScriptedFetcher::body(body), None);

        assert_eq!(orchestrator.run_cycle(), CycleOutcome::Rebooting);

        let installs = harness.installs.lock().unwrap();
        assert_eq!(installs.len(), 1);
        assert_eq!(installs[0].0, "https://example/fw.bin");
        assert!(harness.restarted.load(Ordering::SeqCst));
    }

    #[test]
    fn status_is_written_before_the_install_attempt() {
        let body = br#"{"version":"1.0.3","firmware_url":"https://example/fw.bin"}"#;
        let (mut orchestrator, harness) = agent("1.0.2", ScriptedFetcher::body(body), None);

        orchestrator.run_cycle();

        let installs = harness.installs.lock().unwrap();
        let status_at_install = &installs[0].1;
        assert!(status_at_install.update_available);
        assert_eq!(status_at_install.latest_known_version, "1.0.3");
    }

    #[test]
    fn older_version_is_refused_without_install() {
        let body = br#"{"version":"1.0.1","firmware_url":"https://example/fw.bin"}"#;
        let (mut orchestrator, harness) = agent("1.0.2", ScriptedFetcher::body(body), None);

        assert_eq!(
            orchestrator.run_cycle(),
            CycleOutcome::DowngradeRefused("1.0.1".to_string())
        );

        let status = status::snapshot(&harness.status);
        assert!(!status.update_available);
        assert!(status.latest_known_version.is_empty());
        assert!(harness.installs.lock().unwrap().is_empty());
        assert!(!harness.restarted.load(Ordering::SeqCst));
    }

    #[test]
    fn malformed_bodies_leave_status_unchanged() {
        let bodies: &[&[u8]] = &[
            br#"{"version":"1.0.3","firmware_url""#,
            br#"{"firmware_url":"https://example/fw.bin"}"#,
            br#"{"version":"1.0.3"}"#,
            br#"{"version":7,"firmware_url":"https://example/fw.bin"}"#,
            br#"[]"#,
        ];

        for body in bodies {
            let (mut orchestrator, harness) = agent("1.0.2", ScriptedFetcher::body(body), None);
            let before = status::snapshot(&harness.status);

            assert!(matches!(
                orchestrator.run_cycle(),
                CycleOutcome::CheckFailed(UpdateError::Manifest(_))
            ));

            assert_eq!(status::snapshot(&harness.status), before);
            assert!(harness.installs.lock().unwrap().is_empty());
        }
    }

    #[test]
    fn over_length_version_is_rejected_not_truncated() {
        let long = "9".repeat(64);
        let body = format!(
            r#"{{"version":"{}","firmware_url":"https://example/fw.bin"}}"#,
            long
        );
        let (mut orchestrator, harness) =
            agent("1.0.2", ScriptedFetcher::body(body.as_bytes()), None);

        assert_eq!(
            orchestrator.run_cycle(),
            CycleOutcome::CheckFailed(UpdateError::Manifest(
                crate::manifest::ManifestError::FieldTooLong("version")
            ))
        );
        assert!(status::snapshot(&harness.status)
            .latest_known_version
            .is_empty());
    }

    #[test]
    fn fetch_failure_is_non_fatal_and_retryable() {
        let body = br#"{"version":"1.0.2","firmware_url":"https://example/fw.bin"}"#;
        let fetcher = ScriptedFetcher::new(vec![
            Err(UpdateError::Network("timeout".to_string())),
            Ok(body.to_vec()),
        ]);
        let (mut orchestrator, harness) = agent("1.0.2", fetcher, None);

        assert_eq!(
            orchestrator.run_cycle(),
            CycleOutcome::CheckFailed(UpdateError::Network("timeout".to_string()))
        );
        assert_eq!(status::snapshot(&harness.status), UpdateStatus::new("1.0.2"));

        // No lockout: the next trigger runs a fresh cycle
        assert_eq!(orchestrator.run_cycle(), CycleOutcome::UpToDate);
    }

    #[test]
    fn incomplete_transfer_keeps_update_advertised_and_does_not_restart() {
        let body = br#"{"version":"1.0.3","firmware_url":"https://example/fw.bin"}"#;
        let failure = UpdateError::IncompleteTransfer {
            expected: 5000,
            written: 4000,
        };
        let (mut orchestrator, harness) =
            agent("1.0.2", ScriptedFetcher::body(body), Some(failure.clone()));

        assert_eq!(orchestrator.run_cycle(), CycleOutcome::InstallFailed(failure));

        let status = status::snapshot(&harness.status);
        assert!(status.update_available);
        assert_eq!(status.latest_known_version, "1.0.3");
        assert!(!harness.restarted.load(Ordering::SeqCst));
        assert!(!orchestrator.is_busy());
    }

    #[test]
    fn install_failure_allows_a_retry_that_succeeds() {
        let body = br#"{"version":"1.0.3","firmware_url":"https://example/fw.bin"}"#;
        let fetcher = ScriptedFetcher::new(vec![Ok(body.to_vec()), Ok(body.to_vec())]);
        let failure = UpdateError::Write("flash timeout".to_string());
        let (mut orchestrator, harness) = agent("1.0.2", fetcher, Some(failure.clone()));

        assert_eq!(orchestrator.run_cycle(), CycleOutcome::InstallFailed(failure));
        assert_eq!(orchestrator.run_cycle(), CycleOutcome::Rebooting);

        assert_eq!(harness.installs.lock().unwrap().len(), 2);
        assert!(harness.restarted.load(Ordering::SeqCst));
    }

    #[test]
    fn trigger_during_an_active_cycle_is_a_no_op() {
        let body = br#"{"version":"1.0.2","firmware_url":"https://example/fw.bin"}"#;
        let (mut orchestrator, harness) = agent("1.0.2", ScriptedFetcher::body(body), None);

        orchestrator.state = CycleState::Installing;
        assert_eq!(orchestrator.run_cycle(), CycleOutcome::Busy);
        assert!(harness.installs.lock().unwrap().is_empty());

        orchestrator.state = CycleState::Idle;
        assert_eq!(orchestrator.run_cycle(), CycleOutcome::UpToDate);
    }
}
