// HTTP status/trigger surface for the update agent.
//
// GET  /        - HTML landing page
// GET  /status  - JSON update status, read-only
// POST /update  - run one check/install cycle; if an install succeeds the
//                 device reboots and the connection drops without a response,
//                 which callers must treat as the success signal.

use anyhow::Result;
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::io::Write;
use std::sync::{Arc, Mutex};

use ota_core::{
    status, CycleOutcome, FirmwareInstall, ManifestFetch, Orchestrator, Restart, SharedStatus,
    UpdateStatus,
};

pub struct StatusServer {
    _server: EspHttpServer<'static>,
}

fn render_home(status: &UpdateStatus, ip: &str) -> String {
    let update_line = if status.update_available {
        format!(
            "<p style='color:orange'><strong>Update Available:</strong> {}</p>\
             <form action='/update' method='POST'><button>Install Update</button></form>",
            status.latest_known_version
        )
    } else {
        "<p style='color:green'>Your firmware is up to date.</p>".to_string()
    };

    format!(
        "<h1>OTA Agent</h1>\
         <p><strong>Firmware Version:</strong> {}</p>\
         <p><strong>IP Address:</strong> {}</p>\
         {}\
         <p><a href='/status'>Status</a></p>",
        status.current_version, ip, update_line
    )
}

impl StatusServer {
    pub fn new<F, I, R>(
        status: SharedStatus,
        orchestrator: Arc<Mutex<Orchestrator<F, I, R>>>,
        ip: String,
    ) -> Result<Self>
    where
        F: ManifestFetch + Send + 'static,
        I: FirmwareInstall + Send + 'static,
        R: Restart + Send + 'static,
    {
        let mut server = EspHttpServer::new(&Configuration::default())?;

        // Landing page
        let status_home = SharedStatus::clone(&status);
        server.fn_handler("/", esp_idf_svc::http::Method::Get, move |req| {
            let snapshot = status::snapshot(&status_home);
            let html = render_home(&snapshot, &ip);

            let mut response = req.into_response(200, None, &[("Content-Type", "text/html")])?;
            response.write_all(html.as_bytes())?;
            Ok(()) as Result<(), Box<dyn std::error::Error>>
        })?;

        // Read-only status report; safe to poll, never starts a cycle
        let status_report = SharedStatus::clone(&status);
        server.fn_handler("/status", esp_idf_svc::http::Method::Get, move |req| {
            let snapshot = status::snapshot(&status_report);
            let json = serde_json::to_string(&snapshot)?;

            let mut response =
                req.into_response(200, None, &[("Content-Type", "application/json")])?;
            response.write_all(json.as_bytes())?;
            Ok(()) as Result<(), Box<dyn std::error::Error>>
        })?;

        // Trigger one check/install cycle
        server.fn_handler("/update", esp_idf_svc::http::Method::Post, move |req| {
            // try_lock so a cycle already streaming an image cannot be
            // doubled up; the status endpoint stays responsive meanwhile
            let mut orchestrator = match orchestrator.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    let mut response = req.into_status_response(503)?;
                    response.write_all(b"Update cycle already in progress")?;
                    return Ok(());
                }
            };

            match orchestrator.run_cycle() {
                CycleOutcome::UpToDate => {
                    let mut response = req.into_ok_response()?;
                    response.write_all(b"No update available")?;
                }
                CycleOutcome::DowngradeRefused(version) => {
                    let mut response = req.into_ok_response()?;
                    response.write_all(
                        format!("Manifest offers older version {}, not installing", version)
                            .as_bytes(),
                    )?;
                }
                CycleOutcome::Busy => {
                    let mut response = req.into_status_response(503)?;
                    response.write_all(b"Update cycle already in progress")?;
                }
                CycleOutcome::CheckFailed(err) => {
                    let mut response = req.into_status_response(502)?;
                    response.write_all(format!("Update check failed: {}", err).as_bytes())?;
                }
                CycleOutcome::InstallFailed(err) => {
                    let mut response = req.into_status_response(500)?;
                    response
                        .write_all(format!("Install failed: {}; will retry", err).as_bytes())?;
                }
                // On hardware the restart happens inside run_cycle and this
                // arm is never reached; the dropped connection is the signal
                CycleOutcome::Rebooting => {
                    let mut response = req.into_ok_response()?;
                    response.write_all(b"Update installed, rebooting")?;
                }
            }
            Ok(()) as Result<(), Box<dyn std::error::Error>>
        })?;

        Ok(Self { _server: server })
    }
}
