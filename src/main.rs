use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::prelude::*;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_sys as _; // Binstart
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::info;

// Generate ESP-IDF app descriptor (carries the version the boot loader and
// OTA data partition see)
#[allow(unexpected_cfgs)]
mod app_desc {
    esp_idf_sys::esp_app_desc!();
}

mod config;
mod logging;
mod network;
mod ota;
mod system;
mod version;

use crate::network::web_server::StatusServer;
use crate::network::NetworkManager;
use crate::ota::{EspFirmwareInstaller, EspManifestFetcher};
use crate::system::reset::EspRestart;
use ota_core::{Orchestrator, SharedStatus};

type AgentOrchestrator = Orchestrator<EspManifestFetcher, EspFirmwareInstaller, EspRestart>;

// Let DHCP and DNS settle before the first check after boot
const BOOT_CHECK_DELAY_MS: u32 = 5000;

fn main() -> Result<()> {
    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();

    logging::init_logger().expect("Failed to initialize logger");

    info!("ESP32 OTA Agent {}", version::full_version());
    info!("Boot reason: {}", system::reset::get_reset_reason());
    info!("Free heap: {} bytes", unsafe {
        esp_idf_sys::esp_get_free_heap_size()
    });

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let app_config = config::load_or_default(nvs.clone())?;

    let mut network = NetworkManager::new(
        peripherals.modem,
        sys_loop,
        nvs,
        app_config.wifi_ssid.clone(),
        app_config.wifi_password.clone(),
    )?;
    network.connect()?;

    // Connectivity is the sanity gate: a pending image that cannot reach the
    // network must not confirm itself, or it could never be updated again.
    // Past this point an early crash no longer triggers boot loader rollback.
    if let Err(e) = ota::boot_guard::confirm_running_image() {
        log::error!(
            "Boot validation failed: {:?}; boot loader rollback stays armed",
            e
        );
    }

    let status = ota_core::status::shared(version::FIRMWARE_VERSION);

    let fetcher = EspManifestFetcher::new(
        app_config.manifest_url.clone(),
        Duration::from_secs(app_config.http_timeout_secs),
    );
    let installer = EspFirmwareInstaller::new(Duration::from_secs(app_config.http_timeout_secs))?;
    let restart = EspRestart {
        grace: Duration::from_secs(1),
    };

    let orchestrator = Arc::new(Mutex::new(Orchestrator::new(
        fetcher,
        installer,
        restart,
        SharedStatus::clone(&status),
    )));

    let ip = network.get_ip().unwrap_or_else(|| "0.0.0.0".to_string());
    let _server = StatusServer::new(
        SharedStatus::clone(&status),
        Arc::clone(&orchestrator),
        ip.clone(),
    )?;
    info!("Status server listening on http://{}/", ip);

    if !app_config.ota_enabled {
        info!("Automatic update checks disabled; manual trigger stays available");
        loop {
            FreeRtos::delay_ms(60_000);
        }
    }

    FreeRtos::delay_ms(BOOT_CHECK_DELAY_MS);

    let interval_ms = (app_config.check_interval_secs * 1000).min(u32::MAX as u64) as u32;
    loop {
        run_check(&orchestrator);
        FreeRtos::delay_ms(interval_ms);
    }
}

fn run_check(orchestrator: &Arc<Mutex<AgentOrchestrator>>) {
    // Outcome details are logged by the orchestrator; a successful install
    // restarts the device inside this call and never returns
    let _ = orchestrator.lock().unwrap().run_cycle();
}
