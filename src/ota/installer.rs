use std::time::Duration;

use embedded_svc::http::client::Client;
use embedded_svc::http::{Headers, Method, Status};
use esp_idf_svc::http::client::{Configuration as HttpConfig, EspHttpConnection};
use esp_idf_svc::io::{Read, Write};
use esp_idf_svc::ota::EspOta;

use ota_core::{FirmwareInstall, UpdateError};

const WRITE_CHUNK: usize = 4096;

fn network_error(e: impl std::fmt::Display) -> UpdateError {
    UpdateError::Network(e.to_string())
}

/// Streams a firmware image over HTTP into the inactive OTA slot. The slot is
/// committed as the next boot target only after every declared byte has been
/// written and the image passed `EspOta` validation; any earlier failure
/// abandons the slot and leaves the running image selected for boot.
pub struct EspFirmwareInstaller {
    ota: EspOta,
    timeout: Duration,
}

impl EspFirmwareInstaller {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            ota: EspOta::new()?,
            timeout,
        })
    }
}

impl FirmwareInstall for EspFirmwareInstaller {
    fn install(&mut self, url: &str) -> Result<(), UpdateError> {
        let config = HttpConfig {
            buffer_size: Some(WRITE_CHUNK),
            timeout: Some(self.timeout),
            ..Default::default()
        };

        let connection = EspHttpConnection::new(&config).map_err(network_error)?;
        let mut client = Client::wrap(connection);

        let request = client
            .request(Method::Get, url, &[])
            .map_err(network_error)?;
        let mut response = request.submit().map_err(network_error)?;

        if response.status() != 200 {
            return Err(UpdateError::Network(format!("HTTP {}", response.status())));
        }

        let declared = response
            .header("Content-Length")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(-1);
        if declared <= 0 {
            return Err(UpdateError::InvalidLength(declared));
        }
        let expected = declared as usize;

        // esp_ota_begin erases the inactive slot and rejects images larger
        // than the partition
        let mut update = self
            .ota
            .initiate_update()
            .map_err(|e| UpdateError::InstallBegin(e.to_string()))?;

        log::info!("Writing {} byte image to the inactive slot", expected);

        let mut written = 0usize;
        let mut last_reported = 0usize;
        let mut buf = [0u8; WRITE_CHUNK];
        loop {
            let bytes_read = match response.read(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    // Slot contents are indeterminate; abandon so it can
                    // never be marked bootable
                    let _ = update.abort();
                    return Err(network_error(e));
                }
            };
            if bytes_read == 0 {
                break;
            }

            if let Err(e) = update.write_all(&buf[..bytes_read]) {
                let _ = update.abort();
                return Err(UpdateError::Write(e.to_string()));
            }
            written += bytes_read;

            let progress = (written * 100) / expected;
            if progress >= last_reported + 10 {
                log::info!("Install progress: {}% ({}/{})", progress, written, expected);
                last_reported = progress - progress % 10;
            }
        }

        if written != expected {
            let _ = update.abort();
            return Err(UpdateError::IncompleteTransfer { expected, written });
        }

        // Validates the received image and sets the slot as next boot target
        update
            .complete()
            .map_err(|e| UpdateError::Write(e.to_string()))?;

        log::info!("Image verified and committed as next boot target");
        Ok(())
    }
}
