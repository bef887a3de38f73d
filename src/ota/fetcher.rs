use std::time::Duration;

use embedded_svc::http::client::Client;
use embedded_svc::http::{Headers, Method, Status};
use esp_idf_svc::http::client::{Configuration as HttpConfig, EspHttpConnection};
use esp_idf_svc::io::Read;

use ota_core::{ManifestFetch, UpdateError};

// Sanity ceiling for a manifest document; anything larger is not a manifest
const MANIFEST_MAX_LEN: i64 = 4096;

const READ_CHUNK: usize = 512;

/// One-shot HTTP GET of the configured manifest URL. All-or-nothing: any
/// failure surfaces as a typed error with no partial body exposed.
pub struct EspManifestFetcher {
    manifest_url: String,
    timeout: Duration,
}

impl EspManifestFetcher {
    pub fn new(manifest_url: String, timeout: Duration) -> Self {
        Self {
            manifest_url,
            timeout,
        }
    }
}

impl ManifestFetch for EspManifestFetcher {
    fn fetch_manifest(&mut self) -> Result<Vec<u8>, UpdateError> {
        log::info!("Fetching manifest from {}", self.manifest_url);

        let config = HttpConfig {
            buffer_size: Some(READ_CHUNK),
            timeout: Some(self.timeout),
            ..Default::default()
        };

        let connection =
            EspHttpConnection::new(&config).map_err(|e| UpdateError::Network(e.to_string()))?;
        let mut client = Client::wrap(connection);

        let request = client
            .request(Method::Get, &self.manifest_url, &[])
            .map_err(|e| UpdateError::Network(e.to_string()))?;
        let mut response = request
            .submit()
            .map_err(|e| UpdateError::Network(e.to_string()))?;

        if response.status() != 200 {
            return Err(UpdateError::Network(format!("HTTP {}", response.status())));
        }

        let declared = response
            .header("Content-Length")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(-1);
        if declared <= 0 || declared > MANIFEST_MAX_LEN {
            return Err(UpdateError::InvalidLength(declared));
        }
        let expected = declared as usize;

        let mut body: Vec<u8> = Vec::new();
        body.try_reserve_exact(expected)
            .map_err(|_| UpdateError::Allocation(expected))?;

        let mut buf = [0u8; READ_CHUNK];
        while body.len() < expected {
            let want = (expected - body.len()).min(buf.len());
            let bytes_read = response
                .read(&mut buf[..want])
                .map_err(|e| UpdateError::Network(e.to_string()))?;
            if bytes_read == 0 {
                break;
            }
            body.extend_from_slice(&buf[..bytes_read]);
        }

        // One probe read past the declared length catches a lying server
        let extra = response
            .read(&mut buf)
            .map_err(|e| UpdateError::Network(e.to_string()))?;

        if body.len() != expected || extra != 0 {
            return Err(UpdateError::ShortRead {
                expected,
                received: body.len() + extra,
            });
        }

        Ok(body)
    }
}
