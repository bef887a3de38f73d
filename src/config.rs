use anyhow::Result;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs};
use serde::{Deserialize, Serialize};

const CONFIG_NAMESPACE: &str = "ota-agent";
const CONFIG_KEY: &str = "config";

// Compiled-in manifest location; can be overridden via stored config
const DEFAULT_MANIFEST_URL: &str =
    "https://raw.githubusercontent.com/example/firmware/main/manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // WiFi settings
    pub wifi_ssid: String,
    pub wifi_password: String,

    // Update settings
    pub manifest_url: String,
    pub http_timeout_secs: u64,
    pub check_interval_secs: u64,
    pub ota_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        // WiFi credentials come from wifi_config.h via build.rs
        Self {
            wifi_ssid: env!("WIFI_SSID").to_string(),
            wifi_password: env!("WIFI_PASSWORD").to_string(),
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            http_timeout_secs: 30,
            check_interval_secs: 6 * 3600,
            ota_enabled: true,
        }
    }
}

impl Config {
    pub fn save(&self, nvs_partition: EspDefaultNvsPartition) -> Result<()> {
        let mut nvs = EspNvs::new(nvs_partition, CONFIG_NAMESPACE, true)?;
        let json = serde_json::to_vec(self)?;
        nvs.set_blob(CONFIG_KEY, &json)?;
        log::info!("Configuration saved to NVS");
        Ok(())
    }
}

pub fn load_or_default(nvs_partition: EspDefaultNvsPartition) -> Result<Config> {
    match load_from_nvs(nvs_partition.clone()) {
        Ok(mut config) => {
            log::info!("Loaded configuration from NVS");

            // If NVS has empty WiFi credentials, fall back to the compiled-in ones
            if config.wifi_ssid.is_empty() {
                let defaults = Config::default();
                log::warn!(
                    "NVS WiFi credentials empty, using compiled defaults: SSID='{}'",
                    defaults.wifi_ssid
                );
                config.wifi_ssid = defaults.wifi_ssid;
                config.wifi_password = defaults.wifi_password;
            }

            Ok(config)
        }
        Err(e) => {
            log::warn!("Failed to load config from NVS: {:?}, using defaults", e);
            let config = Config::default();

            // Save defaults so the next boot has a stored config to edit
            if let Err(save_err) = config.save(nvs_partition) {
                log::warn!("Failed to save default config to NVS: {:?}", save_err);
            }

            Ok(config)
        }
    }
}

fn load_from_nvs(nvs_partition: EspDefaultNvsPartition) -> Result<Config> {
    let nvs = EspNvs::new(nvs_partition, CONFIG_NAMESPACE, true)?;

    let mut buf = vec![0u8; 1024];
    let data = nvs
        .get_blob(CONFIG_KEY, &mut buf)?
        .ok_or_else(|| anyhow::anyhow!("Config not found in NVS"))?;

    let config: Config = serde_json::from_slice(data)?;

    Ok(config)
}
