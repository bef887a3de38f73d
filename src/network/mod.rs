pub mod web_server;
pub mod wifi;

use anyhow::Result;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};

use self::wifi::WifiManager;

pub struct NetworkManager {
    wifi: WifiManager,
}

impl NetworkManager {
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        ssid: String,
        password: String,
    ) -> Result<Self> {
        let wifi = WifiManager::new(modem, sys_loop, nvs, ssid, password)?;

        Ok(Self { wifi })
    }

    pub fn connect(&mut self) -> Result<()> {
        self.wifi.connect()?;
        log::info!("WiFi connected, IP: {:?}", self.wifi.get_ip());
        Ok(())
    }

    pub fn get_ip(&self) -> Option<String> {
        self.wifi.get_ip()
    }
}
