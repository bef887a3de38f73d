use std::time::Duration;

use log::info;
use ota_core::Restart;

/// Get the last reset reason as a string
pub fn get_reset_reason() -> &'static str {
    let reason = unsafe { esp_idf_sys::esp_reset_reason() };

    match reason {
        esp_idf_sys::esp_reset_reason_t_ESP_RST_POWERON => "Power-on",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_EXT => "External pin",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_SW => "Software reset",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_PANIC => "Panic",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_INT_WDT => "Interrupt watchdog",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_TASK_WDT => "Task watchdog",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_BROWNOUT => "Brownout",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_DEEPSLEEP => "Deep sleep",
        _ => "Unknown",
    }
}

/// Restart collaborator handed to the orchestrator. Waits out a short grace
/// delay so in-flight serial and HTTP output can flush, then resets.
/// Does not return.
pub struct EspRestart {
    pub grace: Duration,
}

impl Restart for EspRestart {
    fn restart(&mut self) {
        info!("Restarting in {} ms...", self.grace.as_millis());
        log::logger().flush();
        std::thread::sleep(self.grace);

        unsafe {
            esp_idf_sys::esp_restart();
        }
    }
}
