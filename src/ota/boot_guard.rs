// Boot validation guard.
//
// After an install-triggered reboot the freshly written slot boots in
// pending-verify state and the boot loader will roll back to the previous
// slot unless the image confirms itself. Connectivity is the proof of life
// here, so this runs right after WiFi comes up and before the update loop.

use anyhow::{bail, Result};
use esp_idf_sys::{
    esp_ota_get_running_partition, esp_ota_get_state_partition, esp_ota_img_states_t,
    esp_ota_img_states_t_ESP_OTA_IMG_PENDING_VERIFY, esp_ota_mark_app_valid_cancel_rollback,
    ESP_OK,
};

/// Marks the running image permanently valid if this is its first boot.
/// Returns true if a pending image was confirmed.
pub fn confirm_running_image() -> Result<bool> {
    unsafe {
        let running = esp_ota_get_running_partition();
        if running.is_null() {
            bail!("No running partition reported");
        }

        let mut state: esp_ota_img_states_t = 0;
        let result = esp_ota_get_state_partition(running, &mut state);
        if result != ESP_OK {
            bail!("Could not read OTA image state: {}", result);
        }

        if state != esp_ota_img_states_t_ESP_OTA_IMG_PENDING_VERIFY {
            log::debug!("Running image already confirmed");
            return Ok(false);
        }

        log::info!("First boot of a freshly installed image, confirming...");
        let result = esp_ota_mark_app_valid_cancel_rollback();
        if result != ESP_OK {
            bail!("Could not cancel rollback: {}", result);
        }
    }

    log::info!("Running image marked valid; rollback canceled");
    Ok(true)
}
