//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable id of the form `esp32-xxyyzz` (last 3 bytes of the
//! 6-byte MAC, lowercase hex).  Used as MQTT client id and as the
//! `device_id` field of every payload when no id is configured.

use core::fmt::Write;

use crate::config::DeviceId;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0x24, 0x6F, 0x28, 0xA1, 0xB2, 0xC3]
}

/// `esp32-xxyyzz` from the last 3 MAC bytes.
pub fn device_id(mac: &MacAddress) -> DeviceId {
    let mut id = DeviceId::new();
    let _ = write!(id, "esp32-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}
