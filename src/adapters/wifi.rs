//! WiFi station bring-up (device builds).
//!
//! Blocks until the station has an IP address.  Credentials are baked in
//! at build time (`AIOT_WIFI_SSID` / `AIOT_WIFI_PASS`); an empty password
//! selects an open network.

use anyhow::{Context, Result, anyhow, bail};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::info;

pub const SSID: &str = match option_env!("AIOT_WIFI_SSID") {
    Some(s) => s,
    None => "",
};
pub const PASSWORD: &str = match option_env!("AIOT_WIFI_PASS") {
    Some(s) => s,
    None => "",
};

pub fn connect(
    modem: Modem,
    sysloop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
) -> Result<BlockingWifi<EspWifi<'static>>> {
    if SSID.is_empty() {
        bail!("no WiFi credentials: build with AIOT_WIFI_SSID set");
    }

    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), Some(nvs))?, sysloop)?;
    let auth_method = if PASSWORD.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: SSID
            .try_into()
            .map_err(|()| anyhow!("SSID longer than 32 bytes"))?,
        password: PASSWORD
            .try_into()
            .map_err(|()| anyhow!("password longer than 64 bytes"))?,
        auth_method,
        ..Default::default()
    }))?;

    wifi.start()?;
    info!("WiFi: connecting to '{SSID}'");
    wifi.connect().with_context(|| format!("WiFi connect to '{SSID}'"))?;
    wifi.wait_netif_up()?;

    let ip = wifi.wifi().sta_netif().get_ip_info()?;
    info!("WiFi: up, ip {}", ip.ip);
    Ok(wifi)
}
