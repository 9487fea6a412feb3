//! AIoT Edge Node — Main Entry Point
//!
//! Hexagonal architecture with a single cooperative loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    LogDisplay     LogEventSink   MqttTransport│
//! │  (Sensor+Actuator)  (DisplayPort)  (EventSink)    (Broker)     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Classifier · Gate · ActuationController               │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  MessagingLink (connect / backoff / dispatch) · TickTimer      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Configuration comes from the environment (host) or build-time
//! variables (device):
//!
//! | Variable             | Effect                                          |
//! |----------------------|-------------------------------------------------|
//! | `AIOT_BROKER_HOST`   | broker host name                                |
//! | `AIOT_BROKER_PORT`   | broker TCP port                                 |
//! | `AIOT_DEVICE_ID`     | device id (client id and payload `device_id`)   |
//! | `AIOT_NAMESPACE`     | MAC-derived id + `<ns>/<id>/{data,control,...}` |
//! | `AIOT_FLAME_GATE`    | require the flame detector for the ALERT class  |
//! | `AIOT_HTTP_ENDPOINT` | host: POST telemetry here instead of MQTT       |
//! | `AIOT_RUN_SECS`      | stop (and announce offline) after N seconds     |
//! | `RUST_LOG`           | host log filter (default `info`)                |
//! | `AIOT_WIFI_SSID`     | device, build time: WiFi network                |
//! | `AIOT_WIFI_PASS`     | device, build time: WiFi password               |
#![deny(unused_must_use)]

#[cfg(all(not(target_os = "espidf"), not(feature = "host")))]
compile_error!("host builds need the `host` feature");
#[cfg(all(target_os = "espidf", not(feature = "espidf")))]
compile_error!("device builds need the `espidf` feature");

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

use aiotnode::adapters::device_id;
use aiotnode::adapters::display::LogDisplay;
use aiotnode::adapters::hardware::HardwareAdapter;
use aiotnode::adapters::log_sink::LogEventSink;
use aiotnode::adapters::time::MonotonicClock;
use aiotnode::app::ports::{ActuatorPort, SensorPort};
use aiotnode::app::service::AppService;
use aiotnode::config::{DeviceConfig, Topics};
use aiotnode::drivers::led::LedDriver;
use aiotnode::link::MessagingLink;
use aiotnode::link::transport::BrokerTransport;
use aiotnode::pins;
use aiotnode::sensors::SensorHub;
use aiotnode::sensors::flame::FlameSensor;

// ── Logging ───────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn init_logging() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn init_logging() -> Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();
    Ok(())
}

// ── Configuration ─────────────────────────────────────────────

fn load_config() -> Result<DeviceConfig> {
    let mut config = DeviceConfig::default();

    if let Ok(host) = env::var("AIOT_BROKER_HOST") {
        let port = match env::var("AIOT_BROKER_PORT") {
            Ok(p) => p
                .parse::<u16>()
                .with_context(|| format!("AIOT_BROKER_PORT={p:?} is not a port"))?,
            Err(_) => config.broker_port,
        };
        config = config.with_broker(&host, port).map_err(aiotnode::Error::from)?;
    } else if let Ok(p) = env::var("AIOT_BROKER_PORT") {
        let port = p
            .parse::<u16>()
            .with_context(|| format!("AIOT_BROKER_PORT={p:?} is not a port"))?;
        let host = config.broker_host.clone();
        config = config.with_broker(&host, port).map_err(aiotnode::Error::from)?;
    }

    if let Ok(ns) = env::var("AIOT_NAMESPACE") {
        let id = device_id::device_id(&device_id::read_mac());
        config.topics = Topics::namespaced(&ns, &id).map_err(aiotnode::Error::from)?;
        config = config.with_device_id(&id).map_err(aiotnode::Error::from)?;
    }

    if let Ok(id) = env::var("AIOT_DEVICE_ID") {
        config = config.with_device_id(&id).map_err(aiotnode::Error::from)?;
    }

    if env::var("AIOT_FLAME_GATE").is_ok_and(|v| v == "1") {
        config = config.with_flame_gate();
    }

    config.validate().map_err(aiotnode::Error::from)?;
    Ok(config)
}

fn run_limit_ms() -> Result<Option<u64>> {
    match env::var("AIOT_RUN_SECS") {
        Ok(s) => {
            let secs = s
                .parse::<u64>()
                .with_context(|| format!("AIOT_RUN_SECS={s:?} is not a number"))?;
            Ok(Some(secs.saturating_mul(1_000)))
        }
        Err(_) => Ok(None),
    }
}

// ── Wiring ────────────────────────────────────────────────────

/// Simulated pins and climate; MQTT unless `AIOT_HTTP_ENDPOINT` is set.
#[cfg(not(target_os = "espidf"))]
fn start(config: &DeviceConfig, run_limit: Option<u64>) -> Result<()> {
    use aiotnode::adapters::http::HttpTransport;
    use aiotnode::adapters::mqtt::MqttTransport;
    use aiotnode::drivers::sim_pin::SimPin;
    use aiotnode::sensors::simulated::SimulatedClimate;

    let flame_pin = SimPin::new(true); // active-low: no flame
    let actuator_pin = SimPin::new(false);
    let hub = SensorHub::with_aux(
        SimulatedClimate::with_jitter(1.5, 0x5EED),
        FlameSensor::new(flame_pin),
    );
    let mut hw = HardwareAdapter::new(hub, LedDriver::new(actuator_pin));

    match env::var("AIOT_HTTP_ENDPOINT") {
        Ok(endpoint) => {
            info!("Transport: HTTP POST {endpoint}");
            run(config, &mut hw, HttpTransport::new(&endpoint, &config.topics), run_limit);
        }
        Err(_) => {
            info!("Transport: MQTT");
            run(config, &mut hw, MqttTransport::new(), run_limit);
        }
    }
    Ok(())
}

/// WiFi, DHT22 on its open-drain data line, flame input, actuator output,
/// ESP-IDF MQTT.  GPIO numbers follow [`pins`].
#[cfg(target_os = "espidf")]
fn start(config: &DeviceConfig, run_limit: Option<u64>) -> Result<()> {
    use aiotnode::adapters::esp_mqtt::EspMqttTransport;
    use aiotnode::adapters::wifi;
    use aiotnode::sensors::dht22::Dht22;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::delay::Ets;
    use esp_idf_svc::hal::gpio::PinDriver;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let _wifi = wifi::connect(peripherals.modem, sysloop, nvs)?;

    let mut dht_pin = PinDriver::input_output_od(peripherals.pins.gpio15)?;
    dht_pin.set_high()?; // released: idle high through the pull-up
    let flame_pin = PinDriver::input(peripherals.pins.gpio34)?;
    let actuator_pin = PinDriver::output(peripherals.pins.gpio2)?;

    let hub = SensorHub::with_aux(Dht22::new(dht_pin, Ets), FlameSensor::new(flame_pin));
    let mut hw = HardwareAdapter::new(hub, LedDriver::new(actuator_pin));

    info!("Transport: ESP-IDF MQTT");
    run(config, &mut hw, EspMqttTransport::new(), run_limit);
    Ok(())
}

/// The cooperative loop, identical on host and device.
fn run<H, T>(config: &DeviceConfig, hw: &mut H, transport: T, run_limit: Option<u64>)
where
    H: SensorPort + ActuatorPort,
    T: BrokerTransport,
{
    let clock = MonotonicClock::new();
    let mut screen = LogDisplay::new();
    let mut sink = LogEventSink::new();
    let mut link = MessagingLink::new(transport, config);

    let mut app = AppService::new(config, clock.now_ms());
    app.start(&mut *hw, &mut screen);

    info!("System ready. Entering main loop.");

    let poll = Duration::from_millis(u64::from(config.poll_interval_ms));
    loop {
        let now = clock.now_ms();
        if run_limit.is_some_and(|limit| now >= limit) {
            break;
        }
        app.run_pass(now, &mut *hw, &mut link, &mut screen, &mut sink);
        std::thread::sleep(poll);
    }

    link.shutdown();
    let c = app.counters();
    info!(
        "Stopped after {} ticks ({} published, {} sensor faults, {} remote commands)",
        c.ticks, c.published, c.sensor_faults, c.remote_commands
    );
}

// ── Entry point ───────────────────────────────────────────────

fn main() -> Result<()> {
    init_logging()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  AIoT Edge Node v{}                ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config()?;
    let run_limit = run_limit_ms()?;

    info!(
        "Device ID: {} | broker {}:{} | topics {} / {} / {}",
        config.device_id,
        config.broker_host,
        config.broker_port,
        config.topics.telemetry,
        config.topics.control,
        config.topics.status,
    );
    info!(
        "Pins: DHT22=GPIO{} flame=GPIO{} actuator=GPIO{} LCD SDA=GPIO{} SCL=GPIO{} addr=0x{:02X}",
        pins::DHT22_DATA_GPIO,
        pins::FLAME_GPIO,
        pins::ACTUATOR_GPIO,
        pins::LCD_SDA_GPIO,
        pins::LCD_SCL_GPIO,
        pins::LCD_I2C_ADDR,
    );
    info!(
        "Model: {} features, threshold {:.2}, tick {} ms",
        config.model.len(),
        config.decision_threshold,
        config.tick_interval_ms
    );

    start(&config, run_limit)
}
