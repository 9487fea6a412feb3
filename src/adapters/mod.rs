//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements         | Connects to                  |
//! |--------------|--------------------|------------------------------|
//! | `hardware`   | SensorPort         | DHT22 + flame GPIO           |
//! |              | ActuatorPort       | Actuator GPIO                |
//! | `display`    | DisplayPort        | Log-rendered 16x2 LCD        |
//! | `log_sink`   | EventSink          | Serial / console log output  |
//! | `mqtt`       | BrokerTransport    | rumqttc client (host)        |
//! | `http`       | BrokerTransport    | REST inference server (host) |
//! | `esp_mqtt`   | BrokerTransport    | ESP-IDF MQTT client (device) |
//! | `wifi`       | network bring-up   | ESP-IDF WiFi station         |
//! | `time`       | monotonic clock    | esp_timer / `Instant`        |
//! | `device_id`  | identity           | eFuse MAC                    |

pub mod device_id;
pub mod display;
#[cfg(target_os = "espidf")]
pub mod esp_mqtt;
pub mod hardware;
#[cfg(feature = "host")]
pub mod http;
pub mod log_sink;
#[cfg(feature = "host")]
pub mod mqtt;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod wifi;
