//! Device configuration.
//!
//! Every tunable constant of the node lives in one immutable
//! [`DeviceConfig`] value built once at startup and passed by reference.
//! The classifier coefficients ride along in [`ClassifierModel`].
//! Loading these from flash or a file is deliberately not handled here.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::actuation::gate::{Condition, Gate, GateMode};
use crate::error::ConfigError;
use crate::link::backoff::BackoffPolicy;

/// Upper bound on the feature count N (stack-allocated vectors).
pub const MAX_FEATURES: usize = 16;

/// Size of the pre-allocated telemetry serialisation buffer.
pub const TELEMETRY_BUF_CAP: usize = 512;

/// Fixed-capacity feature array used for model coefficients and vectors.
pub type FeatureArray = Vec<f32, MAX_FEATURES>;

/// Topic string type (`namespace/device/suffix`).
pub type TopicString = String<64>;

/// Device identifier string.
pub type DeviceId = String<32>;

/// Short human-readable actuator label.
pub type Label = String<12>;

fn bounded<const N: usize>(s: &str, field: &'static str) -> Result<String<N>, ConfigError> {
    let mut out = String::new();
    out.push_str(s).map_err(|()| ConfigError::TooLong(field))?;
    Ok(out)
}

fn features(values: &[f32]) -> Result<FeatureArray, ConfigError> {
    Vec::from_slice(values).map_err(|()| ConfigError::ModelShape)
}

// ═══════════════════════════════════════════════════════════════
//  Classifier model
// ═══════════════════════════════════════════════════════════════

/// Linear classifier coefficients plus the baseline raw feature values.
///
/// `baseline` supplies the raw value of every slot the sensor does not
/// overwrite (slot 0 = temperature, slot 1 = humidity).  It is copied into
/// a fresh vector each tick, so no slot ever carries a stale value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    pub mean: FeatureArray,
    pub std: FeatureArray,
    pub weights: FeatureArray,
    pub bias: f32,
    pub baseline: FeatureArray,
}

impl ClassifierModel {
    /// Build and validate a model.  All four arrays must share one length N
    /// with `1 <= N <= MAX_FEATURES`.
    pub fn new(
        mean: &[f32],
        std: &[f32],
        weights: &[f32],
        bias: f32,
        baseline: &[f32],
    ) -> Result<Self, ConfigError> {
        let model = Self {
            mean: features(mean)?,
            std: features(std)?,
            weights: features(weights)?,
            bias,
            baseline: features(baseline)?,
        };
        model.validate()?;
        Ok(model)
    }

    /// Number of features N.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Check shape and finiteness.  Deserialised models bypass [`new`],
    /// so [`DeviceConfig::validate`] calls this again.
    ///
    /// [`new`]: ClassifierModel::new
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.weights.len();
        if n == 0
            || self.mean.len() != n
            || self.std.len() != n
            || self.baseline.len() != n
        {
            return Err(ConfigError::ModelShape);
        }
        let all_finite = self
            .mean
            .iter()
            .chain(self.std.iter())
            .chain(self.weights.iter())
            .chain(self.baseline.iter())
            .all(|v| v.is_finite());
        if !all_finite || !self.bias.is_finite() {
            return Err(ConfigError::NonFinite);
        }
        Ok(())
    }

    /// Two-feature temperature/humidity model.
    pub fn two_feature() -> Self {
        Self {
            mean: vec_of(&[25.0, 50.0]),
            std: vec_of(&[5.0, 20.0]),
            weights: vec_of(&[-1.104_341_1, 1.373_978_3]),
            bias: -0.383_647_43,
            baseline: vec_of(&[25.0, 50.0]),
        }
    }

    /// Twelve-feature smoke-detector model.  Slots 2.. are TVOC, eCO2,
    /// raw H2, raw ethanol, pressure, PM1.0, PM2.5, NC0.5, NC1.0, NC2.5;
    /// the node has no sensors for them, so they hold typical indoor values.
    pub fn smoke_detector() -> Self {
        Self {
            mean: vec_of(&[
                15.9531, 48.5743, 1922.8843, 667.7439, 12942.301, 19754.25, 938.6319, 100.8873,
                186.0739, 490.2093, 205.4578, 81.3198,
            ]),
            std: vec_of(&[
                14.358, 8.8212, 7755.895, 1903.7822, 271.1686, 606.976, 1.3245, 925.3035,
                1991.5279, 4259.4157, 2232.4848, 1095.29,
            ]),
            weights: vec_of(&[
                -1.1063, 1.3782, -18.2296, 5.9192, 3.3515, -7.8964, -2.4279, -0.3308, -0.1946,
                -0.4543, -0.1843, -0.0682,
            ]),
            bias: -0.3844,
            baseline: vec_of(&[
                20.0, 57.36, 0.0, 400.0, 12306.0, 18520.0, 939.735, 0.0, 0.0, 0.0, 0.0, 0.0,
            ]),
        }
    }
}

/// Infallible constructor for the built-in profiles (all shorter than
/// `MAX_FEATURES`); extra values are dropped, which `validate` would catch.
fn vec_of(values: &[f32]) -> FeatureArray {
    values.iter().copied().take(MAX_FEATURES).collect()
}

// ═══════════════════════════════════════════════════════════════
//  Topics
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topics {
    /// Outbound telemetry records.
    pub telemetry: TopicString,
    /// Inbound control frames.
    pub control: TopicString,
    /// Retained online/offline status (and last will).
    pub status: TopicString,
}

impl Topics {
    /// The shared lab topics (`esp32/data`, `esp32/control`, `esp32/status`).
    pub fn fixed() -> Self {
        Self {
            telemetry: bounded("esp32/data", "topics.telemetry").unwrap_or_default(),
            control: bounded("esp32/control", "topics.control").unwrap_or_default(),
            status: bounded("esp32/status", "topics.status").unwrap_or_default(),
        }
    }

    /// Per-device topics: `{namespace}/{device_id}/{data|control|status}`.
    pub fn namespaced(namespace: &str, device_id: &str) -> Result<Self, ConfigError> {
        let make = |suffix: &str, field: &'static str| -> Result<TopicString, ConfigError> {
            let mut t = TopicString::new();
            for part in [namespace, "/", device_id, "/", suffix] {
                t.push_str(part).map_err(|()| ConfigError::TooLong(field))?;
            }
            Ok(t)
        };
        Ok(Self {
            telemetry: make("data", "topics.telemetry")?,
            control: make("control", "topics.control")?,
            status: make("status", "topics.status")?,
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Device configuration
// ═══════════════════════════════════════════════════════════════

/// Core device configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Identity ---
    /// Local device id; inbound commands addressed elsewhere are dropped.
    pub device_id: DeviceId,

    // --- Broker ---
    pub broker_host: String<64>,
    pub broker_port: u16,
    pub topics: Topics,
    /// Bounded wait for a single connect attempt (milliseconds).
    pub connect_timeout_ms: u32,
    /// MQTT keep-alive interval (seconds).
    pub keep_alive_secs: u16,
    pub backoff: BackoffPolicy,
    /// Largest payload the link accepts for publish.
    pub max_payload_bytes: usize,

    // --- Timing ---
    /// Sampling / telemetry period T (milliseconds).
    pub tick_interval_ms: u32,
    /// Idle sleep between scheduler passes (milliseconds).
    pub poll_interval_ms: u32,
    /// Local inference leaves the actuator alone this long after a remote command.
    pub remote_hold_ms: u32,
    /// Log runtime counters every this many ticks (0 = never).
    pub stats_interval_ticks: u32,

    // --- Decision ---
    /// Probability at or above which the positive class is chosen.
    pub decision_threshold: f32,
    pub gate: Gate,
    pub positive_label: Label,
    pub negative_label: Label,

    // --- Model ---
    pub model: ClassifierModel,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            // Identity
            device_id: bounded("esp32-aiot-demo", "device_id").unwrap_or_default(),

            // Broker
            broker_host: bounded("broker.mqtt.cool", "broker_host").unwrap_or_default(),
            broker_port: 1883,
            topics: Topics::fixed(),
            connect_timeout_ms: 5_000,
            keep_alive_secs: 30,
            backoff: BackoffPolicy::Exponential {
                initial_ms: 2_000,
                max_ms: 60_000,
            },
            max_payload_bytes: TELEMETRY_BUF_CAP,

            // Timing
            tick_interval_ms: 3_000, // every 3 s
            poll_interval_ms: 50,
            remote_hold_ms: 10_000,
            stats_interval_ticks: 20, // once a minute at 3 s ticks

            // Decision
            decision_threshold: 0.5,
            gate: Gate::open(),
            positive_label: bounded("ALERT", "positive_label").unwrap_or_default(),
            negative_label: bounded("NORMAL", "negative_label").unwrap_or_default(),

            // Model
            model: ClassifierModel::smoke_detector(),
        }
    }
}

impl DeviceConfig {
    /// Replace the device id.
    pub fn with_device_id(mut self, id: &str) -> Result<Self, ConfigError> {
        self.device_id = bounded(id, "device_id")?;
        Ok(self)
    }

    /// Replace the broker endpoint.
    pub fn with_broker(mut self, host: &str, port: u16) -> Result<Self, ConfigError> {
        self.broker_host = bounded(host, "broker_host")?;
        self.broker_port = port;
        Ok(self)
    }

    /// Flame-gated variant: the positive class additionally requires the
    /// flame detector (aux channel 0) to be asserted, at threshold 0.6.
    pub fn with_flame_gate(mut self) -> Self {
        self.decision_threshold = 0.6;
        self.gate = Gate::all(&[Condition::Flag { channel: 0 }], GateMode::Require);
        self
    }

    /// Check every cross-field invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;
        if self.device_id.is_empty() {
            return Err(ConfigError::OutOfRange("device_id"));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::OutOfRange("tick_interval_ms"));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > self.tick_interval_ms {
            return Err(ConfigError::OutOfRange("poll_interval_ms"));
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(ConfigError::OutOfRange("decision_threshold"));
        }
        if self.max_payload_bytes == 0 || self.max_payload_bytes > TELEMETRY_BUF_CAP {
            return Err(ConfigError::OutOfRange("max_payload_bytes"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange("connect_timeout_ms"));
        }
        self.backoff.validate()?;
        Ok(())
    }
}
