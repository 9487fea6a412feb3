//! Sensor subsystem — individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns a climate source (temperature + humidity) and an optional
//! auxiliary source, and implements [`SensorPort`] for the scheduler.
//! One reading per tick; invalid readings are reported, never retried here.

pub mod dht22;
pub mod flame;
pub mod simulated;

use crate::app::ports::SensorPort;
use crate::error::SensorError;

/// Plausible DHT22 temperature range (°C).
pub const TEMPERATURE_RANGE: core::ops::RangeInclusive<f32> = -40.0..=80.0;
/// Plausible relative humidity range (%).
pub const HUMIDITY_RANGE: core::ops::RangeInclusive<f32> = 0.0..=100.0;

/// Number of auxiliary channels the gate can reference.
pub const AUX_CHANNELS: usize = 4;

/// One climate sample.  Only exists for validated readings; a failed
/// sample is a [`SensorError`] instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature: f32,
    pub humidity: f32,
}

impl SensorReading {
    /// Accept the reading only if both values are finite and plausible.
    pub fn checked(temperature: f32, humidity: f32) -> Result<Self, SensorError> {
        if !temperature.is_finite()
            || !humidity.is_finite()
            || !TEMPERATURE_RANGE.contains(&temperature)
            || !HUMIDITY_RANGE.contains(&humidity)
        {
            return Err(SensorError::InvalidReading);
        }
        Ok(Self {
            temperature,
            humidity,
        })
    }
}

/// Auxiliary channel values for the decision gate.  `None` = no reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AuxReadings {
    channels: [Option<f32>; AUX_CHANNELS],
}

impl AuxReadings {
    pub fn get(&self, channel: u8) -> Option<f32> {
        self.channels.get(channel as usize).copied().flatten()
    }

    /// Out-of-range channels are ignored.
    pub fn set(&mut self, channel: u8, value: f32) {
        if let Some(slot) = self.channels.get_mut(channel as usize) {
            *slot = Some(value);
        }
    }

    pub fn clear(&mut self, channel: u8) {
        if let Some(slot) = self.channels.get_mut(channel as usize) {
            *slot = None;
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Source traits
// ───────────────────────────────────────────────────────────────

/// Something that measures temperature and humidity.
pub trait ClimateSource {
    /// Raw `(temperature °C, humidity %)`.  Plausibility is checked by the hub.
    fn read_climate(&mut self) -> Result<(f32, f32), SensorError>;
}

/// Something that contributes auxiliary gate channels.
pub trait AuxSource {
    fn read_aux(&mut self, aux: &mut AuxReadings);
}

/// No auxiliary inputs.
impl AuxSource for () {
    fn read_aux(&mut self, _aux: &mut AuxReadings) {}
}

// ───────────────────────────────────────────────────────────────
// Hub
// ───────────────────────────────────────────────────────────────

/// Aggregates the climate source and auxiliary inputs.
pub struct SensorHub<C, F = ()> {
    climate: C,
    aux: F,
}

impl<C: ClimateSource> SensorHub<C, ()> {
    pub fn new(climate: C) -> Self {
        Self { climate, aux: () }
    }
}

impl<C: ClimateSource, F: AuxSource> SensorHub<C, F> {
    pub fn with_aux(climate: C, aux: F) -> Self {
        Self { climate, aux }
    }

    pub fn climate_mut(&mut self) -> &mut C {
        &mut self.climate
    }

    pub fn aux_mut(&mut self) -> &mut F {
        &mut self.aux
    }
}

impl<C: ClimateSource, F: AuxSource> SensorPort for SensorHub<C, F> {
    fn sample(&mut self) -> Result<SensorReading, SensorError> {
        let (t, h) = self.climate.read_climate()?;
        SensorReading::checked(t, h)
    }

    fn auxiliary(&mut self) -> AuxReadings {
        let mut aux = AuxReadings::default();
        self.aux.read_aux(&mut aux);
        aux
    }
}
