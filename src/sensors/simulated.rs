//! Host stand-in for the climate sensor.
//!
//! Values come from static atomics so tests and the host binary can inject
//! readings (and faults) without owning the hub.  An optional jitter adds a
//! small deterministic wobble so the host loop produces changing telemetry.

use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use super::ClimateSource;
use crate::error::SensorError;

static SIM_TEMPERATURE_BITS: AtomicU32 = AtomicU32::new(0x41C8_0000); // 25.0
static SIM_HUMIDITY_BITS: AtomicU32 = AtomicU32::new(0x4248_0000); // 50.0
static SIM_FAULT: AtomicU8 = AtomicU8::new(FAULT_NONE);

const FAULT_NONE: u8 = 0;
const FAULT_INVALID: u8 = 1;
const FAULT_TIMEOUT: u8 = 2;
const FAULT_CHECKSUM: u8 = 3;
const FAULT_BUS: u8 = 4;

/// Set the values the next reads will return.
pub fn sim_set_climate(temperature: f32, humidity: f32) {
    SIM_TEMPERATURE_BITS.store(temperature.to_bits(), Ordering::Relaxed);
    SIM_HUMIDITY_BITS.store(humidity.to_bits(), Ordering::Relaxed);
}

/// Make every read fail with `fault` until cleared with `None`.
pub fn sim_set_fault(fault: Option<SensorError>) {
    let code = match fault {
        None => FAULT_NONE,
        Some(SensorError::InvalidReading) => FAULT_INVALID,
        Some(SensorError::Timeout) => FAULT_TIMEOUT,
        Some(SensorError::Checksum) => FAULT_CHECKSUM,
        Some(SensorError::Bus) => FAULT_BUS,
    };
    SIM_FAULT.store(code, Ordering::Relaxed);
}

pub struct SimulatedClimate {
    jitter: f32,
    seed: u32,
}

impl SimulatedClimate {
    pub fn new() -> Self {
        Self { jitter: 0.0, seed: 1 }
    }

    /// Add up to `±amplitude` of pseudo-random wobble to each value.
    pub fn with_jitter(amplitude: f32, seed: u32) -> Self {
        Self {
            jitter: amplitude.abs(),
            seed: seed.max(1),
        }
    }

    /// xorshift32 mapped to [-1, 1].
    fn wobble(&mut self) -> f32 {
        let mut x = self.seed;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.seed = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

impl Default for SimulatedClimate {
    fn default() -> Self {
        Self::new()
    }
}

impl ClimateSource for SimulatedClimate {
    fn read_climate(&mut self) -> Result<(f32, f32), SensorError> {
        match SIM_FAULT.load(Ordering::Relaxed) {
            FAULT_INVALID => return Ok((f32::NAN, f32::NAN)),
            FAULT_TIMEOUT => return Err(SensorError::Timeout),
            FAULT_CHECKSUM => return Err(SensorError::Checksum),
            FAULT_BUS => return Err(SensorError::Bus),
            _ => {}
        }
        let t = f32::from_bits(SIM_TEMPERATURE_BITS.load(Ordering::Relaxed));
        let h = f32::from_bits(SIM_HUMIDITY_BITS.load(Ordering::Relaxed));
        if self.jitter == 0.0 {
            return Ok((t, h));
        }
        let dt = self.wobble() * self.jitter;
        let dh = self.wobble() * self.jitter;
        Ok((t + dt, (h + dh).clamp(0.0, 100.0)))
    }
}
