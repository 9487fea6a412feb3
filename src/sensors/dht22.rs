//! DHT22 / AM2302 temperature + humidity sensor (single-wire).
//!
//! ```text
//!  host   ▔▔▔▁▁▁▁(1.1 ms)▁▁▁▁▔▔(30 µs)
//!  sensor                      ▁▁(80 µs)▔▔(80 µs)  then 40 bits:
//!                              ▁(50 µs)▔(26 µs)=0  ▁(50 µs)▔(70 µs)=1
//! ```
//!
//! Frame: humidity ×10 (u16), temperature ×10 (sign bit 15), checksum =
//! low byte of the sum of the first four bytes.  The sensor needs ≥2 s
//! between reads, which the 3 s tick satisfies.
//!
//! The data line is driven open-drain, so one pin type provides both
//! `InputPin` and `OutputPin`.  Pulse widths are measured by polling in
//! 1 µs steps; every wait is bounded, so a missing sensor costs at most a
//! few milliseconds and yields [`SensorError::Timeout`].

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use super::ClimateSource;
use crate::error::SensorError;

const START_LOW_US: u32 = 1_100;
const RELEASE_US: u32 = 30;
const RESPONSE_TIMEOUT_US: u32 = 100;
const BIT_LOW_TIMEOUT_US: u32 = 70;
const BIT_HIGH_TIMEOUT_US: u32 = 100;
/// High pulses longer than this are a `1` bit.
const BIT_ONE_THRESHOLD_US: u32 = 40;

pub struct Dht22<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> Dht22<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    /// Release the pin and delay provider.
    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }

    /// Run one full transaction and return the decoded frame.
    pub fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        // Start signal.
        self.pin.set_low().map_err(|_| SensorError::Bus)?;
        self.delay.delay_us(START_LOW_US);
        self.pin.set_high().map_err(|_| SensorError::Bus)?;
        self.delay.delay_us(RELEASE_US);

        // Response: sensor pulls low, then high, then starts the first bit.
        self.wait_while(true, RESPONSE_TIMEOUT_US)?;
        self.wait_while(false, RESPONSE_TIMEOUT_US)?;
        self.wait_while(true, RESPONSE_TIMEOUT_US)?;

        let mut frame = [0u8; 5];
        for bit in 0..40 {
            self.wait_while(false, BIT_LOW_TIMEOUT_US)?;
            let high_us = self.wait_while(true, BIT_HIGH_TIMEOUT_US)?;
            if high_us > BIT_ONE_THRESHOLD_US {
                frame[bit / 8] |= 0x80 >> (bit % 8);
            }
        }
        Ok(frame)
    }

    /// Poll until the line leaves `level`; returns the time spent.
    fn wait_while(&mut self, level: bool, timeout_us: u32) -> Result<u32, SensorError> {
        let mut elapsed = 0;
        while self.pin.is_high().map_err(|_| SensorError::Bus)? == level {
            if elapsed >= timeout_us {
                return Err(SensorError::Timeout);
            }
            self.delay.delay_us(1);
            elapsed += 1;
        }
        Ok(elapsed)
    }
}

impl<P, D> ClimateSource for Dht22<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn read_climate(&mut self) -> Result<(f32, f32), SensorError> {
        let frame = self.read_frame()?;
        decode_frame(&frame)
    }
}

/// Verify the checksum and convert a raw frame to `(°C, %RH)`.
pub fn decode_frame(frame: &[u8; 5]) -> Result<(f32, f32), SensorError> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(SensorError::Checksum);
    }
    let humidity = f32::from(u16::from_be_bytes([frame[0], frame[1]])) / 10.0;
    let magnitude = f32::from(u16::from_be_bytes([frame[2] & 0x7F, frame[3]])) / 10.0;
    let temperature = if frame[2] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    };
    Ok((temperature, humidity))
}
