//! GPIO pin assignments for the ESP32 DevKit node board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// DHT22 single-wire data line (open-drain, external 10 kΩ pull-up).
pub const DHT22_DATA_GPIO: i32 = 15;

/// IR flame detector digital output.  LOW = flame.
pub const FLAME_GPIO: i32 = 34;

// ---------------------------------------------------------------------------
// Actuator
// ---------------------------------------------------------------------------

/// Actuator output (on-board LED on the DevKit).  HIGH = on.
pub const ACTUATOR_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Display (16x2 character LCD on a PCF8574 I2C backpack)
// ---------------------------------------------------------------------------

pub const LCD_SDA_GPIO: i32 = 21;
pub const LCD_SCL_GPIO: i32 = 22;
/// 7-bit I2C address of the LCD backpack.
pub const LCD_I2C_ADDR: u8 = 0x27;
