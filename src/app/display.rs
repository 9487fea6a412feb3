//! Text for the two 16-column display lines.
//!
//! ```text
//!  ┌────────────────┐
//!  │T:25.0C H:50%   │   climate
//!  │P:0.41 NORMAL   │   local decision  /  CMD:ON  (remote command)
//!  └────────────────┘
//! ```

use core::fmt::{self, Write};

use heapless::String;

use crate::sensors::SensorReading;

pub const DISPLAY_COLS: usize = 16;

pub type Line = String<DISPLAY_COLS>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayLines {
    pub top: Line,
    pub bottom: Line,
}

/// `fmt::Write` that silently drops whatever does not fit.
struct Fit<'a>(&'a mut Line);

impl Write for Fit<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

fn fit(args: fmt::Arguments<'_>) -> Line {
    let mut line = Line::new();
    let _ = Fit(&mut line).write_fmt(args);
    line
}

/// Any text, cut at 16 columns.
pub fn fit_str(s: &str) -> Line {
    fit(format_args!("{s}"))
}

pub fn climate_line(r: &SensorReading) -> Line {
    fit(format_args!("T:{:.1}C H:{:.0}%", r.temperature, r.humidity))
}

pub fn decision_line(probability: f32, label: &str) -> Line {
    fit(format_args!("P:{probability:.2} {label}"))
}

pub fn command_line(on: bool) -> Line {
    fit(format_args!("CMD:{}", if on { "ON" } else { "OFF" }))
}

pub fn remote_probability_line(probability: f32) -> Line {
    fit(format_args!("P:{probability:.2} (remote)"))
}

pub fn sensor_fault_line() -> Line {
    fit(format_args!("SENSOR ERROR"))
}
