//! Display adapter.
//!
//! The node's 16x2 character LCD is driven by board support code outside
//! this crate; here the two lines are rendered to the log, and only when
//! they change so a steady state does not flood the console.

use log::info;

use crate::app::display::DisplayLines;
use crate::app::ports::DisplayPort;

#[derive(Default)]
pub struct LogDisplay {
    last: DisplayLines,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines most recently shown.
    pub fn current(&self) -> &DisplayLines {
        &self.last
    }
}

impl DisplayPort for LogDisplay {
    fn show(&mut self, lines: &DisplayLines) {
        if *lines == self.last {
            return;
        }
        info!("LCD | {:<16} | {:<16} |", lines.top.as_str(), lines.bottom.as_str());
        self.last = lines.clone();
    }
}
