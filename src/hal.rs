use std::time::{Duration, Instant};

use crate::error::LinkError;

/// Electrical level of the IR sense line.
///
/// The demodulator output is pulled up, so `High` means no carrier is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

/// Monotonic millisecond clock with a blocking delay.
pub trait Clock {
    fn millis(&mut self) -> u64;
    fn delay_ms(&mut self, ms: u64);
}

/// The IR receiver's output line, sampled directly.
pub trait SenseLine {
    fn level(&mut self) -> Result<Level, LinkError>;
}

/// Binary status indicator.
pub trait StatusLed {
    fn set(&mut self, on: bool) -> Result<(), LinkError>;
}

pub struct SystemClock {
    t0: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { t0: Instant::now() }
    }
}

impl Clock for SystemClock {
    fn millis(&mut self) -> u64 {
        self.t0.elapsed().as_millis() as u64
    }

    fn delay_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}
