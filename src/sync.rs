use crate::error::LinkError;
use crate::hal::{Clock, Level, SenseLine};

/// Quiet-period detector aligning the receiver with the sender's cycle start.
///
/// The sense line is high while no carrier is received. The detector fires
/// once the line has stayed high for strictly more than `gap_ms`; any low
/// sample restarts the measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapDetector {
    WaitForHigh,
    MeasureHigh { since: u64 },
}

impl GapDetector {
    pub fn new() -> Self {
        GapDetector::WaitForHigh
    }

    /// Feeds one sample taken at `now`. Returns true when the gap is found.
    pub fn feed(&mut self, level: Level, now: u64, gap_ms: u64) -> bool {
        match (*self, level) {
            (_, Level::Low) => {
                *self = GapDetector::WaitForHigh;
                false
            }
            (GapDetector::WaitForHigh, Level::High) => {
                *self = GapDetector::MeasureHigh { since: now };
                false
            }
            (GapDetector::MeasureHigh { since }, Level::High) => now - since > gap_ms,
        }
    }
}

/// Spins on the sense line until a quiet period longer than `gap_ms` is seen.
///
/// There is no timeout: the sender pauses longer than the gap every cycle.
pub fn wait_for_gap(
    sense: &mut dyn SenseLine,
    clock: &mut dyn Clock,
    gap_ms: u64,
) -> Result<(), LinkError> {
    let mut detector = GapDetector::new();
    loop {
        let level = sense.level()?;
        if detector.feed(level, clock.millis(), gap_ms) {
            tracing::debug!(gap_ms, at = clock.millis(), "gap found");
            return Ok(());
        }
    }
}
