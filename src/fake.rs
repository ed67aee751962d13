//! Deterministic stand-ins for the IR hardware, driven by a manual clock.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;

use crate::codec::{CapturedSignal, IrCodec, Protocol};
use crate::error::LinkError;
use crate::hal::{Clock, Level, SenseLine, StatusLed};

/// Simulated time each codec poll costs.
pub const POLL_COST_MS: u64 = 5;

#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(0)),
        }
    }

    pub fn now(&self) -> u64 {
        self.now.get()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn millis(&mut self) -> u64 {
        self.now()
    }

    fn delay_ms(&mut self, ms: u64) {
        self.advance(ms);
    }
}

/// Sense line whose level is a function of simulated time. Every sample
/// advances the clock by 1 ms.
pub struct ScriptedLine {
    clock: ManualClock,
    level_at: Box<dyn Fn(u64) -> Level>,
    samples: u64,
}

impl ScriptedLine {
    pub fn new(clock: &ManualClock, level_at: impl Fn(u64) -> Level + 'static) -> Self {
        Self {
            clock: clock.clone(),
            level_at: Box::new(level_at),
            samples: 0,
        }
    }

    pub fn constant(clock: &ManualClock, level: Level) -> Self {
        Self::new(clock, move |_| level)
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}

impl SenseLine for ScriptedLine {
    fn level(&mut self) -> Result<Level, LinkError> {
        let level = (self.level_at)(self.clock.now());
        self.samples += 1;
        self.clock.advance(1);
        Ok(level)
    }
}

/// Records every indicator change with its timestamp.
#[derive(Clone)]
pub struct FakeLed {
    clock: ManualClock,
    transitions: Rc<RefCell<Vec<(u64, bool)>>>,
}

impl FakeLed {
    pub fn new(clock: &ManualClock) -> Self {
        Self {
            clock: clock.clone(),
            transitions: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn transitions(&self) -> Vec<(u64, bool)> {
        self.transitions.borrow().clone()
    }

    /// Number of short on/off pulses, i.e. passed tests.
    pub fn pulses(&self, max_ms: u64) -> usize {
        self.transitions()
            .windows(2)
            .filter(|w| w[0].1 && !w[1].1 && w[1].0 - w[0].0 <= max_ms)
            .count()
    }
}

impl StatusLed for FakeLed {
    fn set(&mut self, on: bool) -> Result<(), LinkError> {
        self.transitions.borrow_mut().push((self.clock.now(), on));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Protocol(Protocol, u32, u8),
    Raw(Vec<u16>, u32),
}

#[derive(Debug, Clone, Default)]
pub struct CodecLog {
    pub sent: Vec<(u64, Sent)>,
    pub arms: usize,
    pub polls: usize,
}

enum Step {
    /// Becomes available `after_ms` after the receiver was last armed.
    Capture { after_ms: u64, signal: CapturedSignal },
    Fault,
}

struct CodecState {
    steps: VecDeque<Step>,
    armed_at: u64,
    log: CodecLog,
}

/// Codec that records transmissions and replays queued captures in order.
/// With nothing queued, polls never produce a capture.
#[derive(Clone)]
pub struct ScriptedCodec {
    clock: ManualClock,
    state: Rc<RefCell<CodecState>>,
}

impl ScriptedCodec {
    pub fn new(clock: &ManualClock) -> Self {
        Self {
            clock: clock.clone(),
            state: Rc::new(RefCell::new(CodecState {
                steps: VecDeque::new(),
                armed_at: 0,
                log: CodecLog::default(),
            })),
        }
    }

    pub fn push_capture(&self, after_ms: u64, signal: CapturedSignal) {
        self.state
            .borrow_mut()
            .steps
            .push_back(Step::Capture { after_ms, signal });
    }

    pub fn push_decoded(&self, after_ms: u64, protocol: Protocol, value: u32, bits: u8) {
        self.push_capture(
            after_ms,
            CapturedSignal {
                protocol: Some(protocol),
                value,
                bits,
                raw: vec![200, 181, 87, 14],
            },
        );
    }

    /// The next poll fails as if the transport broke.
    pub fn push_fault(&self) {
        self.state.borrow_mut().steps.push_back(Step::Fault);
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().steps.len()
    }

    pub fn log(&self) -> CodecLog {
        self.state.borrow().log.clone()
    }
}

impl IrCodec for ScriptedCodec {
    fn encode_protocol(
        &mut self,
        protocol: Protocol,
        value: u32,
        bits: u8,
    ) -> Result<(), LinkError> {
        let now = self.clock.now();
        self.state
            .borrow_mut()
            .log
            .sent
            .push((now, Sent::Protocol(protocol, value, bits)));
        Ok(())
    }

    fn encode_raw(&mut self, timings: &[u16], khz: u32) -> Result<(), LinkError> {
        let now = self.clock.now();
        self.state
            .borrow_mut()
            .log
            .sent
            .push((now, Sent::Raw(timings.to_vec(), khz)));
        Ok(())
    }

    fn begin_capture(&mut self) -> Result<(), LinkError> {
        let mut state = self.state.borrow_mut();
        state.armed_at = self.clock.now();
        state.log.arms += 1;
        Ok(())
    }

    fn try_decode(&mut self) -> Result<Option<CapturedSignal>, LinkError> {
        self.clock.advance(POLL_COST_MS);
        let now = self.clock.now();
        let mut state = self.state.borrow_mut();
        state.log.polls += 1;
        let ready = match state.steps.front() {
            Some(Step::Capture { after_ms, .. }) => now - state.armed_at >= *after_ms,
            Some(Step::Fault) => true,
            None => false,
        };
        if !ready {
            return Ok(None);
        }
        match state.steps.pop_front() {
            Some(Step::Capture { signal, .. }) => Ok(Some(signal)),
            Some(Step::Fault) => Err(LinkError::Bridge("scripted fault".into())),
            None => Ok(None),
        }
    }
}

/// In-memory report sink that can be read back while the writer is boxed.
#[derive(Clone, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
