use std::{fmt, str::FromStr};

use crate::error::LinkError;

pub mod bridge;

/// Duration of one raw capture tick in microseconds.
pub const TICK_US: u32 = 50;

/// Supported IR protocol families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Nec,
    Sony,
    Rc5,
    Rc6,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Nec => "NEC",
            Protocol::Sony => "SONY",
            Protocol::Rc5 => "RC5",
            Protocol::Rc6 => "RC6",
        })
    }
}

impl FromStr for Protocol {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nec" => Ok(Protocol::Nec),
            "sony" => Ok(Protocol::Sony),
            "rc5" => Ok(Protocol::Rc5),
            "rc6" => Ok(Protocol::Rc6),
            _ => Err(()),
        }
    }
}

/// One capture produced by the codec after `begin_capture`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedSignal {
    /// `None` when the codec captured timing but could not decode it.
    pub protocol: Option<Protocol>,
    pub value: u32,
    pub bits: u8,
    /// Raw timing in ticks. Entry 0 is the gap preceding the signal, then
    /// marks and spaces alternate starting with a mark.
    pub raw: Vec<u16>,
}

impl CapturedSignal {
    pub fn raw_micros(&self, i: usize) -> i64 {
        i64::from(self.raw[i]) * i64::from(TICK_US)
    }
}

/// Encode/decode collaborator driving the IR hardware.
pub trait IrCodec {
    /// Transmit a protocol frame, blocking until it has been sent.
    fn encode_protocol(&mut self, protocol: Protocol, value: u32, bits: u8)
    -> Result<(), LinkError>;

    /// Transmit alternating mark/space durations in microseconds.
    fn encode_raw(&mut self, timings: &[u16], khz: u32) -> Result<(), LinkError>;

    /// Arm the receiver, discarding anything captured so far.
    fn begin_capture(&mut self) -> Result<(), LinkError>;

    /// Non-blocking poll for the capture armed by `begin_capture`.
    fn try_decode(&mut self) -> Result<Option<CapturedSignal>, LinkError>;
}
