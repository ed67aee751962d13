//! IR transceiver bridge reached over a serial line.
//!
//! The bridge firmware owns the IR emitter, the demodulating receiver and the
//! status LED, and exposes them through the line protocol in `crate::proto`.
//! One `Bridge` is shared by the codec, sense-line and LED handles returned
//! from [`Bridge::into_parts`].

use std::cell::RefCell;
use std::io::{Read, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::{CapturedSignal, IrCodec, Protocol};
use crate::error::LinkError;
use crate::hal::{Level, SenseLine, StatusLed};
use crate::port::LinePort;
use crate::proto::command::{BridgeMsg, LineLevel};
use crate::proto::parser::{format_msg, parse_msg};

const REPLY_TIMEOUT: Duration = Duration::from_millis(2_000);

pub struct Bridge<P> {
    link: LinePort<P>,
}

impl<P: Read + Write> Bridge<P> {
    pub fn new(port: P) -> Self {
        Self {
            link: LinePort::new(port),
        }
    }

    /// Repeats HELLO with exponential backoff until the bridge answers.
    /// Returns the bridge id.
    pub fn handshake(
        &mut self,
        my_id: &str,
        initial_ms: u64,
        max_ms: u64,
    ) -> Result<String, LinkError> {
        let mut backoff = initial_ms.max(50);
        loop {
            let hello = BridgeMsg::Hello {
                id: my_id.to_string(),
            };
            self.link.write_line(&format_msg(&hello))?;

            let ack = self
                .link
                .wait_for(Duration::from_millis(backoff), |line| {
                    match parse_msg(line) {
                        Ok(BridgeMsg::Ack { id }) => Some(id),
                        _ => None,
                    }
                })?;
            if let Some(id) = ack {
                tracing::info!(bridge = id.as_str(), "bridge connected");
                return Ok(id);
            }
            tracing::debug!(backoff_ms = backoff, "no ACK from bridge, retrying");
            backoff = (backoff.saturating_mul(2)).min(max_ms.max(initial_ms));
        }
    }

    /// Sends `msg` and returns the first well-formed reply.
    fn request(&mut self, msg: &BridgeMsg) -> Result<BridgeMsg, LinkError> {
        let request = msg.tag();
        self.link.write_line(&format_msg(msg))?;

        let start = Instant::now();
        loop {
            let remaining = REPLY_TIMEOUT.saturating_sub(start.elapsed());
            let line = self
                .link
                .read_line(remaining)?
                .ok_or(LinkError::ReplyTimeout {
                    request,
                    timeout_ms: REPLY_TIMEOUT.as_millis() as u64,
                })?;
            match parse_msg(&line) {
                Ok(BridgeMsg::Err { reason }) => return Err(LinkError::Bridge(reason)),
                // A late ACK from a repeated HELLO is harmless.
                Ok(BridgeMsg::Ack { .. }) => continue,
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    tracing::warn!(error = %e, line = line.as_str(), "skipping malformed line");
                }
            }
        }
    }

    fn expect_ok(&mut self, msg: &BridgeMsg) -> Result<(), LinkError> {
        match self.request(msg)? {
            BridgeMsg::Ok => Ok(()),
            other => Err(LinkError::Unexpected {
                request: msg.tag(),
                reply: format!("{:?}", other),
            }),
        }
    }

    pub fn into_parts(self) -> (BridgeCodec<P>, BridgeSense<P>, BridgeLed<P>) {
        let shared = Rc::new(RefCell::new(self));
        (
            BridgeCodec(Rc::clone(&shared)),
            BridgeSense(Rc::clone(&shared)),
            BridgeLed(shared),
        )
    }
}

pub struct BridgeCodec<P>(Rc<RefCell<Bridge<P>>>);
pub struct BridgeSense<P>(Rc<RefCell<Bridge<P>>>);
pub struct BridgeLed<P>(Rc<RefCell<Bridge<P>>>);

impl<P: Read + Write> IrCodec for BridgeCodec<P> {
    fn encode_protocol(
        &mut self,
        protocol: Protocol,
        value: u32,
        bits: u8,
    ) -> Result<(), LinkError> {
        self.0.borrow_mut().expect_ok(&BridgeMsg::Encode {
            protocol,
            value,
            bits,
        })
    }

    fn encode_raw(&mut self, timings: &[u16], khz: u32) -> Result<(), LinkError> {
        self.0.borrow_mut().expect_ok(&BridgeMsg::EncodeRaw {
            khz,
            timings: timings.to_vec(),
        })
    }

    fn begin_capture(&mut self) -> Result<(), LinkError> {
        self.0.borrow_mut().expect_ok(&BridgeMsg::CaptureArm)
    }

    fn try_decode(&mut self) -> Result<Option<CapturedSignal>, LinkError> {
        match self.0.borrow_mut().request(&BridgeMsg::CapturePoll)? {
            BridgeMsg::CapturePending => Ok(None),
            BridgeMsg::CaptureDone {
                protocol,
                value,
                bits,
                raw,
            } => Ok(Some(CapturedSignal {
                protocol,
                value,
                bits,
                raw,
            })),
            other => Err(LinkError::Unexpected {
                request: "CAPTURE POLL",
                reply: format!("{:?}", other),
            }),
        }
    }
}

impl<P: Read + Write> SenseLine for BridgeSense<P> {
    fn level(&mut self) -> Result<Level, LinkError> {
        match self.0.borrow_mut().request(&BridgeMsg::Sense)? {
            BridgeMsg::Level {
                level: LineLevel::High,
            } => Ok(Level::High),
            BridgeMsg::Level {
                level: LineLevel::Low,
            } => Ok(Level::Low),
            other => Err(LinkError::Unexpected {
                request: "SENSE",
                reply: format!("{:?}", other),
            }),
        }
    }
}

impl<P: Read + Write> StatusLed for BridgeLed<P> {
    fn set(&mut self, on: bool) -> Result<(), LinkError> {
        self.0.borrow_mut().expect_ok(&BridgeMsg::Led { on })
    }
}
