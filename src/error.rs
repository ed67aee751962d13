use std::io;

use thiserror::Error;

use crate::proto::parser::ParseError;

/// Failures of the transport between this host and the IR hardware.
///
/// These are distinct from test verdicts: a mismatching capture is a `BAD`
/// result, not a `LinkError`.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("serial i/o: {0}")]
    Io(#[from] io::Error),
    #[error("serial port: {0}")]
    Serial(#[from] serialport::Error),
    #[error("malformed reply: {0}")]
    Parse(#[from] ParseError),
    #[error("no reply to {request} within {timeout_ms} ms")]
    ReplyTimeout { request: &'static str, timeout_ms: u64 },
    #[error("unexpected reply to {request}: {reply}")]
    Unexpected { request: &'static str, reply: String },
    #[error("bridge reported: {0}")]
    Bridge(String),
}
