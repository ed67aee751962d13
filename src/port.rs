use anyhow::Result;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use crate::cli::SerialOpts;

/// Read timeout of a single `read` call; line waits loop over it.
const READ_SLICE: Duration = Duration::from_millis(20);

pub fn open_port(opts: &SerialOpts) -> Result<Box<dyn SerialPort>> {
    let builder = serialport::new(&opts.dev, opts.baud)
        .timeout(READ_SLICE)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None);

    builder
        .open()
        .map_err(|e| anyhow::anyhow!("open {}: {}", opts.dev, e))
}

/// CRLF line framing over a byte stream with a read timeout.
///
/// Bytes of a partially received line are kept across calls, so a read timeout
/// in the middle of a line does not lose data.
pub struct LinePort<P> {
    port: P,
    pending: Vec<u8>,
}

impl<P: Read + Write> LinePort<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            pending: Vec::with_capacity(256),
        }
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &P {
        &self.port
    }

    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        tracing::debug!(line = line.trim_end(), "bridge <-");
        self.port.write_all(line.as_bytes())?;
        if !line.ends_with('\n') {
            self.port.write_all(b"\r\n")?;
        }
        self.port.flush()
    }

    /// Reads one line, waiting at most `timeout`. `None` means the wait expired.
    pub fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>> {
        let start = Instant::now();
        let mut buf = [0u8; 64];
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = self.pending.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if line.is_empty() {
                    continue;
                }
                tracing::debug!(line = line.as_str(), "bridge ->");
                return Ok(Some(line));
            }
            if start.elapsed() >= timeout {
                return Ok(None);
            }
            match self.port.read(&mut buf) {
                Ok(0) => {}
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Reads lines until `f` accepts one or `timeout` expires.
    pub fn wait_for<T>(
        &mut self,
        timeout: Duration,
        mut f: impl FnMut(&str) -> Option<T>,
    ) -> io::Result<Option<T>> {
        let start = Instant::now();
        loop {
            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                return Ok(None);
            }
            match self.read_line(remaining)? {
                Some(line) => {
                    if let Some(v) = f(&line) {
                        return Ok(Some(v));
                    }
                }
                None => return Ok(None),
            }
        }
    }
}
