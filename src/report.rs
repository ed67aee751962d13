use std::fmt::Write as _;
use std::io::Write;

use crate::codec::CapturedSignal;
use crate::role::Role;

pub const BANNER: &str = "IR link conformance tester";

/// The human-readable test report, one CRLF-terminated line per event.
///
/// Write failures are traced and otherwise ignored; losing a report line must
/// not stop the test loop.
pub struct Console {
    out: Box<dyn Write>,
}

impl Console {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out }
    }

    pub fn line(&mut self, text: &str) {
        let res = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.write_all(b"\r\n"))
            .and_then(|_| self.out.flush());
        if let Err(e) = res {
            tracing::warn!(error = %e, "report write failed");
        }
    }

    pub fn banner(&mut self) {
        self.line(BANNER);
    }

    pub fn role(&mut self, role: Role) {
        match role {
            Role::Sender => self.line("Sender mode"),
            Role::Receiver => self.line("Receiver mode"),
            Role::Error => self.line("Error mode"),
        }
    }

    pub fn outcome(&mut self, label: &str, text: &str) {
        self.line(&format!("{}: {}", label, text));
    }

    pub fn dump(&mut self, sig: &CapturedSignal) {
        for l in format_dump(sig) {
            self.line(&l);
        }
    }
}

/// Renders a capture for diagnostics: the decoded summary, then every raw
/// entry in microseconds with marks negative and spaces positive.
pub fn format_dump(sig: &CapturedSignal) -> [String; 2] {
    let summary = match sig.protocol {
        Some(p) => format!("Decoded {}: {:X} ({} bits)", p, sig.value, sig.bits),
        None => "Could not decode message".to_string(),
    };

    let mut raw = format!("Raw ({}): ", sig.raw.len());
    for i in 0..sig.raw.len() {
        // Entry 0 is the leading gap, so marks sit at odd indices.
        let us = sig.raw_micros(i);
        let signed = if i % 2 == 1 { -us } else { us };
        let _ = write!(raw, "{} ", signed);
    }
    [summary, raw.trim_end().to_string()]
}
