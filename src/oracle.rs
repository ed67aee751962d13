use crate::codec::CapturedSignal;
use crate::error::LinkError;
use crate::rig::Rig;
use crate::role::Role;
use crate::suite::cases::{RawTestCase, TestCase};

/// Pause after each transmission so the receiver can re-arm.
pub const INTER_TEST_DELAY_MS: u64 = 200;
pub const CAPTURE_TIMEOUT_MS: u64 = 30_000;
pub const PULSE_MS: u64 = 20;
pub const CARRIER_KHZ: u32 = 38;
/// Receivers stretch marks and shorten spaces by about this much.
pub const MARK_EXCESS_US: i64 = 100;

/// Outcome of one test step on this node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Sender side: the signal went out.
    Sent,
    Pass,
    Timeout,
    /// Decoded (protocol, value, bits) differs from the expectation.
    Mismatch,
    BadLength { got: usize },
    OutOfTolerance { index: usize, expected: u16, got: i64 },
    /// The node was already in error; nothing was done.
    Skipped,
}

impl Verdict {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Verdict::Timeout
                | Verdict::Mismatch
                | Verdict::BadLength { .. }
                | Verdict::OutOfTolerance { .. }
        )
    }
}

/// True when `got` lies within 25 % of `expected` in either direction:
/// neither `expected * 1.25 < got` nor `got * 1.25 < expected`.
pub fn within_tolerance(expected: u16, got: i64) -> bool {
    let exp = i64::from(expected);
    !(5 * exp < 4 * got || 5 * got < 4 * exp)
}

/// Checks a capture against the raw timings that were sent.
///
/// The capture carries one extra leading entry for the gap before the
/// signal. Marks (even positions of `expected`) are corrected down by
/// `MARK_EXCESS_US`, spaces up by the same amount. The first sample outside
/// tolerance decides.
pub fn check_raw(expected: &[u16], sig: &CapturedSignal) -> Result<(), Verdict> {
    if sig.raw.len() != expected.len() + 1 {
        return Err(Verdict::BadLength { got: sig.raw.len() });
    }
    for (index, &exp) in expected.iter().enumerate() {
        let measured = sig.raw_micros(index + 1);
        let got = if index % 2 == 1 {
            measured + MARK_EXCESS_US
        } else {
            measured - MARK_EXCESS_US
        };
        if !within_tolerance(exp, got) {
            return Err(Verdict::OutOfTolerance {
                index,
                expected: exp,
                got,
            });
        }
    }
    Ok(())
}

pub fn run_protocol_test(
    rig: &mut Rig,
    role: &mut Role,
    case: &TestCase,
) -> Result<Verdict, LinkError> {
    match *role {
        Role::Sender => {
            rig.codec
                .encode_protocol(case.protocol, case.value, case.bits)?;
            rig.console.line(case.label);
            rig.clock.delay_ms(INTER_TEST_DELAY_MS);
            Ok(Verdict::Sent)
        }
        Role::Receiver => {
            let Some(sig) = await_capture(rig)? else {
                return Ok(fail(rig, role, case.label, Verdict::Timeout, None));
            };
            let matches = sig.protocol == Some(case.protocol)
                && sig.value == case.value
                && sig.bits == case.bits;
            if matches {
                pass(rig, case.label)?;
                Ok(Verdict::Pass)
            } else {
                Ok(fail(rig, role, case.label, Verdict::Mismatch, Some(&sig)))
            }
        }
        Role::Error => Ok(Verdict::Skipped),
    }
}

pub fn run_raw_test(
    rig: &mut Rig,
    role: &mut Role,
    case: &RawTestCase,
) -> Result<Verdict, LinkError> {
    match *role {
        Role::Sender => {
            rig.codec.encode_raw(case.timings, CARRIER_KHZ)?;
            rig.console.line(case.label);
            rig.clock.delay_ms(INTER_TEST_DELAY_MS);
            Ok(Verdict::Sent)
        }
        Role::Receiver => {
            let Some(sig) = await_capture(rig)? else {
                return Ok(fail(rig, role, case.label, Verdict::Timeout, None));
            };
            match check_raw(case.timings, &sig) {
                Ok(()) => {
                    pass(rig, case.label)?;
                    Ok(Verdict::Pass)
                }
                Err(verdict) => Ok(fail(rig, role, case.label, verdict, Some(&sig))),
            }
        }
        Role::Error => Ok(Verdict::Skipped),
    }
}

/// Arms the receiver and polls until a capture arrives or the deadline,
/// counted from this call, passes.
fn await_capture(rig: &mut Rig) -> Result<Option<CapturedSignal>, LinkError> {
    let deadline = rig.clock.millis() + CAPTURE_TIMEOUT_MS;
    rig.codec.begin_capture()?;
    loop {
        if let Some(sig) = rig.codec.try_decode()? {
            return Ok(Some(sig));
        }
        if rig.clock.millis() > deadline {
            return Ok(None);
        }
    }
}

fn pass(rig: &mut Rig, label: &str) -> Result<(), LinkError> {
    rig.console.outcome(label, "OK");
    rig.led.set(true)?;
    rig.clock.delay_ms(PULSE_MS);
    rig.led.set(false)
}

fn fail(
    rig: &mut Rig,
    role: &mut Role,
    label: &str,
    verdict: Verdict,
    sig: Option<&CapturedSignal>,
) -> Verdict {
    match &verdict {
        Verdict::Timeout => rig.console.outcome(label, "Timeout receiving data"),
        Verdict::BadLength { got } => {
            rig.console
                .outcome(label, &format!("Bad raw length {}", got))
        }
        _ => rig.console.outcome(label, "BAD"),
    }
    if let (Verdict::Mismatch | Verdict::OutOfTolerance { .. }, Some(sig)) = (&verdict, sig) {
        rig.console.dump(sig);
    }
    tracing::warn!(label, ?verdict, "test failed");
    *role = Role::Error;
    verdict
}
