use crate::codec::Protocol;
use crate::role::Role;

/// Value the NEC decoder reports for a repeat frame.
pub const NEC_REPEAT: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCase {
    pub label: &'static str,
    pub protocol: Protocol,
    pub value: u32,
    pub bits: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTestCase {
    pub label: &'static str,
    /// Alternating mark/space durations in microseconds, starting with a mark.
    pub timings: &'static [u16],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Protocol(TestCase),
    Raw(RawTestCase),
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::Protocol(c) => c.label,
            Step::Raw(c) => c.label,
        }
    }
}

const fn case(label: &'static str, protocol: Protocol, value: u32, bits: u8) -> TestCase {
    TestCase {
        label,
        protocol,
        value,
        bits,
    }
}

pub const PROTOCOL_CASES: [TestCase; 16] = [
    case("SONY1", Protocol::Sony, 0x123, 12),
    case("SONY2", Protocol::Sony, 0x000, 12),
    case("SONY3", Protocol::Sony, 0xfff, 12),
    case("SONY4", Protocol::Sony, 0x12345, 20),
    case("SONY5", Protocol::Sony, 0x00000, 20),
    case("SONY6", Protocol::Sony, 0xfffff, 20),
    case("NEC1", Protocol::Nec, 0x12345678, 32),
    case("NEC2", Protocol::Nec, 0x00000000, 32),
    case("NEC3", Protocol::Nec, 0xffffffff, 32),
    case("NEC4", Protocol::Nec, NEC_REPEAT, 32),
    case("RC51", Protocol::Rc5, 0x12345678, 32),
    case("RC52", Protocol::Rc5, 0x0, 32),
    case("RC53", Protocol::Rc5, 0xffffffff, 32),
    case("RC61", Protocol::Rc6, 0x12345678, 32),
    case("RC62", Protocol::Rc6, 0x0, 32),
    case("RC63", Protocol::Rc6, 0xffffffff, 32),
];

/// NEC frame for 0x12345678 at the raw level: header, 32 bits MSB first, stop.
pub const RAW_SIGNAL: [u16; 67] = [
    8950, 4450,
    600, 500, 600, 500, 600, 500, 600, 1650, 600, 500, 600, 500, 600, 1650, 600, 500,
    600, 500, 600, 500, 600, 1650, 600, 1650, 600, 500, 600, 1650, 600, 500, 600, 500,
    600, 500, 600, 1650, 600, 500, 600, 1650, 600, 500, 600, 1650, 600, 1650, 600, 500,
    600, 500, 600, 1650, 600, 1650, 600, 1650, 600, 1650, 600, 500, 600, 500, 600, 500,
    600,
];

/// The value `RAW_SIGNAL` decodes to.
pub const RAW_SIGNAL_NEC: TestCase = case("", Protocol::Nec, 0x12345678, 32);

fn raw(label: &'static str) -> RawTestCase {
    RawTestCase {
        label,
        timings: &RAW_SIGNAL,
    }
}

/// The ordered steps of one cycle as seen from `role`.
///
/// Both roles walk the same labels in the same order. For RAW2 and RAW3 the
/// representation is crossed: what one side sends raw the other decodes as
/// NEC, and the other way round.
pub fn cycle_plan(role: Role) -> Vec<Step> {
    let mut plan: Vec<Step> = PROTOCOL_CASES.iter().copied().map(Step::Protocol).collect();
    plan.push(Step::Raw(raw("RAW1")));

    let as_nec = |label: &'static str| {
        Step::Protocol(TestCase {
            label,
            ..RAW_SIGNAL_NEC
        })
    };
    if role == Role::Sender {
        plan.push(Step::Raw(raw("RAW2")));
        plan.push(as_nec("RAW3"));
    } else {
        plan.push(as_nec("RAW2"));
        plan.push(Step::Raw(raw("RAW3")));
    }
    plan
}
