use anyhow::{Context, Result};
use std::io::Write;

use crate::cli::{ProbeOpts, RunOpts, SerialOpts};
use crate::codec::bridge::Bridge;
use crate::error::LinkError;
use crate::hal::{Level, SenseLine, SystemClock};
use crate::port::open_port;
use crate::report::Console;
use crate::rig::Rig;
use crate::role::{Role, detect_role};
use crate::stats::Stats;
use crate::suite::runner::run_cycle;
use crate::sync::wait_for_gap;

/// Sender pause before each cycle; longer than `GAP_MS` so receivers can sync.
pub const SENDER_PAUSE_MS: u64 = 2_000;
pub const GAP_MS: u64 = 1_000;
pub const ERROR_HOLD_MS: u64 = 5_000;

const HELLO_INITIAL_MS: u64 = 100;
const HELLO_MAX_MS: u64 = 2_000;

/// One node of the link: its rig, its current role and running totals.
pub struct Node {
    rig: Rig,
    role: Role,
    stats: Stats,
}

impl Node {
    /// Prints the banner and elects the role from the idle sense line.
    pub fn start(mut rig: Rig) -> Result<Self, LinkError> {
        rig.console.banner();
        let role = detect_role(&mut *rig.sense, &mut *rig.codec, &mut *rig.led)?;
        rig.console.role(role);
        tracing::info!(?role, "role elected");
        Ok(Self {
            rig,
            role,
            stats: Stats::new(),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// One pass of the run loop: pace or resynchronise according to the role,
    /// then run the test plan once.
    pub fn step(&mut self) {
        if let Err(e) = self.try_step() {
            self.stats.inc_link_errors();
            tracing::error!(error = %e, role = ?self.role, "link error during cycle");
            self.rig.console.line(&format!("Link error: {}", e));
            // A receiver that lost the link has lost sync too. A sender just
            // starts over; its receiver will time out and resynchronise.
            if self.role == Role::Receiver {
                self.role = Role::Error;
            }
        }
        self.stats.inc_cycles();
        self.stats.log(self.role);
    }

    fn try_step(&mut self) -> Result<(), LinkError> {
        match self.role {
            Role::Sender => self.rig.clock.delay_ms(SENDER_PAUSE_MS),
            Role::Receiver => self.sync()?,
            Role::Error => {
                self.rig.led.set(true)?;
                self.rig.clock.delay_ms(ERROR_HOLD_MS);
                self.rig.led.set(false)?;
                self.role = Role::Receiver;
                self.sync()?;
            }
        }

        let outcome = run_cycle(&mut self.rig, &mut self.role, &mut self.stats)?;
        if let Some((label, verdict)) = outcome.failure {
            tracing::warn!(label, ?verdict, completed = outcome.completed, "cycle aborted");
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<(), LinkError> {
        wait_for_gap(&mut *self.rig.sense, &mut *self.rig.clock, GAP_MS)
    }

    /// Runs `cycles` passes of the loop, or forever when `None`.
    pub fn run(&mut self, cycles: Option<u64>) {
        let mut done = 0u64;
        while cycles.is_none_or(|max| done < max) {
            self.step();
            done += 1;
        }
    }
}

pub fn run(opts: RunOpts) -> Result<()> {
    let bridge = connect(&opts.ser)?;
    let (codec, sense, led) = bridge.into_parts();

    let out: Box<dyn Write> = match &opts.log_dev {
        Some(dev) => {
            let log = SerialOpts {
                dev: dev.clone(),
                baud: opts.log_baud,
            };
            let port = open_port(&log).with_context(|| format!("opening log port {}", dev))?;
            Box::new(port)
        }
        None => Box::new(std::io::stdout()),
    };

    let rig = Rig {
        codec: Box::new(codec),
        sense: Box::new(sense),
        led: Box::new(led),
        clock: Box::new(SystemClock::new()),
        console: Console::new(out),
    };

    let mut node = Node::start(rig).context("electing role")?;
    node.run(opts.cycles);
    tracing::info!(stats = ?node.stats(), "finished");
    Ok(())
}

/// Samples the sense line once and reports the role this node would take.
pub fn probe(opts: ProbeOpts) -> Result<()> {
    let bridge = connect(&opts.ser)?;
    let (_codec, mut sense, _led) = bridge.into_parts();
    let level = sense.level().context("sampling sense line")?;
    let role = match level {
        Level::High => Role::Receiver,
        Level::Low => Role::Sender,
    };
    println!("sense={:?} role={:?}", level, role);
    Ok(())
}

fn connect(ser: &SerialOpts) -> Result<Bridge<Box<dyn serialport::SerialPort>>> {
    let port = open_port(ser).with_context(|| format!("opening bridge on {}", ser.dev))?;
    let mut bridge = Bridge::new(port);
    let my_id = format!("ir-hammer-{}", std::process::id());
    bridge
        .handshake(&my_id, HELLO_INITIAL_MS, HELLO_MAX_MS)
        .with_context(|| format!("handshake with bridge on {}", ser.dev))?;
    Ok(bridge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CapturedSignal, Protocol, TICK_US};
    use crate::fake::Sent;
    use crate::oracle::{CAPTURE_TIMEOUT_MS, MARK_EXCESS_US, PULSE_MS};
    use crate::rig::testing::FakeRig;
    use crate::suite::cases::{PROTOCOL_CASES, RAW_SIGNAL};

    fn start(fake_rig: (FakeRig, Rig)) -> (FakeRig, Node) {
        let (fake, rig) = fake_rig;
        let node = Node::start(rig).unwrap();
        (fake, node)
    }

    /// What a healthy receiver captures when the sender emits `RAW_SIGNAL`.
    fn raw_capture() -> CapturedSignal {
        let mut raw = vec![4000];
        for (i, &t) in RAW_SIGNAL.iter().enumerate() {
            let us = i64::from(t);
            let skewed = if i % 2 == 0 { us + MARK_EXCESS_US } else { us - MARK_EXCESS_US };
            raw.push((skewed / i64::from(TICK_US)) as u16);
        }
        CapturedSignal {
            protocol: None,
            value: 0,
            bits: 0,
            raw,
        }
    }

    /// Queues the captures of one perfect receiver cycle.
    fn queue_good_cycle(fake: &FakeRig) {
        for c in PROTOCOL_CASES {
            fake.codec.push_decoded(150, c.protocol, c.value, c.bits);
        }
        fake.codec.push_capture(150, raw_capture());
        fake.codec.push_decoded(150, Protocol::Nec, 0x12345678, 32);
        fake.codec.push_capture(150, raw_capture());
    }

    #[test]
    fn startup_prints_banner_and_role() {
        let (fake, node) = start(FakeRig::quiet());
        assert_eq!(node.role(), Role::Receiver);
        assert_eq!(
            fake.out.lines(),
            vec![crate::report::BANNER.to_string(), "Receiver mode".to_string()]
        );
    }

    #[test]
    fn sender_pauses_then_sends_every_case() {
        let (fake, mut node) = start(FakeRig::new(|_| Level::Low));
        assert_eq!(node.role(), Role::Sender);
        node.run(Some(2));
        let sent = fake.codec.log().sent;
        assert_eq!(sent.len(), 38);
        // Startup took one 1 ms sense sample; then the pause.
        assert_eq!(sent[0].0, 1 + SENDER_PAUSE_MS);
        assert_eq!(node.role(), Role::Sender);
        assert_eq!(node.stats().cycles, 2);
        assert!(fake.led.transitions().is_empty());
    }

    #[test]
    fn receiver_waits_for_gap_before_first_test() {
        let (fake, mut node) = start(FakeRig::quiet());
        queue_good_cycle(&fake);
        node.run(Some(1));
        let t = fake.led.transitions();
        // Role detection drove the LED low at t=1; first pulse after the gap.
        assert_eq!(t[0], (1, false));
        assert!(t[1].0 > GAP_MS);
    }

    #[test]
    fn scenario_a_nec1_ok_and_one_pulse() {
        let (fake, mut node) = start(FakeRig::quiet());
        queue_good_cycle(&fake);
        node.run(Some(1));

        let lines = fake.out.lines();
        assert!(lines.contains(&"NEC1: OK".to_string()));
        assert_eq!(fake.led.pulses(PULSE_MS), 19);
        assert_eq!(node.stats().passed, 19);
        assert_eq!(node.role(), Role::Receiver);
    }

    #[test]
    fn scenario_b_raw1_accepted() {
        let (fake, mut node) = start(FakeRig::quiet());
        queue_good_cycle(&fake);
        node.run(Some(1));
        let lines = fake.out.lines();
        assert!(lines.contains(&"RAW1: OK".to_string()));
        assert!(lines.contains(&"RAW2: OK".to_string()));
        assert!(lines.contains(&"RAW3: OK".to_string()));
        assert_eq!(node.stats().failed, 0);
    }

    #[test]
    fn scenario_c_timeout_holds_indicator_then_resyncs() {
        let (fake, mut node) = start(FakeRig::quiet());

        node.run(Some(1));
        assert_eq!(node.role(), Role::Error);
        assert_eq!(
            fake.out.lines().last().map(String::as_str),
            Some("SONY1: Timeout receiving data")
        );
        assert_eq!(node.stats().timeouts, 1);
        let failed_at = fake.clock.now();
        assert!(failed_at > GAP_MS + CAPTURE_TIMEOUT_MS);

        queue_good_cycle(&fake);
        node.run(Some(1));
        let t = fake.led.transitions();
        // Transition 0 is the initial off from role detection.
        assert_eq!(t[1], (failed_at, true));
        assert_eq!(t[2], (failed_at + ERROR_HOLD_MS, false));
        // The next pulse only comes after a fresh gap.
        assert!(t[3].0 > failed_at + ERROR_HOLD_MS + GAP_MS);
        assert_eq!(node.role(), Role::Receiver);
        assert_eq!(node.stats().passed, 19);
    }

    #[test]
    fn receiver_link_error_enters_error_state() {
        let (fake, mut node) = start(FakeRig::quiet());
        fake.codec.push_fault();
        node.run(Some(1));
        assert_eq!(node.role(), Role::Error);
        assert_eq!(node.stats().link_errors, 1);
        assert!(
            fake.out
                .lines()
                .last()
                .is_some_and(|l| l.starts_with("Link error: "))
        );
    }

    #[test]
    fn sender_plan_uses_raw_then_nec_for_crossed_steps() {
        let (fake, mut node) = start(FakeRig::new(|_| Level::Low));
        node.run(Some(1));
        let sent = fake.codec.log().sent;
        assert!(matches!(sent[17].1, Sent::Raw(..)));
        assert!(matches!(sent[18].1, Sent::Protocol(Protocol::Nec, 0x12345678, 32)));
    }
}
