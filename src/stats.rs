use crate::oracle::Verdict;
use crate::role::Role;

/// Running totals over the life of the node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub cycles: u64,
    pub sent: u64,
    pub passed: u64,
    pub failed: u64,
    pub timeouts: u64,
    pub link_errors: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, verdict: &Verdict) {
        match verdict {
            Verdict::Sent => self.sent += 1,
            Verdict::Pass => self.passed += 1,
            Verdict::Timeout => {
                self.timeouts += 1;
                self.failed += 1;
            }
            Verdict::Mismatch | Verdict::BadLength { .. } | Verdict::OutOfTolerance { .. } => {
                self.failed += 1
            }
            Verdict::Skipped => {}
        }
    }

    pub fn inc_cycles(&mut self) {
        self.cycles += 1;
    }

    pub fn inc_link_errors(&mut self) {
        self.link_errors += 1;
    }

    pub fn log(&self, role: Role) {
        tracing::info!(
            ?role,
            cycles = self.cycles,
            sent = self.sent,
            passed = self.passed,
            failed = self.failed,
            timeouts = self.timeouts,
            link_errors = self.link_errors,
            "cycle done"
        );
    }
}
