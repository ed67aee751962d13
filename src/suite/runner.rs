use crate::error::LinkError;
use crate::oracle::{Verdict, run_protocol_test, run_raw_test};
use crate::rig::Rig;
use crate::role::Role;
use crate::stats::Stats;
use crate::suite::cases::{Step, cycle_plan};

/// How far one pass over the test plan got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub completed: usize,
    /// Label and verdict of the step that ended the cycle early.
    pub failure: Option<(&'static str, Verdict)>,
}

/// Runs the fixed plan for the node's current role.
///
/// The first failing step ends the cycle: the role is already `Error` and the
/// remaining steps could no longer stay in step with the sender.
pub fn run_cycle(rig: &mut Rig, role: &mut Role, stats: &mut Stats) -> Result<CycleOutcome, LinkError> {
    let plan = cycle_plan(*role);
    let mut completed = 0;

    for step in &plan {
        let verdict = match step {
            Step::Protocol(case) => run_protocol_test(rig, role, case)?,
            Step::Raw(case) => run_raw_test(rig, role, case)?,
        };
        stats.record(&verdict);
        tracing::debug!(label = step.label(), ?verdict, "step");

        if verdict.is_failure() {
            return Ok(CycleOutcome {
                completed,
                failure: Some((step.label(), verdict)),
            });
        }
        completed += 1;
    }

    Ok(CycleOutcome {
        completed,
        failure: None,
    })
}
