//! The conformance test table and the per-cycle sequencer.

pub mod cases;
pub mod runner;
