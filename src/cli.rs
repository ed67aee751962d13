use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ir-hammer",
    about = "Bidirectional IR protocol conformance tester (sender/receiver auto-elected)"
)]
pub struct Cli {
    /// Trace bridge traffic and every test step
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Elect a role and run test cycles against the peer node
    Run(RunOpts),
    /// Sample the sense line once and print the role that would be elected
    Sense(ProbeOpts),
}

#[derive(Args, Debug, Clone)]
pub struct SerialOpts {
    /// Serial device of the IR bridge
    #[arg(long, default_value = "/dev/ttyUSB0")]
    pub dev: String,
    /// Baud rate of the IR bridge
    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,
}

#[derive(Args, Debug, Clone)]
pub struct RunOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// Write the test report to this serial device instead of stdout
    #[arg(long)]
    pub log_dev: Option<String>,
    /// Baud rate of the report device
    #[arg(long, default_value_t = 9_600)]
    pub log_baud: u32,
    /// Stop after this many cycles (default: run forever)
    #[arg(long)]
    pub cycles: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ProbeOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
}
