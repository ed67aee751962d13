use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod codec;
mod error;
#[cfg(test)]
mod fake;
mod hal;
mod node;
mod oracle;
mod port;
mod proto;
mod report;
mod rig;
mod role;
mod stats;
mod suite;
mod sync;

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let default = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match args.cmd {
        cli::Cmd::Run(opts) => node::run(opts),
        cli::Cmd::Sense(opts) => node::probe(opts),
    }
}
