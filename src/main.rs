use std::fs;
use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mips5_sim::assembler;
use mips5_sim::cli::Cli;
use mips5_sim::cpu::Simulator;
use mips5_sim::error::SimulatorError;
use mips5_sim::pipeline::driver::{self, RunMode};
use mips5_sim::report;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Assembly/Execution errors are logged where they're constructed in
            // error.rs; an `Io` error never passes through there, so it's logged here.
            if matches!(err, SimulatorError::Io(_)) {
                tracing::error!(%err, "fatal io error");
            }
            let mut stderr = io::stderr();
            let tokens = err.offending_tokens().to_vec();
            let _ = report::write_fault(&mut stderr, &err.to_string(), &tokens);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), SimulatorError> {
    let source = fs::read_to_string(&cli.source)?;
    let program = assembler::assemble(&source)?;
    let mut cpu = Simulator::new(program);

    let mode = match cli.predictor {
        Some(kind) => RunMode::Predicted(kind.into()),
        None => RunMode::Baseline,
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    driver::run(&mut cpu, mode, cli.max_cycles, &mut handle)
}
