//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::pipeline::predictor::PredictorKind;

/// Cycle-accurate five-stage MIPS32 pipeline simulator.
#[derive(Parser, Debug)]
#[command(name = "mips5-sim", version, about)]
pub struct Cli {
    /// Path to the assembly source file to simulate.
    pub source: PathBuf,

    /// Emits per-stage trace events on stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// Resolves branches in EX using the named predictor instead of resolving them
    /// in ID.
    #[arg(long, value_enum)]
    pub predictor: Option<PredictorArg>,

    /// Safety bound on simulated cycles. Not part of the architecture; guards
    /// against a program that never drains.
    #[arg(long, default_value_t = 1_000_000)]
    pub max_cycles: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PredictorArg {
    Saturating,
    Bhr,
    Combined,
}

impl From<PredictorArg> for PredictorKind {
    fn from(value: PredictorArg) -> Self {
        match value {
            PredictorArg::Saturating => PredictorKind::Saturating,
            PredictorArg::Bhr => PredictorKind::Bhr,
            PredictorArg::Combined => PredictorKind::Combined,
        }
    }
}
