//! The cycle loop: calls the five stages in order `WB, MEM, EX, ID, IF` every cycle,
//! reports the resulting architectural state, and stops once the `Drained` sentinel
//! has propagated all the way through to writeback.

use std::io::Write;

use crate::cpu::Simulator;
use crate::error::{ExecutionError, SimulatorError, SimulatorResult};
use crate::instruction::Instruction;
use crate::pipeline::latches::{Latch, PipelineLatches};
use crate::pipeline::predictor::{Predictor, PredictorKind};
use crate::pipeline::stages;
use crate::report;

#[derive(Clone, Copy, Debug)]
pub enum RunMode {
    Baseline,
    Predicted(PredictorKind),
}

pub fn run(cpu: &mut Simulator, mode: RunMode, max_cycles: u64, out: &mut impl Write) -> SimulatorResult<()> {
    match mode {
        RunMode::Baseline => run_baseline(cpu, max_cycles, out),
        RunMode::Predicted(kind) => run_predicted(cpu, kind, max_cycles, out),
    }
}

fn run_baseline(cpu: &mut Simulator, max_cycles: u64, out: &mut impl Write) -> SimulatorResult<()> {
    let mut current = PipelineLatches::default();

    loop {
        cpu.cycle += 1;
        if cpu.cycle > max_cycles {
            return Err(ExecutionError::CycleLimit(max_cycles).into());
        }
        let _span = tracing::debug_span!("cycle", cycle = cpu.cycle).entered();

        let mut next = PipelineLatches::default();
        let drains_this_cycle = current.mem_wb.is_drained();

        stages::writeback(cpu, &current);
        stages::memory_access(cpu, &current, &mut next)?;
        stages::execute(cpu, &current, &mut next);
        let stalled = stages::decode(cpu, &current, &mut next, true)?;
        if cpu.cycle > 1 {
            stages::fetch(cpu, &current, &mut next, stalled);
        }

        report::write_cycle_report(out, &cpu.registers.snapshot(), &cpu.memory_delta)
            .map_err(SimulatorError::Io)?;
        cpu.memory_delta.clear();

        current = next;
        if drains_this_cycle {
            return Ok(());
        }
    }
}

fn run_predicted(
    cpu: &mut Simulator,
    kind: PredictorKind,
    max_cycles: u64,
    out: &mut impl Write,
) -> SimulatorResult<()> {
    let mut predictor = Predictor::new(kind);
    let mut current = PipelineLatches::default();

    loop {
        cpu.cycle += 1;
        if cpu.cycle > max_cycles {
            return Err(ExecutionError::CycleLimit(max_cycles).into());
        }
        let _span = tracing::debug_span!("cycle", cycle = cpu.cycle).entered();

        let mut next = PipelineLatches::default();
        let drains_this_cycle = current.mem_wb.is_drained();

        stages::writeback(cpu, &current);
        stages::memory_access(cpu, &current, &mut next)?;
        stages::execute(cpu, &current, &mut next);
        let stalled = stages::decode(cpu, &current, &mut next, false)?;
        if cpu.cycle > 1 {
            stages::fetch_predicted(cpu, &current, &mut next, stalled, &predictor);
        }

        resolve_branch_prediction(cpu, &mut next, &mut predictor);

        report::write_cycle_report(out, &cpu.registers.snapshot(), &cpu.memory_delta)
            .map_err(SimulatorError::Io)?;
        cpu.memory_delta.clear();

        current = next;
        if drains_this_cycle {
            return Ok(());
        }
    }
}

/// Updates the predictor from this cycle's resolved branch and, on a misprediction,
/// squashes the two younger in-flight instructions and redirects the PC.
fn resolve_branch_prediction(cpu: &mut Simulator, next: &mut PipelineLatches, predictor: &mut Predictor) {
    let Latch::Op(executed) = &next.ex_mem else {
        return;
    };
    let Instruction::Branch { label, .. } = &executed.instr else {
        return;
    };

    predictor.update(executed.pc as u32, executed.branch_taken);
    if executed.branch_taken == executed.predicted_taken {
        return;
    }

    tracing::debug!(
        cycle = cpu.cycle,
        pc = executed.pc,
        actual = executed.branch_taken,
        predicted = executed.predicted_taken,
        "branch misprediction, squashing"
    );

    let correct_pc = if executed.branch_taken {
        cpu.program
            .labels
            .resolve(label)
            .expect("branch target was already validated in decode")
    } else {
        executed.pc + 1
    };
    cpu.pc = correct_pc;

    if let Latch::Op(decoded) = &next.id_ex {
        if let Some(rd) = decoded.instr.destination() {
            cpu.hazards.release(rd);
        }
    }
    next.if_id = Latch::Empty;
    next.id_ex = Latch::Empty;
}
