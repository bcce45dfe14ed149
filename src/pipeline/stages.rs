//! The five stage functions. Each reads the previous cycle's latch out of `current`
//! and writes this cycle's result into `next`; none of them swap the latches
//! themselves, that is the driver's job.

use crate::alu::{self, AluOp};
use crate::assembler::is_valid_label_name;
use crate::cpu::Simulator;
use crate::error::{attach_tokens, fault, ExecutionError, SimulatorResult};
use crate::instruction::Instruction;
use crate::pipeline::latches::{
    CompletedInstruction, DecodedInstruction, ExecutedInstruction, FetchedInstruction, Latch,
    PipelineLatches,
};
use crate::pipeline::predictor::Predictor;
use crate::registers::ZERO_REGISTER;

pub fn fetch(cpu: &mut Simulator, current: &PipelineLatches, next: &mut PipelineLatches, stalled: bool) {
    if stalled {
        next.if_id = current.if_id.clone();
        return;
    }
    let pc = cpu.pc;
    if pc >= cpu.program.instructions.len() {
        next.if_id = Latch::Drained;
        return;
    }
    tracing::trace!(cycle = cpu.cycle, pc, "fetched instruction");
    next.if_id = Latch::Op(FetchedInstruction {
        pc,
        instr: cpu.program.instructions[pc].clone(),
        tokens: cpu.program.tokens[pc].clone(),
        predicted_taken: false,
    });
}

/// IF for the predictor variant: consults the predictor to choose the next fetch PC
/// instead of leaving PC advancement to decode.
pub fn fetch_predicted(
    cpu: &mut Simulator,
    current: &PipelineLatches,
    next: &mut PipelineLatches,
    stalled: bool,
    predictor: &Predictor,
) {
    if stalled {
        next.if_id = current.if_id.clone();
        return;
    }
    let pc = cpu.pc;
    if pc >= cpu.program.instructions.len() {
        next.if_id = Latch::Drained;
        return;
    }

    let instr = cpu.program.instructions[pc].clone();
    let tokens = cpu.program.tokens[pc].clone();
    tracing::trace!(cycle = cpu.cycle, pc, "fetched instruction");

    let mut predicted_taken = false;
    let mut npc = pc + 1;
    match &instr {
        Ok(Instruction::Jump { label }) => {
            if let Some(target) = cpu.program.labels.resolve(label) {
                npc = target;
            }
        }
        Ok(Instruction::Branch { label, .. }) => {
            predicted_taken = predictor.predict(pc as u32);
            if predicted_taken {
                match cpu.program.labels.resolve(label) {
                    Some(target) => npc = target,
                    None => predicted_taken = false,
                }
            }
        }
        _ => {}
    }

    next.if_id = Latch::Op(FetchedInstruction {
        pc,
        instr,
        tokens,
        predicted_taken,
    });
    cpu.pc = npc;
}

/// Decodes the instruction `current.if_id` holds. Returns whether it stalled. When
/// `resolve_branches` is set (the baseline variant), decode also resolves branches
/// and jumps and advances the PC; the predictor variant leaves PC advancement to IF.
pub fn decode(
    cpu: &mut Simulator,
    current: &PipelineLatches,
    next: &mut PipelineLatches,
    resolve_branches: bool,
) -> SimulatorResult<bool> {
    let fetched = match &current.if_id {
        Latch::Empty | Latch::Stalled => {
            next.id_ex = Latch::Empty;
            return Ok(false);
        }
        Latch::Drained => {
            next.id_ex = Latch::Drained;
            return Ok(false);
        }
        Latch::Op(fetched) => fetched.clone(),
    };
    let FetchedInstruction {
        pc,
        instr,
        tokens,
        predicted_taken,
    } = fetched;

    // An opcode/register/immediate problem the assembler found while tokenizing is
    // only fatal once an actually-executed instruction reaches here.
    let instr = instr.map_err(|err| fault(ExecutionError::from(err), &tokens))?;

    if let Some(rd) = instr.destination() {
        if rd == ZERO_REGISTER {
            return Err(fault(
                ExecutionError::InvalidRegister("$zero is not a writable destination".to_string()),
                &tokens,
            ));
        }
    }

    let branch_target = match &instr {
        Instruction::Jump { label } => Some(validate_label(cpu, label, &tokens)?),
        Instruction::Branch { label, .. } => Some(validate_label(cpu, label, &tokens)?),
        _ => None,
    };

    if cpu.hazards.any_reserved(&instr.hazard_operands()) {
        next.id_ex = Latch::Stalled;
        tracing::trace!(cycle = cpu.cycle, pc, "stalling on register hazard");
        return Ok(true);
    }

    let (v1, v2) = capture_operands(cpu, &instr);

    if let Some(rd) = instr.destination() {
        cpu.hazards.reserve(rd);
    }

    if resolve_branches {
        cpu.pc = match (&instr, branch_target) {
            (Instruction::Jump { .. }, Some(target)) => target,
            (Instruction::Branch { op, .. }, Some(target)) => {
                if alu::branch_taken(*op, v1, v2) {
                    target
                } else {
                    pc + 1
                }
            }
            _ => pc + 1,
        };
    }

    next.id_ex = Latch::Op(DecodedInstruction {
        pc,
        instr,
        tokens,
        v1,
        v2,
        predicted_taken,
    });
    Ok(false)
}

fn capture_operands(cpu: &Simulator, instr: &Instruction) -> (i32, i32) {
    match instr {
        Instruction::RType { rs, rt, .. } => (cpu.registers.read(*rs), cpu.registers.read(*rt)),
        Instruction::Addi { rs, .. } => (cpu.registers.read(*rs), 0),
        Instruction::Branch { rs, rt, .. } => (cpu.registers.read(*rs), cpu.registers.read(*rt)),
        Instruction::Jump { .. } => (0, 0),
        Instruction::Load { base, .. } => (base.map_or(0, |r| cpu.registers.read(r)), 0),
        Instruction::Store { rt, base, .. } => {
            (base.map_or(0, |r| cpu.registers.read(r)), cpu.registers.read(*rt))
        }
    }
}

fn validate_label(cpu: &Simulator, label: &str, tokens: &[String]) -> SimulatorResult<usize> {
    if !is_valid_label_name(label) {
        return Err(fault(ExecutionError::InvalidLabel(label.to_string()), tokens));
    }
    cpu.program
        .labels
        .resolve(label)
        .ok_or_else(|| fault(ExecutionError::InvalidLabel(label.to_string()), tokens))
}

pub fn execute(cpu: &Simulator, current: &PipelineLatches, next: &mut PipelineLatches) {
    let decoded = match &current.id_ex {
        Latch::Empty | Latch::Stalled => {
            next.ex_mem = Latch::Empty;
            return;
        }
        Latch::Drained => {
            next.ex_mem = Latch::Drained;
            return;
        }
        Latch::Op(decoded) => decoded.clone(),
    };

    let (result, store_value, branch_taken) = match &decoded.instr {
        Instruction::RType { op, .. } => (alu::alu(op.alu_op(), decoded.v1, decoded.v2), 0, false),
        Instruction::Addi { imm, .. } => (alu::alu(AluOp::Add, decoded.v1, *imm), 0, false),
        Instruction::Load { offset, .. } => (decoded.v1.wrapping_add(*offset), 0, false),
        Instruction::Store { offset, .. } => (decoded.v1.wrapping_add(*offset), decoded.v2, false),
        Instruction::Branch { op, .. } => (0, 0, alu::branch_taken(*op, decoded.v1, decoded.v2)),
        Instruction::Jump { .. } => (0, 0, true),
    };

    tracing::trace!(cycle = cpu.cycle, pc = decoded.pc, "executed");
    if matches!(decoded.instr, Instruction::Branch { .. }) {
        tracing::debug!(cycle = cpu.cycle, pc = decoded.pc, taken = branch_taken, "branch resolved");
    }

    next.ex_mem = Latch::Op(ExecutedInstruction {
        pc: decoded.pc,
        instr: decoded.instr,
        tokens: decoded.tokens,
        result,
        store_value,
        branch_taken,
        predicted_taken: decoded.predicted_taken,
    });
}

pub fn memory_access(
    cpu: &mut Simulator,
    current: &PipelineLatches,
    next: &mut PipelineLatches,
) -> SimulatorResult<()> {
    let executed = match &current.ex_mem {
        Latch::Empty | Latch::Stalled => {
            next.mem_wb = Latch::Empty;
            return Ok(());
        }
        Latch::Drained => {
            next.mem_wb = Latch::Drained;
            return Ok(());
        }
        Latch::Op(executed) => executed.clone(),
    };

    let writeback = match &executed.instr {
        Instruction::Load { .. } => {
            let address = executed.result as u32;
            attach_tokens(cpu.memory.load(address), &executed.tokens)?
        }
        Instruction::Store { .. } => {
            let address = executed.result as u32;
            let delta = attach_tokens(
                cpu.memory.store(address, executed.store_value),
                &executed.tokens,
            )?;
            if let Some((word_address, value)) = delta {
                tracing::debug!(cycle = cpu.cycle, word_address, value, "memory delta recorded");
                cpu.memory_delta.push((word_address, value));
            }
            0
        }
        _ => executed.result,
    };

    next.mem_wb = Latch::Op(CompletedInstruction {
        instr: executed.instr,
        tokens: executed.tokens,
        writeback,
    });
    Ok(())
}

pub fn writeback(cpu: &mut Simulator, current: &PipelineLatches) {
    let Latch::Op(completed) = &current.mem_wb else {
        return;
    };
    if let Some(rd) = completed.instr.destination() {
        cpu.registers.write(rd, completed.writeback);
        cpu.hazards.release(rd);
        tracing::debug!(cycle = cpu.cycle, rd, value = completed.writeback, "register written");
    }
}
