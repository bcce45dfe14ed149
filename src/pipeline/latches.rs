//! Inter-stage latches.
//!
//! Each latch holds exactly one of: nothing fetched yet (`Empty`), a stall bubble
//! (`Stalled`), the end-of-program sentinel (`Drained`), or live work (`Op`). This
//! replaces magic-string opcodes like `"done"`/`"stalled"` with a sum type the
//! compiler can exhaustively match on.

use crate::error::AssemblyError;
use crate::instruction::Instruction;

#[derive(Clone, Debug, Default)]
pub enum Latch<T> {
    #[default]
    Empty,
    Stalled,
    Drained,
    Op(T),
}

impl<T> Latch<T> {
    pub fn is_drained(&self) -> bool {
        matches!(self, Latch::Drained)
    }
}

#[derive(Clone, Debug)]
pub struct FetchedInstruction {
    pub pc: usize,
    /// The assembler's per-instruction result: an opcode/register/immediate problem
    /// detected while parsing is held here rather than aborting assembly, and only
    /// becomes fatal once decode actually reaches it.
    pub instr: Result<Instruction, AssemblyError>,
    pub tokens: Vec<String>,
    /// Only meaningful in the predictor variant: what IF guessed for a branch.
    pub predicted_taken: bool,
}

#[derive(Clone, Debug)]
pub struct DecodedInstruction {
    pub pc: usize,
    pub instr: Instruction,
    pub tokens: Vec<String>,
    /// First captured operand: `rs`, or the base register's value for loads/stores.
    pub v1: i32,
    /// Second captured operand: `rt`, or the value to store for `sw`.
    pub v2: i32,
    pub predicted_taken: bool,
}

#[derive(Clone, Debug)]
pub struct ExecutedInstruction {
    pub pc: usize,
    pub instr: Instruction,
    pub tokens: Vec<String>,
    /// ALU result for R-type/`addi`, effective address for `lw`/`sw`.
    pub result: i32,
    /// The value `sw` will write, carried separately from `result` (the address).
    pub store_value: i32,
    /// The actual outcome of a branch. Unused by non-branch instructions.
    pub branch_taken: bool,
    pub predicted_taken: bool,
}

#[derive(Clone, Debug)]
pub struct CompletedInstruction {
    pub instr: Instruction,
    pub tokens: Vec<String>,
    /// The value writeback commits to the destination register, when there is one.
    pub writeback: i32,
}

#[derive(Default)]
pub struct PipelineLatches {
    pub if_id: Latch<FetchedInstruction>,
    pub id_ex: Latch<DecodedInstruction>,
    pub ex_mem: Latch<ExecutedInstruction>,
    pub mem_wb: Latch<CompletedInstruction>,
}
