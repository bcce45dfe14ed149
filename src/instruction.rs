//! Instruction representation: decoded once by the assembler, matched many times by
//! the stage functions. No string-keyed dispatch tables survive past assembly.

use crate::alu::AluOp;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Addi,
    Slt,
    Beq,
    Bne,
    J,
    Lw,
    Sw,
}

impl Opcode {
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        Some(match mnemonic {
            "add" => Opcode::Add,
            "sub" => Opcode::Sub,
            "mul" => Opcode::Mul,
            "addi" => Opcode::Addi,
            "slt" => Opcode::Slt,
            "beq" => Opcode::Beq,
            "bne" => Opcode::Bne,
            "j" => Opcode::J,
            "lw" => Opcode::Lw,
            "sw" => Opcode::Sw,
            _ => return None,
        })
    }

    /// The ALU operation used by R-type/`addi` instructions. Not meaningful for
    /// branches, jumps, or memory instructions, which compute their result inline.
    pub fn alu_op(self) -> AluOp {
        match self {
            Opcode::Add | Opcode::Addi => AluOp::Add,
            Opcode::Sub => AluOp::Sub,
            Opcode::Mul => AluOp::Mul,
            Opcode::Slt => AluOp::Slt,
            _ => unreachable!("alu_op queried for non-arithmetic opcode {self:?}"),
        }
    }
}

/// A fully decoded instruction. Register operands are resolved to indices at parse
/// time; branch and jump targets stay as label names until decode looks them up,
/// since that is also where undefined-label faults are raised.
#[derive(Clone, Debug)]
pub enum Instruction {
    RType {
        op: Opcode,
        rd: u8,
        rs: u8,
        rt: u8,
    },
    Addi {
        rd: u8,
        rs: u8,
        imm: i32,
    },
    Branch {
        op: Opcode,
        rs: u8,
        rt: u8,
        label: String,
    },
    Jump {
        label: String,
    },
    Load {
        rt: u8,
        base: Option<u8>,
        offset: i32,
    },
    Store {
        rt: u8,
        base: Option<u8>,
        offset: i32,
    },
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::RType { op, .. } => *op,
            Instruction::Addi { .. } => Opcode::Addi,
            Instruction::Branch { op, .. } => *op,
            Instruction::Jump { .. } => Opcode::J,
            Instruction::Load { .. } => Opcode::Lw,
            Instruction::Store { .. } => Opcode::Sw,
        }
    }

    /// The register, if any, that writeback should update.
    pub fn destination(&self) -> Option<u8> {
        match self {
            Instruction::RType { rd, .. } => Some(*rd),
            Instruction::Addi { rd, .. } => Some(*rd),
            Instruction::Load { rt, .. } => Some(*rt),
            _ => None,
        }
    }

    /// Registers decode must check against the hazard table before issuing this
    /// instruction. `lw` checks its own destination alongside its base register, not
    /// just its base, matching the reservation scheme this ISA stalls on instead of
    /// forwarding around.
    pub fn hazard_operands(&self) -> Vec<u8> {
        match self {
            Instruction::RType { rs, rt, .. } => vec![*rs, *rt],
            Instruction::Addi { rs, .. } => vec![*rs],
            Instruction::Branch { rs, rt, .. } => vec![*rs, *rt],
            Instruction::Jump { .. } => vec![],
            Instruction::Load { rt, base, .. } => {
                let mut regs = vec![*rt];
                regs.extend(base.iter().copied());
                regs
            }
            Instruction::Store { rt, base, .. } => {
                let mut regs = vec![*rt];
                regs.extend(base.iter().copied());
                regs
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonic_round_trips_to_the_right_opcode() {
        assert_eq!(Opcode::from_mnemonic("add"), Some(Opcode::Add));
        assert_eq!(Opcode::from_mnemonic("sw"), Some(Opcode::Sw));
        assert_eq!(Opcode::from_mnemonic("nope"), None);
    }

    #[test]
    fn lw_hazard_operands_include_destination_and_base() {
        let instr = Instruction::Load {
            rt: 8,
            base: Some(9),
            offset: 0,
        };
        assert_eq!(instr.hazard_operands(), vec![8, 9]);
    }

    #[test]
    fn sw_hazard_operands_include_source_and_base_but_no_destination() {
        let instr = Instruction::Store {
            rt: 8,
            base: Some(9),
            offset: 0,
        };
        assert_eq!(instr.destination(), None);
        assert_eq!(instr.hazard_operands(), vec![8, 9]);
    }

    #[test]
    fn plain_address_forms_have_no_base_register() {
        let instr = Instruction::Load {
            rt: 8,
            base: None,
            offset: 100,
        };
        assert_eq!(instr.hazard_operands(), vec![8]);
    }
}
