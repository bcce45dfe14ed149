//! Turns assembly source text into a [`Program`]: a vector of decoded
//! [`Instruction`]s plus a label table. Per-instruction problems — an unknown
//! opcode, an unresolvable register name, a malformed immediate or memory operand —
//! are *detected* here, during the single tokenizing pass over the source, but are
//! not raised as fatal until the pipeline actually decodes the offending
//! instruction, matching label existence (already deferred to decode) and the
//! reference, whose register/opcode checks live inside `ID_Stage`. Only
//! [`AssemblyError::MemoryLimit`] is raised eagerly, since it depends on the
//! program's total size rather than on which instructions ever run.

use std::collections::HashMap;

use crate::error::{AssemblyError, SimulatorResult};
use crate::instruction::{Instruction, Opcode};
use crate::memory::{MAX_BYTES, WORD_BYTES};
use crate::registers::resolve_register_name;

/// A label's resolution state. A label defined twice is poisoned rather than
/// rejected at parse time, so that use sites report "undefined" uniformly whether a
/// label was never defined or defined more than once.
enum LabelEntry {
    Defined(usize),
    Poisoned,
}

pub struct LabelTable {
    entries: HashMap<String, LabelEntry>,
}

impl LabelTable {
    pub fn resolve(&self, name: &str) -> Option<usize> {
        match self.entries.get(name) {
            Some(LabelEntry::Defined(index)) => Some(*index),
            _ => None,
        }
    }
}

pub struct Program {
    /// One entry per source instruction. `Err` holds whatever went wrong resolving
    /// that instruction's opcode/registers/immediate; it is only surfaced as a fatal
    /// error if decode reaches that instruction.
    pub instructions: Vec<Result<Instruction, AssemblyError>>,
    /// Raw tokens per instruction (opcode plus up to three operands), kept around
    /// purely for error reporting.
    pub tokens: Vec<Vec<String>>,
    pub labels: LabelTable,
}

pub fn assemble(source: &str) -> SimulatorResult<Program> {
    let mut instructions = Vec::new();
    let mut raw_tokens = Vec::new();
    let mut labels: HashMap<String, LabelEntry> = HashMap::new();

    for line in source.lines() {
        let code = line.split('#').next().unwrap_or("");
        let mut tokens: Vec<String> = code
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if tokens.is_empty() {
            continue;
        }

        if let Some(label) = split_label(&mut tokens) {
            define_label(&mut labels, &label, instructions.len());
        }

        if tokens.is_empty() {
            continue;
        }

        if tokens.len() > 4 {
            let extra = tokens.split_off(4);
            tokens[3] = format!("{} {}", tokens[3], extra.join(" "));
        }
        while tokens.len() < 4 {
            tokens.push(String::new());
        }

        let mnemonic = tokens[0].clone();
        instructions.push(match Opcode::from_mnemonic(&mnemonic) {
            Some(opcode) => parse_instruction(opcode, &tokens),
            None => Err(AssemblyError::UnknownOpcode(mnemonic)),
        });
        raw_tokens.push(tokens);
    }

    let word_limit = (MAX_BYTES / WORD_BYTES) as usize;
    if instructions.len() > word_limit {
        tracing::error!(count = instructions.len(), "program exceeds addressable memory");
        return Err(AssemblyError::MemoryLimit(instructions.len()).into());
    }

    Ok(Program {
        instructions,
        tokens: raw_tokens,
        labels: LabelTable { entries: labels },
    })
}

/// Splits a leading label off `tokens`, covering the three forms the spec names:
/// a bare `name:` line, `name:` prefixing an instruction, and `name:instr` with no
/// space. Mutates `tokens` in place to the remaining instruction tokens.
fn split_label(tokens: &mut Vec<String>) -> Option<String> {
    if tokens.len() == 1 && tokens[0].ends_with(':') {
        let label = tokens[0].trim_end_matches(':').to_string();
        tokens.clear();
        return Some(label);
    }
    if tokens[0].ends_with(':') {
        let label = tokens[0].trim_end_matches(':').to_string();
        tokens.remove(0);
        return Some(label);
    }
    if let Some(idx) = tokens[0].find(':') {
        let label = tokens[0][..idx].to_string();
        let rest = tokens[0][idx + 1..].to_string();
        if rest.is_empty() {
            tokens.remove(0);
        } else {
            tokens[0] = rest;
        }
        return Some(label);
    }
    None
}

fn define_label(labels: &mut HashMap<String, LabelEntry>, name: &str, index: usize) {
    labels
        .entry(name.to_string())
        .and_modify(|entry| *entry = LabelEntry::Poisoned)
        .or_insert(LabelEntry::Defined(index));
}

/// Validates that `name` could plausibly be a label: starts with a letter, the rest
/// alphanumeric, and not itself an opcode mnemonic. Called from decode at use sites,
/// not here at definition sites.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric()) && Opcode::from_mnemonic(name).is_none()
}

pub(crate) fn parse_instruction(opcode: Opcode, tokens: &[String]) -> Result<Instruction, AssemblyError> {
    let reg = |s: &str| -> Result<u8, AssemblyError> {
        resolve_register_name(s).ok_or_else(|| AssemblyError::InvalidRegister(s.to_string()))
    };
    let imm = |s: &str| -> Result<i32, AssemblyError> {
        s.parse::<i32>()
            .map_err(|_| AssemblyError::MalformedImmediate(s.to_string()))
    };

    Ok(match opcode {
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Slt => Instruction::RType {
            op: opcode,
            rd: reg(&tokens[1])?,
            rs: reg(&tokens[2])?,
            rt: reg(&tokens[3])?,
        },
        Opcode::Addi => Instruction::Addi {
            rd: reg(&tokens[1])?,
            rs: reg(&tokens[2])?,
            imm: imm(&tokens[3])?,
        },
        Opcode::Beq | Opcode::Bne => Instruction::Branch {
            op: opcode,
            rs: reg(&tokens[1])?,
            rt: reg(&tokens[2])?,
            label: tokens[3].clone(),
        },
        Opcode::J => Instruction::Jump {
            label: tokens[1].clone(),
        },
        Opcode::Lw => {
            let (offset, base) = parse_memory_operand(&tokens[2])?;
            Instruction::Load {
                rt: reg(&tokens[1])?,
                base,
                offset,
            }
        }
        Opcode::Sw => {
            let (offset, base) = parse_memory_operand(&tokens[2])?;
            Instruction::Store {
                rt: reg(&tokens[1])?,
                base,
                offset,
            }
        }
    })
}

/// Parses a `lw`/`sw` address operand: either a bare decimal byte address, or
/// `offset(register)`. The bare form has no base register at all, rather than an
/// implicit `$zero`.
fn parse_memory_operand(token: &str) -> Result<(i32, Option<u8>), AssemblyError> {
    if let Some(body) = token.strip_suffix(')') {
        let open = body
            .find('(')
            .ok_or_else(|| AssemblyError::MalformedOperand(token.to_string()))?;
        let (offset_str, reg_str) = body.split_at(open);
        let reg_str = &reg_str[1..];
        let offset = if offset_str.is_empty() {
            0
        } else {
            offset_str
                .parse::<i32>()
                .map_err(|_| AssemblyError::MalformedImmediate(offset_str.to_string()))?
        };
        let base = resolve_register_name(reg_str)
            .ok_or_else(|| AssemblyError::InvalidRegister(reg_str.to_string()))?;
        Ok((offset, Some(base)))
    } else {
        let addr = token
            .parse::<i32>()
            .map_err(|_| AssemblyError::MalformedImmediate(token.to_string()))?;
        Ok((addr, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_label_prefixed_and_bare_label_lines() {
        let program = assemble("loop: addi $t0, $t0, 1\nj loop\n").unwrap();
        assert_eq!(program.instructions.len(), 2);
        assert_eq!(program.labels.resolve("loop"), Some(0));
    }

    #[test]
    fn redefined_label_is_poisoned() {
        let program = assemble("l: addi $t0, $t0, 1\nl: addi $t0, $t0, 1\n").unwrap();
        assert_eq!(program.labels.resolve("l"), None);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let program = assemble("# a comment\n\n   \nadd $t0, $t1, $t2 # trailing\n").unwrap();
        assert_eq!(program.instructions.len(), 1);
    }

    #[test]
    fn unknown_opcode_is_held_per_instruction_rather_than_aborting_assembly() {
        let program = assemble("frob $t0, $t1, $t2\naddi $t0, $zero, 1\n").unwrap();
        assert!(matches!(
            program.instructions[0],
            Err(AssemblyError::UnknownOpcode(_))
        ));
        assert!(program.instructions[1].is_ok());
    }

    #[test]
    fn invalid_register_is_held_per_instruction_rather_than_aborting_assembly() {
        let program = assemble("add $t0, $bogus, $t2\n").unwrap();
        assert!(matches!(
            program.instructions[0],
            Err(AssemblyError::InvalidRegister(_))
        ));
    }

    #[test]
    fn over_long_operand_list_collapses_into_the_third_operand() {
        let program = assemble("beq $t0, $t1, foo bar\n").unwrap();
        match program.instructions[0].as_ref().unwrap() {
            Instruction::Branch { label, .. } => assert_eq!(label, "foo bar"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn lw_with_bare_decimal_address_has_no_base_register() {
        let program = assemble("lw $t0, 100\n").unwrap();
        match program.instructions[0].as_ref().unwrap() {
            Instruction::Load { base, offset, .. } => {
                assert_eq!(*base, None);
                assert_eq!(*offset, 100);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn lw_with_offset_register_form() {
        let program = assemble("lw $t0, 4($t1)\n").unwrap();
        match program.instructions[0].as_ref().unwrap() {
            Instruction::Load { base, offset, .. } => {
                assert_eq!(*base, Some(9));
                assert_eq!(*offset, 4);
            }
            _ => unreachable!(),
        }
    }
}
