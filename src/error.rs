//! Layered error types for the simulator.
//!
//! [`AssemblyError`] covers faults detected while turning source text into a
//! [`crate::assembler::Program`]; [`ExecutionError`] covers faults detected while
//! driving the pipeline. [`Fault`] pairs an [`ExecutionError`] with the raw operand
//! tokens of the offending instruction so the CLI can print them without the error
//! type itself knowing anything about reporting.

use thiserror::Error;

/// Top-level error type for the simulator.
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("{0}")]
    Execution(#[from] Fault),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimulatorError {
    /// The raw operand tokens of the offending instruction, when the error has one.
    pub fn offending_tokens(&self) -> &[String] {
        match self {
            SimulatorError::Execution(fault) => &fault.tokens,
            _ => &[],
        }
    }
}

/// Errors raised while assembling source text into a [`crate::assembler::Program`].
///
/// Only [`AssemblyError::MemoryLimit`] is actually raised eagerly, during the
/// up-front parse — it depends on the program's total size, not on whether any
/// particular instruction is ever reached. The other variants are produced by
/// [`crate::assembler::parse_instruction`] but held per-instruction in
/// [`crate::assembler::Program`] rather than aborting assembly; they only become
/// fatal (via [`ExecutionError`]) if the pipeline actually decodes that instruction.
#[derive(Error, Debug, Clone)]
pub enum AssemblyError {
    #[error("unknown opcode '{0}'")]
    UnknownOpcode(String),
    #[error("invalid register '{0}'")]
    InvalidRegister(String),
    #[error("malformed immediate '{0}'")]
    MalformedImmediate(String),
    #[error("malformed memory operand '{0}'")]
    MalformedOperand(String),
    #[error("program occupies {0} words, exceeding the addressable memory limit")]
    MemoryLimit(usize),
}

/// Errors raised while driving the pipeline.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("invalid register: {0}")]
    InvalidRegister(String),
    #[error("undefined or ambiguous label '{0}'")]
    InvalidLabel(String),
    #[error("memory access at address {0:#x} is misaligned or out of range")]
    InvalidAddress(u32),
    #[error("{0}")]
    SyntaxError(String),
    #[error("ran for {0} cycles without the pipeline draining")]
    CycleLimit(u64),
}

/// Converts a parse-time [`AssemblyError`] caught when decode reaches the offending
/// instruction into the dynamically-detected [`ExecutionError`] kind the spec's error
/// table assigns it: an unknown register name is `InvalidRegister`, everything else
/// (`unknown opcode`, `malformed immediate`, `malformed memory operand`) is a
/// `SyntaxError`.
impl From<AssemblyError> for ExecutionError {
    fn from(error: AssemblyError) -> Self {
        match error {
            AssemblyError::InvalidRegister(name) => ExecutionError::InvalidRegister(name),
            other => ExecutionError::SyntaxError(other.to_string()),
        }
    }
}

/// An [`ExecutionError`] paired with the raw tokens of the instruction that caused it.
#[derive(Debug)]
pub struct Fault {
    pub error: ExecutionError,
    pub tokens: Vec<String>,
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// A `CycleLimit` fault has no offending instruction, so it converts straight into
/// a [`Fault`] with no tokens rather than going through [`fault`].
impl From<ExecutionError> for SimulatorError {
    fn from(error: ExecutionError) -> Self {
        tracing::error!(%error, "fatal execution error");
        SimulatorError::Execution(Fault {
            error,
            tokens: Vec::new(),
        })
    }
}

pub(crate) fn fault(error: ExecutionError, tokens: &[String]) -> SimulatorError {
    tracing::error!(%error, tokens = ?tokens, "fatal execution error");
    SimulatorError::Execution(Fault {
        error,
        tokens: tokens.to_vec(),
    })
}

pub(crate) fn attach_tokens<T>(
    result: Result<T, ExecutionError>,
    tokens: &[String],
) -> SimulatorResult<T> {
    result.map_err(|error| fault(error, tokens))
}

/// Type alias for `Result` with [`SimulatorError`].
pub type SimulatorResult<T> = Result<T, SimulatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_display_delegates_to_execution_error() {
        let err = fault(ExecutionError::InvalidAddress(0x10), &["sw".into()]);
        assert_eq!(
            err.to_string(),
            "memory access at address 0x10 is misaligned or out of range"
        );
        assert_eq!(err.offending_tokens(), &["sw".to_string()]);
    }

    #[test]
    fn assembly_errors_have_no_offending_tokens() {
        let err: SimulatorError = AssemblyError::UnknownOpcode("frob".into()).into();
        assert!(err.offending_tokens().is_empty());
    }
}
