use thiserror::Error;

use crate::memory::Bank;
use crate::program::Instruction;

pub type Result<T> = std::result::Result<T, VmError>;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("malformed program: {0}")]
    MalformedProgram(String),

    #[error("illegal instruction op code {0}")]
    IllegalOpcode(i32),

    #[error("{bank} memory address {address} is out of bounds (capacity {capacity})")]
    OutOfBounds {
        bank: Bank,
        address: i64,
        capacity: usize,
    },

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("execution interrupted by host")]
    Interrupted,

    #[error("cycle limit of {0} exceeded")]
    CycleLimit(u64),

    /// A failure raised while executing the instruction stored at `pc`.
    /// `instruction` is `None` when the fetch itself failed.
    #[error("fault at program address {pc}{}: {source}", describe(.instruction))]
    Fault {
        pc: usize,
        instruction: Option<Instruction>,
        #[source]
        source: Box<VmError>,
    },
}

fn describe(instruction: &Option<Instruction>) -> String {
    match instruction {
        Some(instr) => format!(" ({})", instr),
        None => String::new(),
    }
}

impl VmError {
    /// Strips any fault context and returns the underlying error kind.
    pub fn root(&self) -> &VmError {
        match self {
            VmError::Fault { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn at(self, pc: usize, instruction: Option<Instruction>) -> Self {
        VmError::Fault {
            pc,
            instruction,
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_unwraps_fault_context() {
        let err = VmError::IllegalOpcode(42).at(3, Some(Instruction::new(42, 0)));
        assert!(matches!(err.root(), VmError::IllegalOpcode(42)));
        assert_eq!(
            err.to_string(),
            "fault at program address 3 ((42, 0) illegal): illegal instruction op code 42"
        );
    }

    #[test]
    fn fetch_fault_has_no_instruction() {
        let err = VmError::OutOfBounds {
            bank: Bank::Instruction,
            address: 30,
            capacity: 30,
        }
        .at(30, None);
        assert_eq!(
            err.to_string(),
            "fault at program address 30: instruction memory address 30 is out of bounds (capacity 30)"
        );
    }
}
