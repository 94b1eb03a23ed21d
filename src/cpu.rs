use std::fmt::Display;

use crate::error::VmError;
use crate::program::Instruction;

/// Mnemonics indexed by raw op code. Slots 0 and 10 are placeholders and
/// never name a valid instruction.
pub const MNEMONICS: [&str; 11] = [
    "N/A", "LOAD", "ADD", "STORE", "SUB", "IN", "OUT", "END", "JMP", "SKIPZ", "N/A",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cpu {
    pub pc: usize,            // Program counter
    pub acc: i32,             // The accumulator register
    pub mar1: usize,          // Instruction memory address register
    pub mdr1: Instruction,    // Instruction memory data register
    pub ir: Instruction,      // Instruction register
    pub mar2: usize,          // Data memory address register
    pub mdr2: i32,            // Data memory data register
    pub running: bool,        // Cleared only by END
}

impl Display for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cpu [ pc: {}, acc: {}, ir: {}, running: {} ]",
            self.pc, self.acc, self.ir, self.running
        )
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Cpu {
            pc: 0,
            acc: 0,
            mar1: 0,
            mdr1: Instruction::default(),
            ir: Instruction::default(),
            mar2: 0,
            mdr2: 0,
            running: true,
        }
    }

    pub fn reset(&mut self) {
        *self = Cpu::new();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    LOAD    =   1,  // A  = D[a]
    ADD     =   2,  // A += D[a]
    STORE   =   3,  // D[a] = A
    SUB     =   4,  // A -= D[a]
    IN      =   5,  // A  = console
    OUT     =   6,  // console = A
    END     =   7,  // running = false, status = a
    JMP     =   8,  // PC = a
    SKIPZ   =   9,  // if A == 0 then PC += 1
}

impl OpCode {
    pub fn mnemonic(self) -> &'static str {
        MNEMONICS[self as usize]
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl TryFrom<i32> for OpCode {
    type Error = VmError;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::LOAD),
            2 => Ok(Self::ADD),
            3 => Ok(Self::STORE),
            4 => Ok(Self::SUB),
            5 => Ok(Self::IN),
            6 => Ok(Self::OUT),
            7 => Ok(Self::END),
            8 => Ok(Self::JMP),
            9 => Ok(Self::SKIPZ),
            _ => Err(VmError::IllegalOpcode(v)),
        }
    }
}
