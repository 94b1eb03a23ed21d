use std::fmt::Display;
use std::io::{BufRead, ErrorKind};

use log::{debug, info};

use crate::cpu::OpCode;
use crate::error::{Result, VmError};
use crate::io::IntegerReader;

/// One slot of instruction memory. Both fields are kept raw so illegal op
/// codes survive loading and are only rejected when executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: i32,
    pub operand: i32,
}

impl Instruction {
    pub fn new(opcode: i32, operand: i32) -> Self {
        Self { opcode, operand }
    }

    pub fn decode(&self) -> Result<OpCode> {
        OpCode::try_from(self.opcode)
    }
}

impl From<(i32, i32)> for Instruction {
    fn from((opcode, operand): (i32, i32)) -> Self {
        Self::new(opcode, operand)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.decode() {
            Ok(op) => write!(f, "{} {}", op, self.operand),
            Err(_) => write!(f, "({}, {}) illegal", self.opcode, self.operand),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Parses whitespace-separated `opcode operand` pairs from a string.
    pub fn parse(source: &str) -> Result<Self> {
        Self::read_from(&mut IntegerReader::new(source.as_bytes()))
    }

    /// Reads pairs until end of input, a token that is not an integer, or
    /// an op code without an operand. The terminating token is consumed,
    /// so the reader can keep serving the program's IN values afterwards.
    pub fn read_from<R: BufRead>(reader: &mut IntegerReader<R>) -> Result<Self> {
        let mut instructions = Vec::new();

        loop {
            let opcode = match next_field(reader)? {
                Some(value) => value,
                None => break,
            };
            let operand = match next_field(reader)? {
                Some(value) => value,
                None => break,
            };

            debug!(
                "Loaded instruction ({}, {}) in address {}.",
                opcode,
                operand,
                instructions.len()
            );
            instructions.push(Instruction::new(opcode, operand));
        }

        info!("End of input reached, {} instructions read.", instructions.len());

        if instructions.is_empty() {
            return Err(VmError::MalformedProgram(
                "no instructions could be read".to_string(),
            ));
        }

        Ok(Self::new(instructions))
    }
}

impl From<Vec<(i32, i32)>> for Program {
    fn from(pairs: Vec<(i32, i32)>) -> Self {
        Self::new(pairs.into_iter().map(Instruction::from).collect())
    }
}

fn next_field<R: BufRead>(reader: &mut IntegerReader<R>) -> Result<Option<i32>> {
    match reader.next_integer() {
        Ok(value) => Ok(Some(value)),
        Err(e) if matches!(e.kind(), ErrorKind::UnexpectedEof | ErrorKind::InvalidData) => {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_across_lines() {
        let program = Program::parse("1 0\n6 0\n7 0\n").unwrap();
        assert_eq!(program, Program::from(vec![(1, 0), (6, 0), (7, 0)]));
    }

    #[test]
    fn keeps_illegal_opcodes() {
        let program = Program::parse("99 3 0 0").unwrap();
        assert_eq!(program.instructions[0], Instruction::new(99, 3));
        assert!(program.instructions[1].decode().is_err());
    }

    #[test]
    fn dangling_opcode_is_dropped() {
        let program = Program::parse("5 0 7").unwrap();
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn empty_source_is_malformed() {
        assert!(matches!(
            Program::parse("  \n"),
            Err(VmError::MalformedProgram(_))
        ));
        assert!(matches!(
            Program::parse("end"),
            Err(VmError::MalformedProgram(_))
        ));
    }

    #[test]
    fn terminator_leaves_rest_of_stream_for_input() {
        let mut reader = IntegerReader::new("5 0\n7 0\n.\n10\n".as_bytes());
        let program = Program::read_from(&mut reader).unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(reader.next_integer().unwrap(), 10);
    }

    #[test]
    fn displays_mnemonics() {
        assert_eq!(Instruction::new(1, 4).to_string(), "LOAD 4");
        assert_eq!(Instruction::new(9, 0).to_string(), "SKIPZ 0");
        assert_eq!(Instruction::new(10, 2).to_string(), "(10, 2) illegal");
    }
}
