use std::fmt::{self, Display};

use crate::error::{Result, VmError};

/// Identifies which memory an address belongs to, for fault reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    Data,
    Instruction,
}

impl Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bank::Data => write!(f, "data"),
            Bank::Instruction => write!(f, "instruction"),
        }
    }
}

pub trait Addressable<T> {
    fn capacity(&self) -> usize;
    fn read(&self, address: usize) -> Result<T>;
    fn write(&mut self, address: usize, value: T) -> Result<()>;
    fn write_chunk(&mut self, chunk: &[T]) -> Result<()>;
}

/// A fixed-capacity, zero-indexed memory bank. The capacity is chosen at
/// construction and never changes.
#[derive(Debug, Clone)]
pub struct Memory<T> {
    bank: Bank,
    cells: Box<[T]>,
}

impl<T: Copy + Default> Memory<T> {
    pub fn new(bank: Bank, capacity: usize) -> Self {
        Self {
            bank,
            cells: vec![T::default(); capacity].into_boxed_slice(),
        }
    }

    /// Converts a signed operand into an address inside this bank.
    pub fn resolve(&self, operand: i32) -> Result<usize> {
        usize::try_from(operand)
            .ok()
            .filter(|address| *address < self.cells.len())
            .ok_or_else(|| self.out_of_bounds(operand as i64))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    fn out_of_bounds(&self, address: i64) -> VmError {
        VmError::OutOfBounds {
            bank: self.bank,
            address,
            capacity: self.cells.len(),
        }
    }
}

impl<T: Copy + Default> Addressable<T> for Memory<T> {
    fn capacity(&self) -> usize {
        self.cells.len()
    }

    fn read(&self, address: usize) -> Result<T> {
        self.cells
            .get(address)
            .copied()
            .ok_or_else(|| self.out_of_bounds(address as i64))
    }

    fn write(&mut self, address: usize, value: T) -> Result<()> {
        let err = self.out_of_bounds(address as i64);
        let cell = self.cells.get_mut(address).ok_or(err)?;
        *cell = value;
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &[T]) -> Result<()> {
        if chunk.len() > self.cells.len() {
            // The first slot that does not fit is the one reported.
            return Err(self.out_of_bounds(self.cells.len() as i64));
        }

        self.cells[..chunk.len()].copy_from_slice(chunk);
        Ok(())
    }
}

impl<T: Display> Display for Memory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (index, cell) in self.cells.iter().enumerate() {
            if index > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", cell)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let memory: Memory<i32> = Memory::new(Bank::Data, 10);
        assert_eq!(memory.capacity(), 10);
        assert!(memory.as_slice().iter().all(|cell| *cell == 0));
        assert_eq!(memory.to_string(), "[0,0,0,0,0,0,0,0,0,0]");
    }

    #[test]
    fn read_write_in_bounds() {
        let mut memory: Memory<i32> = Memory::new(Bank::Data, 4);
        memory.write(3, -7).unwrap();
        assert_eq!(memory.read(3).unwrap(), -7);
        assert_eq!(memory.read(0).unwrap(), 0);
    }

    #[test]
    fn out_of_bounds_write_leaves_memory_untouched() {
        let mut memory: Memory<i32> = Memory::new(Bank::Data, 4);
        memory.write_chunk(&[1, 2, 3, 4]).unwrap();

        let err = memory.write(4, 99).unwrap_err();
        assert!(matches!(
            err,
            VmError::OutOfBounds {
                bank: Bank::Data,
                address: 4,
                capacity: 4
            }
        ));
        assert_eq!(memory.as_slice(), &[1, 2, 3, 4]);
        assert!(memory.read(4).is_err());
    }

    #[test]
    fn resolve_rejects_negative_and_large_operands() {
        let memory: Memory<i32> = Memory::new(Bank::Instruction, 30);
        assert_eq!(memory.resolve(29).unwrap(), 29);
        assert!(matches!(
            memory.resolve(-1),
            Err(VmError::OutOfBounds { address: -1, .. })
        ));
        assert!(matches!(
            memory.resolve(30),
            Err(VmError::OutOfBounds {
                bank: Bank::Instruction,
                address: 30,
                ..
            })
        ));
    }

    #[test]
    fn oversized_chunk_is_rejected() {
        let mut memory: Memory<i32> = Memory::new(Bank::Data, 2);
        assert!(memory.write_chunk(&[1, 2, 3]).is_err());
        assert_eq!(memory.as_slice(), &[0, 0]);

        memory.write_chunk(&[5]).unwrap();
        assert_eq!(memory.as_slice(), &[5, 0]);
    }
}
