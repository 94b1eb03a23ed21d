use crate::error::{Result, VmError};

pub const DEFAULT_DATA_CAPACITY: usize = 10;
pub const DEFAULT_PROGRAM_CAPACITY: usize = 30;

/// What the engine does when it fetches an op code outside the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpcodePolicy {
    /// Log the instruction and move on to the next one.
    #[default]
    Lenient,
    /// Abort the run with `VmError::IllegalOpcode`.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_capacity: usize,
    pub program_capacity: usize,
    pub opcode_policy: OpcodePolicy,
    pub max_cycles: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_capacity: DEFAULT_DATA_CAPACITY,
            program_capacity: DEFAULT_PROGRAM_CAPACITY,
            opcode_policy: OpcodePolicy::Lenient,
            max_cycles: None,
        }
    }
}

impl Config {
    pub fn new(data_capacity: usize, program_capacity: usize) -> Self {
        Self {
            data_capacity,
            program_capacity,
            ..Self::default()
        }
    }

    pub fn strict(mut self) -> Self {
        self.opcode_policy = OpcodePolicy::Strict;
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_capacity == 0 {
            return Err(VmError::InvalidConfig(
                "data memory capacity must be at least 1".to_string(),
            ));
        }
        if self.program_capacity == 0 {
            return Err(VmError::InvalidConfig(
                "program memory capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_legacy_sizes() {
        let config = Config::default();
        assert_eq!(config.data_capacity, 10);
        assert_eq!(config.program_capacity, 30);
        assert_eq!(config.opcode_policy, OpcodePolicy::Lenient);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            Config::new(0, 30).validate(),
            Err(VmError::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::new(10, 0).validate(),
            Err(VmError::InvalidConfig(_))
        ));
    }
}
