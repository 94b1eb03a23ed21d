pub mod config;
pub mod cpu;
pub mod error;
pub mod io;
pub mod memory;
pub mod program;

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use caches::Cache;
use config::{Config, OpcodePolicy};
use cpu::{Cpu, OpCode};
use io::Console;
use log::{debug, info, trace, warn};
use memory::{Addressable, Bank, Memory};
use program::{Instruction, Program};

pub use error::{Result, VmError};

type DecodeCache = caches::AdaptiveCache<usize, Option<OpCode>>;

fn decode_cache(capacity: usize) -> Result<DecodeCache> {
    DecodeCache::new(capacity)
        .map_err(|e| VmError::InvalidConfig(format!("decode cache: {:?}", e)))
}

/// Cooperative stop request shared between a running engine and its host.
/// Once requested, the engine aborts before its next cycle; the request
/// stays set until `clear` is called.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Read-only view of the machine between two cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub pc: usize,
    pub acc: i32,
    pub running: bool,
    pub cycles: u64,
    pub data: Vec<i32>,
}

/// Result of a single fetch-decode-execute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Halted(i32),
}

pub struct EmulationEngine {
    pub(crate) cpu: Cpu,
    data: Memory<i32>,
    program: Memory<Instruction>,
    config: Config,
    decode_cache: DecodeCache,
    stop: StopHandle,
    cycles: u64,
    exit_status: Option<i32>,
}

impl EmulationEngine {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            cpu: Cpu::new(),
            data: Memory::new(Bank::Data, config.data_capacity),
            program: Memory::new(Bank::Instruction, config.program_capacity),
            decode_cache: decode_cache(config.program_capacity)?,
            stop: StopHandle::default(),
            cycles: 0,
            exit_status: None,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn data(&self) -> &[i32] {
        self.data.as_slice()
    }

    pub fn instructions(&self) -> &[Instruction] {
        self.program.as_slice()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Writes the program from address 0 and clears the remaining slots.
    /// A program that does not fit is rejected without touching memory.
    pub fn load_program(&mut self, program: &Program) -> Result<()> {
        if program.is_empty() {
            return Err(VmError::MalformedProgram(
                "program has no instructions".to_string(),
            ));
        }

        let mut image = program.instructions.clone();
        if image.len() < self.program.capacity() {
            image.resize(self.program.capacity(), Instruction::default());
        }
        self.program.write_chunk(&image)?;

        // Instruction memory changed, previously decoded slots are stale
        self.decode_cache = decode_cache(self.config.program_capacity)?;
        self.reset();

        info!(
            "Loaded {} instructions into program memory ({} slots).",
            program.len(),
            self.program.capacity()
        );
        Ok(())
    }

    pub fn write_data(&mut self, address: usize, value: i32) -> Result<()> {
        self.data.write(address, value)
    }

    /// Preloads data memory from address 0.
    pub fn load_data(&mut self, values: &[i32]) -> Result<()> {
        self.data.write_chunk(values)
    }

    /// Puts the registers back into their initial running state. Memory is
    /// left as is.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.cycles = 0;
        self.exit_status = None;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pc: self.cpu.pc,
            acc: self.cpu.acc,
            running: self.cpu.running,
            cycles: self.cycles,
            data: self.data.as_slice().to_vec(),
        }
    }

    pub fn dump_data(&self) -> String {
        format!("MEM = {}", self.data)
    }

    pub fn dump_program(&self) -> String {
        let mut listing = String::new();
        for (address, instr) in self.program.as_slice().iter().enumerate() {
            let _ = write!(
                listing,
                "ProgramMem[{}] : ({}, {})\t",
                address, instr.opcode, instr.operand
            );
            let _ = match instr.decode() {
                Ok(_) => writeln!(listing, "{}", instr),
                Err(_) => writeln!(listing, "Illegal Instruction Op Code {}", instr.opcode),
            };
        }
        listing
    }

    fn debug_state(&self) {
        debug!(
            " PC={} | A={} | {}",
            self.cpu.pc,
            self.cpu.acc,
            self.dump_data()
        );
    }

    fn fetch(&mut self) -> Result<Instruction> {
        self.cpu.mar1 = self.cpu.pc;
        self.cpu.mdr1 = self.program.read(self.cpu.mar1)?;
        self.cpu.pc += 1;
        self.cpu.ir = self.cpu.mdr1;
        Ok(self.cpu.ir)
    }

    fn decode(&mut self, address: usize) -> Option<OpCode> {
        if let Some(op) = self.decode_cache.get(&address) {
            return *op;
        }

        debug!("decode cache miss at {}", address);
        let op = self.cpu.ir.decode().ok();
        self.decode_cache.put(address, op);
        op
    }

    fn read_data(&mut self, operand: i32) -> Result<i32> {
        self.cpu.mar2 = self.data.resolve(operand)?;
        self.cpu.mdr2 = self.data.read(self.cpu.mar2)?;
        Ok(self.cpu.mdr2)
    }

    fn execute<C: Console + ?Sized>(
        &mut self,
        op: OpCode,
        operand: i32,
        console: &mut C,
    ) -> Result<Step> {
        match op {
            OpCode::LOAD => {
                trace!("Loading Accumulator from memory location {}", operand);
                self.cpu.acc = self.read_data(operand)?;
            }
            OpCode::ADD => {
                trace!("Adding dataMemory[{}] to Accumulator", operand);
                self.cpu.acc = self.cpu.acc.wrapping_add(self.read_data(operand)?);
            }
            OpCode::STORE => {
                trace!("Storing Accumulator to memory location {}", operand);
                self.cpu.mar2 = self.data.resolve(operand)?;
                self.cpu.mdr2 = self.cpu.acc;
                self.data.write(self.cpu.mar2, self.cpu.mdr2)?;
            }
            OpCode::SUB => {
                trace!("Subtracting dataMemory[{}] from Accumulator", operand);
                self.cpu.acc = self.cpu.acc.wrapping_sub(self.read_data(operand)?);
            }
            OpCode::IN => {
                self.cpu.acc = console.read_integer()?;
                trace!("Received input {} and stored it in Accumulator", self.cpu.acc);
            }
            OpCode::OUT => {
                trace!("Outputting Accumulator {}", self.cpu.acc);
                console.write_integer(self.cpu.acc)?;
            }
            OpCode::END => {
                info!("Terminating program with status {}.", operand);
                self.cpu.running = false;
                self.exit_status = Some(operand);
                return Ok(Step::Halted(operand));
            }
            OpCode::JMP => {
                trace!("Jumping to program memory location {}", operand);
                self.cpu.pc = self.program.resolve(operand)?;
            }
            OpCode::SKIPZ => {
                trace!("Skipping next instruction if Accumulator == 0 (A={})", self.cpu.acc);
                if self.cpu.acc == 0 {
                    self.cpu.pc += 1;
                }
            }
        }

        Ok(Step::Continue)
    }

    fn illegal(&self, instr: Instruction) -> Result<Step> {
        match self.config.opcode_policy {
            OpcodePolicy::Lenient => {
                warn!(
                    "Illegal Instruction OpCode {} at {} -- ignoring it...",
                    instr.opcode, self.cpu.mar1
                );
                Ok(Step::Continue)
            }
            OpcodePolicy::Strict => Err(VmError::IllegalOpcode(instr.opcode)),
        }
    }

    /// Executes exactly one fetch-decode-execute cycle. Calling it on a
    /// halted machine is a no-op that reports the exit status again.
    pub fn step<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<Step> {
        if !self.cpu.running {
            return Ok(Step::Halted(self.exit_status.unwrap_or_default()));
        }

        let pc = self.cpu.pc;

        if self.stop.is_requested() {
            warn!("stop requested, aborting at {}", pc);
            return Err(VmError::Interrupted.at(pc, None));
        }

        if let Some(limit) = self.config.max_cycles {
            if self.cycles >= limit {
                return Err(VmError::CycleLimit(limit).at(pc, None));
            }
        }

        self.debug_state();

        let instr = self.fetch().map_err(|e| e.at(pc, None))?;
        self.cycles += 1;
        debug!("Executing Instruction ({}, {}) - {}", instr.opcode, instr.operand, instr);

        let outcome = match self.decode(pc) {
            Some(op) => self.execute(op, instr.operand, console),
            None => self.illegal(instr),
        };

        outcome.map_err(|e| e.at(pc, Some(instr)))
    }

    pub fn run<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<i32> {
        self.run_observed(console, |_| {})
    }

    /// Runs from address 0 until END, calling `observer` after every
    /// completed cycle. Any fault aborts the run.
    pub fn run_observed<C, F>(&mut self, console: &mut C, mut observer: F) -> Result<i32>
    where
        C: Console + ?Sized,
        F: FnMut(&Snapshot),
    {
        self.reset();

        loop {
            let step = self.step(console)?;
            observer(&self.snapshot());

            if let Step::Halted(status) = step {
                info!("{}", self.cpu);
                info!("Program terminated normally after {} cycles.", self.cycles);
                return Ok(status);
            }
        }
    }
}
