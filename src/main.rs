use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::info;

use tinyvm::config::{Config, OpcodePolicy, DEFAULT_DATA_CAPACITY, DEFAULT_PROGRAM_CAPACITY};
use tinyvm::io::{IntegerReader, StdConsole};
use tinyvm::program::Program;
use tinyvm::{EmulationEngine, Result};

/// Simulator for the TinyVM single-accumulator machine
#[derive(Parser, Debug)]
#[command(name = "tinyvm", author, version, about, long_about = None)]
struct Args {
    /// Program of whitespace-separated `opcode operand` pairs. When omitted
    /// the program is read from stdin up to the first non-integer token and
    /// IN keeps reading from there.
    file: Option<PathBuf>,

    /// Number of data memory cells.
    #[arg(long, default_value_t = DEFAULT_DATA_CAPACITY)]
    data_size: usize,

    /// Number of instruction memory slots.
    #[arg(long, default_value_t = DEFAULT_PROGRAM_CAPACITY)]
    program_size: usize,

    /// Abort on illegal op codes instead of skipping them.
    #[arg(long)]
    strict: bool,

    /// Abort after this many cycles.
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Initial data memory values, starting at address 0 (e.g. `42,-1,7`).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    memory: Vec<i32>,

    /// Print data and program memory before running.
    #[arg(long)]
    dump: bool,

    /// Trace every cycle.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            data_capacity: self.data_size,
            program_capacity: self.program_size,
            opcode_policy: if self.strict {
                OpcodePolicy::Strict
            } else {
                OpcodePolicy::Lenient
            },
            max_cycles: self.max_cycles,
        }
    }
}

fn dump(vm: &EmulationEngine) {
    println!("{}", vm.dump_data());
    print!("{}", vm.dump_program());
}

fn run(args: &Args) -> Result<i32> {
    let mut vm = EmulationEngine::new(args.config())?;
    vm.load_data(&args.memory)?;

    match &args.file {
        Some(path) => {
            info!("Opening file '{}' for reading...", path.display());
            let source = fs::read_to_string(path)?;
            vm.load_program(&Program::parse(&source)?)?;
            if args.dump {
                dump(&vm);
            }
            vm.run(&mut StdConsole::stdio())
        }
        None => {
            info!("Reading program instructions from the console...");
            let mut input = IntegerReader::new(io::stdin().lock());
            vm.load_program(&Program::read_from(&mut input)?)?;
            if args.dump {
                dump(&vm);
            }
            vm.run(&mut StdConsole::new(input, io::stdout()))
        }
    }
}

fn main() {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match run(&args) {
        Ok(status) => process::exit(status),
        Err(e) => {
            log::error!("{}", e);
            process::exit(-1);
        }
    }
}
