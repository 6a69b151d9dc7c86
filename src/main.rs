use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{bail, Result, WrapErr};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use harvard_emu::{
    encode, Address, Operand, Preset, Processor, Program, RunError, StepOutcome, Word,
    DEFAULT_MAX_STEPS,
};

/// Emulator for a three-operand toy processor with separate program and data memory.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Disable log output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a `.asm` file without running it
    Check {
        /// `.asm` file to check
        name: PathBuf,
    },
    /// Print the decoded instructions of a `.asm` file
    List {
        /// `.asm` file to list
        name: PathBuf,
    },
    /// Run a `.asm` file until it halts or the step budget runs out
    Run {
        /// `.asm` file to run
        name: PathBuf,
        /// Maximum number of instructions to execute
        #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
        max_steps: usize,
        /// Initial memory cell, as `ADDR=VALUE`. May be repeated
        #[arg(short, long = "mem", value_parser = parse_poke)]
        mem: Vec<(Address, Word)>,
    },
    /// Execute a `.asm` file one instruction at a time
    Step {
        /// `.asm` file to run
        name: PathBuf,
        /// Number of instructions to execute
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        /// Initial memory cell, as `ADDR=VALUE`. May be repeated
        #[arg(short, long = "mem", value_parser = parse_poke)]
        mem: Vec<(Address, Word)>,
    },
    /// Load and run one of the built in scenarios
    Preset {
        #[arg(value_enum)]
        preset: PresetArg,
        /// Maximum number of instructions to execute
        #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
        max_steps: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    Sum,
    Convolution,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Sum => Preset::Sum,
            PresetArg::Convolution => Preset::Convolution,
        }
    }
}

fn parse_poke(arg: &str) -> Result<(Address, Word), String> {
    let (address, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected `ADDR=VALUE`, found `{}`", arg))?;
    let address = address
        .trim()
        .parse()
        .map_err(|_| format!("invalid address `{}`", address))?;
    let value = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid value `{}`", value))?;

    Ok((address, value))
}

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    let args = Args::parse();

    let level = if args.quiet {
        LevelFilter::Off
    } else {
        match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    SimpleLogger::new().with_level(level).init()?; // logging

    match args.command {
        Command::Check { name } => {
            let program = assemble(&name)?;
            println!("{}: {} instructions", name.display(), program.len());
            Ok(())
        }
        Command::List { name } => {
            let program = assemble(&name)?;
            for (index, instruction) in program.iter().enumerate() {
                let dst = Operand::parse(&instruction.operand1).mode();
                let src = Operand::parse(&instruction.operand2).mode();
                println!(
                    "{:4}  {:<24} {} {}  {}",
                    index,
                    instruction.source,
                    dst,
                    src,
                    encode(instruction)
                );
            }
            Ok(())
        }
        Command::Run {
            name,
            max_steps,
            mem,
        } => {
            let mut cpu = load(&name, &mem)?;
            let result = cpu.run_auto(max_steps);
            finish(&cpu, result)
        }
        Command::Step { name, count, mem } => {
            let mut cpu = load(&name, &mem)?;

            for _ in 0..count {
                match cpu.step() {
                    StepOutcome::Continued => {
                        if let Some(instruction) = cpu.instruction_register() {
                            println!("[{}] {}", cpu.executed_count(), instruction);
                        }
                    }
                    StepOutcome::Halted => {
                        println!("Program finished");
                        break;
                    }
                    StepOutcome::Failed(message) => {
                        print!("{}", cpu.snapshot());
                        bail!(message);
                    }
                }
            }

            print!("{}", cpu.snapshot());
            Ok(())
        }
        Command::Preset { preset, max_steps } => {
            let preset = Preset::from(preset);
            let mut cpu = Processor::new();
            let count = preset.load(&mut cpu)?;
            println!("Loaded preset `{}` ({} instructions)", preset, count);

            let result = cpu.run_auto(max_steps);
            finish(&cpu, result)
        }
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).wrap_err_with(|| format!("failed to read `{}`", path.display()))
}

fn assemble(path: &Path) -> Result<Program> {
    read_source(path)?
        .parse::<Program>()
        .wrap_err_with(|| format!("failed to assemble `{}`", path.display()))
}

fn load(path: &Path, mem: &[(Address, Word)]) -> Result<Processor> {
    let source = read_source(path)?;

    let mut cpu = Processor::new();
    let count = cpu
        .load_program(&source)
        .wrap_err_with(|| format!("failed to assemble `{}`", path.display()))?;
    for (address, value) in mem {
        cpu.set_memory(*address, *value);
    }

    println!("Loaded {} instructions", count);
    Ok(cpu)
}

fn finish(cpu: &Processor, result: Result<usize, RunError>) -> Result<()> {
    print!("{}", cpu.snapshot());
    let steps = result?;
    println!("Executed {} steps", steps);
    Ok(())
}
