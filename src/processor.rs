use std::error;
use std::fmt;

use crate::encode::encode;
use crate::memory::{Address, Memory, Word};
use crate::operand::{Operand, Register, Registers};
use crate::program::{Instruction, Opcode, ParseError, Program};
use log::*;

/// Step budget used by [`Processor::run_auto`] when the caller has no preference
pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// Number of memory cells rendered by a [`Snapshot`]
const MEMORY_DISPLAY_LIMIT: usize = 30;

/// Condition codes. Only `add`, `sub` and `cmp` update them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags {
    /// Last result was zero
    pub zero: bool,
    /// Last result was negative
    pub sign: bool,
}

impl Flags {
    fn update(&mut self, result: Word) {
        self.zero = result == 0;
        self.sign = result < 0;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Status {
    /// Nothing loaded, or the last load failed
    #[default]
    Idle,
    Running,
    /// The program counter reached the end of the program
    Halted,
    /// An instruction failed to execute
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Idle => "idle",
            Status::Running => "running",
            Status::Halted => "finished",
            Status::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// One instruction was executed
    Continued,
    /// Nothing was executed, the machine is not running
    Halted,
    /// The instruction failed. The machine stopped with its state kept as is
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionError {
    Overflow { opcode: Opcode },
    InvalidJumpTarget { target: Word },
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::Overflow { opcode } => {
                write!(f, "arithmetic overflow in `{}`", opcode)
            }
            ExecutionError::InvalidJumpTarget { target } => {
                write!(f, "invalid jump target `{}`", target)
            }
        }
    }
}

impl error::Error for ExecutionError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// The program did not halt within the step budget
    LimitExceeded { steps: usize },
    /// A step failed after `steps` successful steps
    Failed { steps: usize, message: String },
}

impl RunError {
    pub fn steps(&self) -> usize {
        match self {
            RunError::LimitExceeded { steps } | RunError::Failed { steps, .. } => *steps,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::LimitExceeded { steps } => {
                write!(f, "program did not halt within {} steps", steps)
            }
            RunError::Failed { steps, message } => {
                write!(f, "{} (after {} steps)", message, steps)
            }
        }
    }
}

impl error::Error for RunError {}

/// Emulates the processor. Data memory and program are kept apart; the
/// program counter indexes instructions, not memory cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Processor {
    pub registers: Registers,
    pub flags: Flags,
    memory: Memory,
    program: Program,
    /// Program counter
    pc: usize,
    /// Instruction register, as an index into the program
    ir: Option<usize>,
    executed_count: u64,
    status: Status,
    last_error: Option<String>,
}

impl Processor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all state: registers, flags, memory and program
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Resets the machine, then parses `source` and installs it.
    /// Returns the number of instructions loaded.
    ///
    /// # Errors
    ///
    /// On a parse error the machine stays reset and idle; the error text is
    /// kept as the last error.
    pub fn load_program(&mut self, source: &str) -> Result<usize, ParseError> {
        self.reset();

        match source.parse::<Program>() {
            Ok(program) => Ok(self.load(program)),
            Err(err) => {
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Resets the machine and installs an already parsed program
    pub fn load(&mut self, program: Program) -> usize {
        self.reset();
        self.program = program;
        self.status = Status::Running;

        info!("Program loaded ({} instructions)", self.program.len());

        // nothing to execute
        if self.program.is_empty() {
            self.halt();
        }

        self.program.len()
    }

    /// Pokes a memory cell. Addresses outside the memory are ignored
    pub fn set_memory(&mut self, address: Address, value: Word) {
        self.memory.write(address, value);
    }

    pub fn get_memory(&self, address: Address) -> Word {
        self.memory.read(address)
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// The most recently fetched instruction
    pub fn instruction_register(&self) -> Option<&Instruction> {
        self.ir.and_then(|index| self.program.get(index))
    }

    pub fn executed_count(&self) -> u64 {
        self.executed_count
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn running(&self) -> bool {
        self.status == Status::Running
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Runs one fetch-decode-execute cycle
    pub fn step(&mut self) -> StepOutcome {
        if !self.running() || self.pc >= self.program.len() {
            if self.running() {
                self.halt();
            }
            return StepOutcome::Halted;
        }

        let instruction = self.program[self.pc].clone();
        self.ir = Some(self.pc);

        match self.execute_instruction(&instruction) {
            Ok(jump) => {
                self.pc = jump.unwrap_or(self.pc + 1);
                self.executed_count += 1;

                if self.pc >= self.program.len() {
                    self.halt();
                }

                StepOutcome::Continued
            }
            Err(err) => {
                let message = format!("execution error: {}", err);
                error!("[pc: {}] {} - {}", self.pc, message, instruction);

                self.last_error = Some(message.clone());
                self.status = Status::Failed;

                StepOutcome::Failed(message)
            }
        }
    }

    /// Steps until the program halts, fails or `max_steps` steps were
    /// executed. Returns the number of steps executed by this call.
    ///
    /// # Errors
    ///
    /// [`RunError::LimitExceeded`] if the program is still running after
    /// `max_steps` steps. The machine is left running so it can be inspected
    /// or resumed. [`RunError::Failed`] if a step failed.
    pub fn run_auto(&mut self, max_steps: usize) -> Result<usize, RunError> {
        let mut steps = 0;

        while self.running() && self.pc < self.program.len() && steps < max_steps {
            if let StepOutcome::Failed(message) = self.step() {
                return Err(RunError::Failed { steps, message });
            }
            steps += 1;
        }

        if self.running() && self.pc < self.program.len() {
            warn!("Step limit of {} exceeded at pc {}", max_steps, self.pc);
            return Err(RunError::LimitExceeded { steps });
        }

        Ok(steps)
    }

    /// Read-only copy of the machine state
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            registers: self.registers,
            flags: self.flags,
            memory: self.memory.clone(),
            pc: self.pc,
            instruction_register: self.instruction_register().cloned(),
            executed_count: self.executed_count,
            running: self.running(),
            status: self.status,
            last_error: self.last_error.clone(),
        }
    }

    fn halt(&mut self) {
        self.status = Status::Halted;

        let result = self.registers[Register::Eax];
        info!(
            "Program terminated after {} instructions. Result: {}",
            self.executed_count, result
        );
    }

    fn read(&self, operand: Operand) -> Word {
        operand.read(&self.registers, &self.memory)
    }

    fn write(&mut self, operand: Operand, value: Word) {
        operand.write(&mut self.registers, &mut self.memory, value);
    }

    /// Resolves a jump operand to an instruction index. The end of the
    /// program is a valid target and halts the machine.
    fn jump_target(&self, operand: Operand) -> Result<usize, ExecutionError> {
        let target = self.read(operand);

        usize::try_from(target)
            .ok()
            .filter(|index| *index <= self.program.len())
            .ok_or(ExecutionError::InvalidJumpTarget { target })
    }

    /// Executes a single instruction. Returns the new program counter if a
    /// jump was taken.
    fn execute_instruction(
        &mut self,
        instruction: &Instruction,
    ) -> Result<Option<usize>, ExecutionError> {
        let opcode = instruction.opcode;
        let dst = Operand::parse(&instruction.operand1);
        let src = Operand::parse(&instruction.operand2);
        let overflow = ExecutionError::Overflow { opcode };

        trace!(
            "{} {} ({}) {} ({})",
            opcode,
            instruction.operand1,
            dst.mode(),
            instruction.operand2,
            src.mode()
        );

        match opcode {
            Opcode::Mov => {
                let value = self.read(src);
                self.write(dst, value);

                debug!("MOV {}: {}", instruction.operand1, value);
            }
            Opcode::Add => {
                let (a, b) = (self.read(dst), self.read(src));
                let result = a.checked_add(b).ok_or(overflow)?;
                self.write(dst, result);
                self.flags.update(result);

                debug!("ADD {} {}: {}", a, b, result);
            }
            Opcode::Sub => {
                let (a, b) = (self.read(dst), self.read(src));
                let result = a.checked_sub(b).ok_or(overflow)?;
                self.write(dst, result);
                self.flags.update(result);

                debug!("SUB {} {}: {}", a, b, result);
            }
            Opcode::Mul => {
                let (a, b) = (self.read(dst), self.read(src));
                let result = a.checked_mul(b).ok_or(overflow)?;
                self.write(dst, result);

                debug!("MUL {} {}: {}", a, b, result);
            }
            Opcode::Div => {
                let divisor = self.read(src);
                if divisor == 0 {
                    warn!("[pc: {}] division by zero skipped", self.pc);
                } else {
                    let a = self.read(dst);
                    // truncates toward zero
                    let result = a.checked_div(divisor).ok_or(overflow)?;
                    self.write(dst, result);

                    debug!("DIV {} {}: {}", a, divisor, result);
                }
            }
            Opcode::And => {
                let (a, b) = (self.read(dst), self.read(src));
                self.write(dst, a & b);

                debug!("AND {} {}: {}", a, b, a & b);
            }
            Opcode::Or => {
                let (a, b) = (self.read(dst), self.read(src));
                self.write(dst, a | b);

                debug!("OR {} {}: {}", a, b, a | b);
            }
            Opcode::Xor => {
                let (a, b) = (self.read(dst), self.read(src));
                self.write(dst, a ^ b);

                debug!("XOR {} {}: {}", a, b, a ^ b);
            }
            Opcode::Not => {
                let value = self.read(dst);
                self.write(dst, !value);

                debug!("NOT {}: {}", value, !value);
            }
            Opcode::Inc => {
                let value = self.read(dst);
                let result = value.checked_add(1).ok_or(overflow)?;
                self.write(dst, result);

                debug!("INC {}: {}", value, result);
            }
            Opcode::Cmp => {
                let (a, b) = (self.read(dst), self.read(src));
                let result = a.checked_sub(b).ok_or(overflow)?;
                self.flags.update(result);

                debug!("CMP {} {}: {}", a, b, result);
            }
            Opcode::Jmp | Opcode::Jz | Opcode::Jnz | Opcode::Js | Opcode::Jns => {
                let taken = match opcode {
                    Opcode::Jz => self.flags.zero,
                    Opcode::Jnz => !self.flags.zero,
                    Opcode::Js => self.flags.sign,
                    Opcode::Jns => !self.flags.sign,
                    _ => true,
                };

                if taken {
                    let target = self.jump_target(dst)?;
                    debug!("{} {}: taken", opcode.mnemonic().to_uppercase(), target);
                    return Ok(Some(target));
                }

                debug!("{}: not taken", opcode.mnemonic().to_uppercase());
            }
        }

        Ok(None)
    }
}

/// A copy of the machine state, for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub registers: Registers,
    pub flags: Flags,
    pub memory: Memory,
    pub pc: usize,
    pub instruction_register: Option<Instruction>,
    pub executed_count: u64,
    pub running: bool,
    pub status: Status,
    pub last_error: Option<String>,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (reg, value) in self.registers.iter() {
            writeln!(f, "{}: {}", reg.name().to_uppercase(), value)?;
        }
        writeln!(
            f,
            "Z: {}  S: {}",
            self.flags.zero as u8, self.flags.sign as u8
        )?;
        writeln!(f, "PC: {}", self.pc)?;
        match &self.instruction_register {
            Some(instruction) => {
                writeln!(f, "IR: {}", instruction)?;
                writeln!(f, "BIN: {}", encode(instruction))?;
            }
            None => {
                writeln!(f, "IR: -")?;
                writeln!(f, "BIN: -")?;
            }
        }
        writeln!(f, "Executed: {}", self.executed_count)?;
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "Result: {}", self.registers[Register::Eax])?;
        if let Some(err) = &self.last_error {
            writeln!(f, "Error: {}", err)?;
        }

        writeln!(f, "Addr    Value")?;
        writeln!(f, "{}", "-".repeat(20))?;
        for (address, value) in self.memory.iter().take(MEMORY_DISPLAY_LIMIT) {
            writeln!(f, "[{:3}]  {:6}", address, value)?;
        }

        Ok(())
    }
}
