//! Emulator for a small three-operand processor with separate program and
//! data memory.
//!
//! ```
//! use harvard_emu::{Processor, Register, DEFAULT_MAX_STEPS};
//!
//! let mut cpu = Processor::new();
//! cpu.load_program("mov ecx [0]\nadd eax [ecx]\nsub ecx 1\njnz 1").unwrap();
//! cpu.set_memory(0, 2);
//! cpu.set_memory(1, 40);
//! cpu.set_memory(2, 2);
//!
//! cpu.run_auto(DEFAULT_MAX_STEPS).unwrap();
//! assert_eq!(cpu.registers[Register::Eax], 42);
//! ```

pub mod encode;
pub mod memory;
pub mod operand;
pub mod preset;
pub mod processor;
pub mod program;

pub use encode::encode;
pub use memory::{Address, Memory, Word, MEMORY_SIZE};
pub use operand::{AddressingMode, Operand, Register, Registers};
pub use preset::Preset;
pub use processor::{
    ExecutionError, Flags, Processor, RunError, Snapshot, Status, StepOutcome, DEFAULT_MAX_STEPS,
};
pub use program::{Instruction, Opcode, ParseError, ParseErrorKind, Program};
