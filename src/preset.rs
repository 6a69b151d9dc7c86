//! Ready made scenarios: a program plus the data memory it works on.

use std::fmt;

use crate::memory::{Address, Word};
use crate::processor::Processor;
use crate::program::ParseError;

const SUM_SOURCE: &str = "\
; sum of memory[1..=memory[0]] into eax
mov ecx [0]
add eax [ecx]
sub ecx 1
jnz 1
";

const CONVOLUTION_SOURCE: &str = "\
; dot product of two arrays of length memory[0]
; a = memory[1..=n], b = memory[n+1..=2n]
mov ecx [0]
mov ebx ecx
add ebx [0]
mov edx [ecx]
mul edx [ebx]
add eax edx
sub ecx 1
jnz 1
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// Sum of the array `100..=105`
    Sum,
    /// Dot product of ten ones with ten twos
    Convolution,
}

impl Preset {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Convolution => "convolution",
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Self::Sum => SUM_SOURCE,
            Self::Convolution => CONVOLUTION_SOURCE,
        }
    }

    /// Initial data memory as `(address, value)` pairs
    pub fn memory(&self) -> Vec<(Address, Word)> {
        match self {
            Self::Sum => {
                let mut cells = vec![(0, 6)];
                cells.extend((1..=6).map(|address| (address, 100 + address - 1)));
                cells
            }
            Self::Convolution => {
                let mut cells = vec![(0, 10)];
                cells.extend((1..=10).map(|address| (address, 1)));
                cells.extend((11..=20).map(|address| (address, 2)));
                cells
            }
        }
    }

    /// Loads the program into `processor`, which resets it, then fills in
    /// the data memory.
    pub fn load(&self, processor: &mut Processor) -> Result<usize, ParseError> {
        let count = processor.load_program(self.source())?;

        for (address, value) in self.memory() {
            processor.set_memory(address, value);
        }

        log::info!("Preset `{}` loaded", self.name());

        Ok(count)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
