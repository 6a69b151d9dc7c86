use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

pub mod parse;

pub use parse::{ParseError, ParseErrorKind};

macro_rules! opcodes {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $repr:literal => $mnemonic:literal , )+ ) => {
        /// The closed set of operations understood by the processor.
        /// The discriminant is the 4 bit operation code.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Opcode {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Opcode {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            /// Lowercase assembly mnemonic
            pub fn mnemonic(&self) -> &'static str {
                match self {
                    $( Self::$name => $mnemonic , )+
                }
            }
        }
    }
}

opcodes! {
    /// Copy operand 2 into operand 1
    Mov = 0b0000 => "mov",
    /// Add operand 2 to operand 1. Sets flags
    Add = 0b0001 => "add",
    /// Subtract operand 2 from operand 1. Sets flags
    Sub = 0b0010 => "sub",
    /// Multiply operand 1 by operand 2
    Mul = 0b0011 => "mul",
    /// Divide operand 1 by operand 2, truncating toward zero.
    /// A zero divisor skips the instruction
    Div = 0b0100 => "div",
    /// Jump to an instruction index
    Jmp = 0b0101 => "jmp",
    /// Jump if the zero flag is set
    Jz = 0b0110 => "jz",
    /// Jump if the zero flag is clear
    Jnz = 0b0111 => "jnz",
    /// Jump if the sign flag is set
    Js = 0b1000 => "js",
    /// Jump if the sign flag is clear
    Jns = 0b1001 => "jns",
    /// Bitwise and
    And = 0b1010 => "and",
    /// Bitwise or
    Or = 0b1011 => "or",
    /// Bitwise exclusive or
    Xor = 0b1100 => "xor",
    /// Bitwise complement of operand 1
    Not = 0b1101 => "not",
    /// Compare operand 1 with operand 2. Only sets flags
    Cmp = 0b1110 => "cmp",
    /// Increment operand 1
    Inc = 0b1111 => "inc",
}

impl Opcode {
    /// Looks up an opcode by mnemonic, ignoring ASCII case
    pub fn from_mnemonic(token: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|opcode| opcode.mnemonic().eq_ignore_ascii_case(token))
    }

    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            Self::Jmp | Self::Jz | Self::Jnz | Self::Js | Self::Jns
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A single decoded line of the program
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: Opcode,
    /// First operand token, empty if the line had none
    pub operand1: String,
    /// Second operand token, empty if the line had none
    pub operand2: String,
    /// The trimmed source line
    pub source: String,
}

impl Instruction {
    pub fn new<A, B, S>(opcode: Opcode, operand1: A, operand2: B, source: S) -> Self
    where
        A: Into<String>,
        B: Into<String>,
        S: Into<String>,
    {
        Self {
            opcode,
            operand1: operand1.into(),
            operand2: operand2.into(),
            source: source.into(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// An ordered list of instructions, indexed by the program counter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}

impl Deref for Program {
    type Target = [Instruction];

    fn deref(&self) -> &Self::Target {
        &self.instructions
    }
}

impl FromStr for Program {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::Parser::new(s).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_opcode_codes() -> Result<()> {
        assert_eq!(Opcode::ALL.len(), 16);
        for (code, opcode) in Opcode::ALL.iter().enumerate() {
            assert_eq!(u8::from(*opcode), code as u8);
            assert_eq!(Opcode::try_from(code as u8)?, *opcode);
        }
        assert!(Opcode::try_from(16u8).is_err());

        Ok(())
    }

    #[test]
    fn test_from_mnemonic_ignores_case() -> Result<()> {
        assert_eq!(Opcode::from_mnemonic("mov"), Some(Opcode::Mov));
        assert_eq!(Opcode::from_mnemonic("JNZ"), Some(Opcode::Jnz));
        assert_eq!(Opcode::from_mnemonic("Xor"), Some(Opcode::Xor));
        assert_eq!(Opcode::from_mnemonic("nop"), None);
        assert_eq!(Opcode::from_mnemonic(""), None);

        Ok(())
    }

    #[test]
    fn test_jump_opcodes() -> Result<()> {
        let jumps = Opcode::ALL.iter().filter(|opcode| opcode.is_jump()).count();
        assert_eq!(jumps, 5);

        Ok(())
    }

    #[test]
    fn test_program_from_str() -> Result<()> {
        let program: Program = "mov eax 1\ninc eax".parse()?;
        assert_eq!(program.len(), 2);
        assert_eq!(program[1].opcode, Opcode::Inc);
        assert_eq!(program[1].to_string(), "inc eax");

        Ok(())
    }
}
