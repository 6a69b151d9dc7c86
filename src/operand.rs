//! Operand addressing.
//!
//! The addressing mode of an operand is not stored with the instruction, it
//! is derived from the token text every time the operand is resolved:
//!
//! | Token          | Mode              | Code |
//! |----------------|-------------------|------|
//! | `eax`          | register          | `00` |
//! | `5`            | immediate         | `01` |
//! | `[eax]`        | register indirect | `10` |
//! | `[5]`          | direct            | `11` |
//!
//! Tokens that fit none of these resolve to the immediate value `0`.

use std::fmt;
use std::ops::{Index, IndexMut};

use num_enum::IntoPrimitive;

use crate::memory::{Address, Memory, Word};

/// General purpose registers
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(IntoPrimitive)]
pub enum Register {
    Eax = 0,
    Ebx = 1,
    Ecx = 2,
    Edx = 3,
}

impl Register {
    pub const ALL: &'static [Self] = &[Self::Eax, Self::Ebx, Self::Ecx, Self::Edx];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Eax => "eax",
            Self::Ebx => "ebx",
            Self::Ecx => "ecx",
            Self::Edx => "edx",
        }
    }

    /// Register names are matched exactly, `EAX` is not a register
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|reg| reg.name() == name)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The register file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Registers([Word; 4]);

impl Registers {
    pub fn iter(&self) -> impl Iterator<Item = (Register, Word)> + '_ {
        Register::ALL.iter().map(move |reg| (*reg, self[*reg]))
    }
}

impl Index<Register> for Registers {
    type Output = Word;

    fn index(&self, reg: Register) -> &Self::Output {
        &self.0[u8::from(reg) as usize]
    }
}

impl IndexMut<Register> for Registers {
    fn index_mut(&mut self, reg: Register) -> &mut Self::Output {
        &mut self.0[u8::from(reg) as usize]
    }
}

/// 2 bit addressing mode code
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(IntoPrimitive)]
pub enum AddressingMode {
    Register = 0b00,
    Immediate = 0b01,
    Indirect = 0b10,
    Direct = 0b11,
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Register => "reg",
            Self::Immediate => "imm",
            Self::Indirect => "ind",
            Self::Direct => "dir",
        };
        f.write_str(name)
    }
}

/// A resolved operand token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Register(Register),
    /// Memory at the address held in a register
    Indirect(Register),
    /// Memory at a literal address
    Direct(Address),
    Immediate(Word),
}

impl Operand {
    /// Classifies an operand token. Never fails: unrecognised tokens
    /// (including the empty token of a missing operand) become `Immediate(0)`.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();

        if let Some(inner) = token
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            let inner = inner.trim();
            return match Register::from_name(inner) {
                Some(reg) => Self::Indirect(reg),
                None => inner
                    .parse::<Address>()
                    .map(Self::Direct)
                    .unwrap_or(Self::Immediate(0)),
            };
        }

        match Register::from_name(token) {
            Some(reg) => Self::Register(reg),
            None => Self::Immediate(token.parse().unwrap_or(0)),
        }
    }

    pub fn mode(&self) -> AddressingMode {
        match self {
            Self::Register(_) => AddressingMode::Register,
            Self::Indirect(_) => AddressingMode::Indirect,
            Self::Direct(_) => AddressingMode::Direct,
            Self::Immediate(_) => AddressingMode::Immediate,
        }
    }

    /// Reads the value the operand designates
    pub fn read(&self, registers: &Registers, memory: &Memory) -> Word {
        match *self {
            Self::Register(reg) => registers[reg],
            Self::Indirect(reg) => memory.read(registers[reg]),
            Self::Direct(address) => memory.read(address),
            Self::Immediate(value) => value,
        }
    }

    /// Stores `value` into the location the operand designates. Writing to an
    /// immediate does nothing.
    pub fn write(&self, registers: &mut Registers, memory: &mut Memory, value: Word) {
        match *self {
            Self::Register(reg) => registers[reg] = value,
            Self::Indirect(reg) => memory.write(registers[reg], value),
            Self::Direct(address) => memory.write(address, value),
            Self::Immediate(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_classify_tokens() -> Result<()> {
        assert_eq!(Operand::parse("eax"), Operand::Register(Register::Eax));
        assert_eq!(Operand::parse("[edx]"), Operand::Indirect(Register::Edx));
        assert_eq!(Operand::parse("[42]"), Operand::Direct(42));
        assert_eq!(Operand::parse("[-3]"), Operand::Direct(-3));
        assert_eq!(Operand::parse("-17"), Operand::Immediate(-17));
        assert_eq!(Operand::parse("+8"), Operand::Immediate(8));

        Ok(())
    }

    #[test]
    fn test_unparseable_tokens_are_zero() -> Result<()> {
        assert_eq!(Operand::parse(""), Operand::Immediate(0));
        assert_eq!(Operand::parse("foo"), Operand::Immediate(0));
        assert_eq!(Operand::parse("EAX"), Operand::Immediate(0));
        assert_eq!(Operand::parse("[foo]"), Operand::Immediate(0));
        assert_eq!(Operand::parse("[eax"), Operand::Immediate(0));
        assert_eq!(Operand::parse("99999999999999999999"), Operand::Immediate(0));

        Ok(())
    }

    #[test]
    fn test_modes() -> Result<()> {
        assert_eq!(u8::from(Operand::parse("ebx").mode()), 0b00);
        assert_eq!(u8::from(Operand::parse("5").mode()), 0b01);
        assert_eq!(u8::from(Operand::parse("[ebx]").mode()), 0b10);
        assert_eq!(u8::from(Operand::parse("[5]").mode()), 0b11);
        assert_eq!(Operand::parse("[5]").mode().to_string(), "dir");

        Ok(())
    }

    #[test]
    fn test_read() -> Result<()> {
        let mut registers = Registers::default();
        let mut memory = Memory::default();
        registers[Register::Ebx] = 7;
        memory.write(7, 70);
        memory.write(3, 30);

        assert_eq!(Operand::parse("ebx").read(&registers, &memory), 7);
        assert_eq!(Operand::parse("[ebx]").read(&registers, &memory), 70);
        assert_eq!(Operand::parse("[3]").read(&registers, &memory), 30);
        assert_eq!(Operand::parse("12").read(&registers, &memory), 12);
        assert_eq!(Operand::parse("[5000]").read(&registers, &memory), 0);

        Ok(())
    }

    #[test]
    fn test_write() -> Result<()> {
        let mut registers = Registers::default();
        let mut memory = Memory::default();
        registers[Register::Ecx] = 9;

        Operand::parse("eax").write(&mut registers, &mut memory, 1);
        Operand::parse("[ecx]").write(&mut registers, &mut memory, 2);
        Operand::parse("[4]").write(&mut registers, &mut memory, 3);

        assert_eq!(registers[Register::Eax], 1);
        assert_eq!(memory.read(9), 2);
        assert_eq!(memory.read(4), 3);

        Ok(())
    }

    #[test]
    fn test_write_to_immediate_is_noop() -> Result<()> {
        let mut registers = Registers::default();
        let mut memory = Memory::default();

        Operand::parse("5").write(&mut registers, &mut memory, 99);
        Operand::parse("junk").write(&mut registers, &mut memory, 99);

        assert_eq!(registers, Registers::default());
        assert!(memory.is_empty());

        Ok(())
    }

    #[test]
    fn test_indirect_out_of_range() -> Result<()> {
        let mut registers = Registers::default();
        let mut memory = Memory::default();
        registers[Register::Eax] = -1;

        Operand::parse("[eax]").write(&mut registers, &mut memory, 5);

        assert!(memory.is_empty());
        assert_eq!(Operand::parse("[eax]").read(&registers, &memory), 0);

        Ok(())
    }
}
