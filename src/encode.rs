//! Diagnostic binary rendering of an instruction.
//!
//! The layout is 40 bits: a 4 bit opcode followed by two operand fields of
//! a 2 bit addressing mode and a 16 bit value. Only the opcode is filled in;
//! the operand fields are fixed placeholders and do not reflect the actual
//! operands. Nothing in the processor consumes this encoding.

use crate::program::Instruction;

/// Placeholder for one operand field: `mode.value`
const OPERAND_PLACEHOLDER: &str = "00.0000000000000000";

/// Renders `instruction` as `oooo|mm.vvvvvvvvvvvvvvvv|mm.vvvvvvvvvvvvvvvv`
pub fn encode(instruction: &Instruction) -> String {
    format!(
        "{:04b}|{}|{}",
        u8::from(instruction.opcode),
        OPERAND_PLACEHOLDER,
        OPERAND_PLACEHOLDER
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Opcode;
    use color_eyre::eyre::Result;

    #[test]
    fn test_encode_opcode_bits() -> Result<()> {
        let mov = Instruction::new(Opcode::Mov, "eax", "1", "mov eax 1");
        let inc = Instruction::new(Opcode::Inc, "eax", "", "inc eax");
        let js = Instruction::new(Opcode::Js, "3", "", "js 3");

        assert_eq!(encode(&mov), "0000|00.0000000000000000|00.0000000000000000");
        assert_eq!(encode(&inc), "1111|00.0000000000000000|00.0000000000000000");
        assert_eq!(encode(&js), "1000|00.0000000000000000|00.0000000000000000");

        Ok(())
    }

    #[test]
    fn test_operand_fields_are_placeholders() -> Result<()> {
        let a = Instruction::new(Opcode::Add, "eax", "[5]", "add eax [5]");
        let b = Instruction::new(Opcode::Add, "[ebx]", "-7", "add [ebx] -7");

        assert_eq!(encode(&a), encode(&b));
        // 4 opcode bits + 2 * (2 mode bits + 16 value bits)
        let bits = encode(&a).chars().filter(|c| *c == '0' || *c == '1').count();
        assert_eq!(bits, 40);

        Ok(())
    }
}
