//! mov ecx [0]
//! ; sum memory[ecx] down to memory[1]
//! add eax [ecx]
//! sub ecx 1
//! jnz 1

use std::error;
use std::{fmt, str::Lines};

use super::{Instruction, Opcode, Program};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnknownOpcode,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::UnknownOpcode => f.write_str("unknown opcode"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    token: String,
    line_nr: usize,
}

impl ParseError {
    fn new<S: Into<String>>(kind: ParseErrorKind, token: S, line_nr: usize) -> Self {
        Self {
            kind,
            token: token.into(),
            line_nr,
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// The offending source token
    pub fn token(&self) -> &str {
        &self.token
    }

    /// 1-based line of the source text
    pub fn line(&self) -> usize {
        self.line_nr
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error [ln: {}]: {} `{}`",
            self.line_nr, self.kind, self.token
        )
    }
}

impl error::Error for ParseError {}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

#[derive(Debug, Clone)]
pub struct Parser<'a> {
    lines: Lines<'a>,
    line_nr: usize,
    instructions: Vec<Instruction>,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the assembly source `data`.
    pub fn new(data: &'a str) -> Self {
        Self {
            lines: data.lines(),
            line_nr: 0,
            instructions: Vec::new(),
        }
    }

    /// Consumes `self` and tries to parse all of the source into a program.
    ///
    /// # Errors
    ///
    /// Parsing stops at the first line with an unknown opcode. No partial
    /// program is returned.
    pub fn parse(mut self) -> Result<Program> {
        while let Some(res) = self.parse_next_line() {
            if let Err(err) = res {
                log::error!("{}", err);
                return Err(err);
            }
        }

        Ok(Program::new(self.instructions))
    }

    /// Tries to parse the next line of the source. Each instruction should
    /// be located on its own line.
    fn parse_next_line(&mut self) -> Option<Result<()>> {
        let line = self.lines.next()?.trim();
        self.line_nr += 1;

        if line.is_empty() || line.starts_with(';') {
            // Comment or empty line; skip
            Some(Ok(()))
        } else {
            Some(self.parse_instruction(line))
        }
    }

    /// Tries to parse a trimmed, non-empty line as an instruction. Missing
    /// operands become empty tokens and tokens after the second operand are
    /// ignored.
    ///
    /// # Examples
    ///
    /// - `mov eax [ebx]`
    /// - `INC ecx`
    /// - `jmp 0`
    fn parse_instruction(&mut self, line: &str) -> Result<()> {
        let mut tokens = line.split_whitespace();
        let mnemonic = tokens.next().unwrap_or_default();

        let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| {
            ParseError::new(ParseErrorKind::UnknownOpcode, mnemonic, self.line_nr)
        })?;

        let operand1 = tokens.next().unwrap_or_default();
        let operand2 = tokens.next().unwrap_or_default();

        log::debug!("[{}] Found instruction {}", self.line_nr, opcode);

        self.instructions
            .push(Instruction::new(opcode, operand1, operand2, line));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::Result;

    #[test]
    fn parse_sum() -> Result<()> {
        let data = r#"
            mov ecx [0]
            add eax [ecx]
            sub ecx 1
            jnz 1
        "#;

        let program: Program = data.parse()?;

        assert_eq!(program.len(), 4);
        assert_eq!(program[0], Instruction::new(Opcode::Mov, "ecx", "[0]", "mov ecx [0]"));
        assert_eq!(program[1].opcode, Opcode::Add);
        assert_eq!(program[1].operand2, "[ecx]");
        assert_eq!(program[3].opcode, Opcode::Jnz);
        assert_eq!(program[3].operand1, "1");
        assert_eq!(program[3].operand2, "");

        Ok(())
    }

    #[test]
    fn parse_skips_comments_and_blank_lines() -> Result<()> {
        let data = "; header\n\n   ; indented comment\nmov eax 1\n\t\ninc eax\n";

        let program: Program = data.parse()?;

        assert_eq!(program.len(), 2);
        assert_eq!(program[0].source, "mov eax 1");
        assert_eq!(program[1].source, "inc eax");

        Ok(())
    }

    #[test]
    fn parse_opcode_ignores_case() -> Result<()> {
        let program: Program = "MOV eax 1\nJnZ 0".parse()?;

        assert_eq!(program[0].opcode, Opcode::Mov);
        assert_eq!(program[1].opcode, Opcode::Jnz);

        Ok(())
    }

    #[test]
    fn parse_keeps_operand_case() -> Result<()> {
        let program: Program = "mov EAX [Ebx]".parse()?;

        assert_eq!(program[0].operand1, "EAX");
        assert_eq!(program[0].operand2, "[Ebx]");

        Ok(())
    }

    #[test]
    fn parse_missing_operands_are_empty() -> Result<()> {
        let program: Program = "add\nnot eax".parse()?;

        assert_eq!(program[0].operand1, "");
        assert_eq!(program[0].operand2, "");
        assert_eq!(program[1].operand1, "eax");
        assert_eq!(program[1].operand2, "");

        Ok(())
    }

    #[test]
    fn parse_ignores_extra_tokens() -> Result<()> {
        let program: Program = "mov eax 5 ; load five".parse()?;

        assert_eq!(program.len(), 1);
        assert_eq!(program[0].operand1, "eax");
        assert_eq!(program[0].operand2, "5");
        assert_eq!(program[0].source, "mov eax 5 ; load five");

        Ok(())
    }

    #[test]
    fn parse_unknown_opcode_reports_source_line() -> Result<()> {
        let data = "mov eax 1\n; comment\n\nnop\ninc eax";

        let err = data.parse::<Program>().unwrap_err();

        assert_eq!(err.kind(), ParseErrorKind::UnknownOpcode);
        assert_eq!(err.line(), 4);
        assert_eq!(err.token(), "nop");
        assert_eq!(err.to_string(), "error [ln: 4]: unknown opcode `nop`");

        Ok(())
    }

    #[test]
    fn parse_empty_source() -> Result<()> {
        let program: Program = "\n; nothing here\n".parse()?;

        assert!(program.is_empty());

        Ok(())
    }
}
