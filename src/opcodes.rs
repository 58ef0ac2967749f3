//! Intcode Instruction Set
//!
//! Ten opcodes, three parameter modes. An instruction word packs both:
//!
//! ```text
//!   ABCDE        1002
//!   A  - mode of 3rd parameter   (0)
//!   B  - mode of 2nd parameter   1 = immediate
//!   C  - mode of 1st parameter   0 = position
//!   DE - two-digit opcode        02 = MUL
//! ```

use crate::error::{IntcodeError, Result};

/// Intcode operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Add          = 1,
    Mul          = 2,
    Input        = 3,
    Output       = 4,
    JumpIfTrue   = 5,
    JumpIfFalse  = 6,
    LessThan     = 7,
    Equals       = 8,
    AdjustBase   = 9,
    Halt         = 99,
}

impl Opcode {
    /// Decode the two low digits of an instruction word
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Add),
            2 => Some(Self::Mul),
            3 => Some(Self::Input),
            4 => Some(Self::Output),
            5 => Some(Self::JumpIfTrue),
            6 => Some(Self::JumpIfFalse),
            7 => Some(Self::LessThan),
            8 => Some(Self::Equals),
            9 => Some(Self::AdjustBase),
            99 => Some(Self::Halt),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        *self as u8 as i64
    }

    /// Number of parameters following the opcode word
    pub fn params(&self) -> usize {
        match self {
            Self::Add | Self::Mul | Self::LessThan | Self::Equals => 3,
            Self::JumpIfTrue | Self::JumpIfFalse => 2,
            Self::Input | Self::Output | Self::AdjustBase => 1,
            Self::Halt => 0,
        }
    }

    /// Instruction pointer advance when no jump is taken
    pub fn width(&self) -> usize {
        self.params() + 1
    }

    /// Get human-readable mnemonic
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Mul => "MUL",
            Self::Input => "IN",
            Self::Output => "OUT",
            Self::JumpIfTrue => "JT",
            Self::JumpIfFalse => "JF",
            Self::LessThan => "LT",
            Self::Equals => "EQ",
            Self::AdjustBase => "ARB",
            Self::Halt => "HALT",
        }
    }
}

/// How an operand is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParamMode {
    /// Operand is an address to dereference
    Position  = 0,
    /// Operand is the value itself. Never valid for write targets.
    Immediate = 1,
    /// Operand is an offset from the relative base
    Relative  = 2,
}

impl ParamMode {
    pub fn from_digit(digit: i64) -> Option<Self> {
        match digit {
            0 => Some(Self::Position),
            1 => Some(Self::Immediate),
            2 => Some(Self::Relative),
            _ => None,
        }
    }
}

/// Split a word into its raw opcode and the three mode digits.
pub fn split_word(word: i64) -> (i64, [i64; 3]) {
    (
        word % 100,
        [(word / 100) % 10, (word / 1000) % 10, (word / 10000) % 10],
    )
}

/// A decoded instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub modes: [ParamMode; 3],
}

impl Instruction {
    /// Decode the word found at `ip`.
    ///
    /// Only the modes of parameters the opcode actually takes are validated;
    /// digits above them are ignored.
    pub fn decode(word: i64, ip: usize) -> Result<Self> {
        let (code, digits) = split_word(word);
        let opcode = Opcode::from_code(code)
            .ok_or(IntcodeError::UnknownOpcode { opcode: code, ip })?;

        let mut modes = [ParamMode::Position; 3];
        for (idx, &digit) in digits.iter().enumerate().take(opcode.params()) {
            modes[idx] = ParamMode::from_digit(digit)
                .ok_or(IntcodeError::InvalidMode { mode: digit, ip })?;
        }

        Ok(Self { opcode, modes })
    }

    pub fn mnemonic(&self) -> &'static str {
        self.opcode.mnemonic()
    }
}
