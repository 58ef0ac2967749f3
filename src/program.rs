//! Intcode Program Text Format
//!
//! Object code is a single line of decimal integers separated by commas:
//! `1,9,10,3,2,3,11,0,99,30,40,50`. Whitespace around tokens and a
//! trailing comma or newline are tolerated.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{IntcodeError, Result};

/// An immutable Intcode image. Machines take a private copy on load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    code: Vec<i64>,
}

impl Program {
    pub fn new(code: Vec<i64>) -> Self {
        Self { code }
    }

    /// Read and parse a program file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| IntcodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.code
    }

    pub fn len(&self) -> usize { self.code.len() }
    pub fn is_empty(&self) -> bool { self.code.is_empty() }

    pub fn into_inner(self) -> Vec<i64> {
        self.code
    }
}

impl FromStr for Program {
    type Err = IntcodeError;

    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        let text = text.strip_suffix(',').unwrap_or(text);
        if text.is_empty() {
            return Ok(Self::default());
        }

        let code = text
            .split(',')
            .enumerate()
            .map(|(index, token)| {
                let token = token.trim();
                token.parse::<i64>().map_err(|source| IntcodeError::Parse {
                    index,
                    token: token.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { code })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, value) in self.code.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

impl From<Vec<i64>> for Program {
    fn from(code: Vec<i64>) -> Self { Self::new(code) }
}

impl From<&[i64]> for Program {
    fn from(code: &[i64]) -> Self { Self::new(code.to_vec()) }
}
