//! Intcode Memory
//!
//! Flat array of signed 64-bit cells. Touching an address past the end grows
//! the array up to it with zero fill; it never shrinks. Growth stops at a
//! configurable limit so a stray address cannot exhaust the host.

use crate::error::{IntcodeError, Result};

/// Cells a machine may grow to unless told otherwise (128 MiB of `i64`)
pub const DEFAULT_MEMORY_LIMIT: usize = 1 << 24;

/// Machine memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<i64>,
    limit: Option<usize>,
}

impl Memory {
    pub fn new(cells: Vec<i64>) -> Self {
        Self { cells, limit: Some(DEFAULT_MEMORY_LIMIT) }
    }

    /// Highest cell count growth may reach. `None` is unbounded.
    pub fn limit(&self) -> Option<usize> { self.limit }

    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    /// Fails if touching `addr` would grow memory past the limit.
    /// Addresses inside the current image are always valid.
    pub fn check(&self, addr: usize) -> Result<()> {
        match self.limit {
            Some(limit) if addr >= limit && addr >= self.cells.len() => {
                Err(IntcodeError::AddressOutOfRange {
                    address: i64::try_from(addr).unwrap_or(i64::MAX),
                    limit,
                })
            }
            _ => Ok(()),
        }
    }

    fn grow_to(&mut self, addr: usize) -> Result<()> {
        if addr >= self.cells.len() {
            self.check(addr)?;
            self.cells.resize(addr + 1, 0);
        }
        Ok(())
    }

    /// Read a cell, growing memory if `addr` is past the end.
    pub fn read(&mut self, addr: usize) -> Result<i64> {
        self.grow_to(addr)?;
        Ok(self.cells[addr])
    }

    /// Write a cell, growing memory if `addr` is past the end.
    pub fn write(&mut self, addr: usize, value: i64) -> Result<()> {
        self.grow_to(addr)?;
        self.cells[addr] = value;
        Ok(())
    }

    /// Read without growing. Addresses past the end read as 0.
    pub fn peek(&self, addr: usize) -> i64 {
        self.cells.get(addr).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize { self.cells.len() }
    pub fn is_empty(&self) -> bool { self.cells.is_empty() }

    pub fn as_slice(&self) -> &[i64] {
        &self.cells
    }

    /// Replace the whole contents with a fresh image. The limit is kept.
    pub fn reset(&mut self, image: &[i64]) {
        self.cells.clear();
        self.cells.extend_from_slice(image);
    }
}

impl Default for Memory {
    fn default() -> Self { Self::new(Vec::new()) }
}

impl From<Vec<i64>> for Memory {
    fn from(cells: Vec<i64>) -> Self { Self::new(cells) }
}
