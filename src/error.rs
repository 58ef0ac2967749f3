//! Intcode Errors
//!
//! Every fault the engine or an orchestrator can raise. Execution is
//! deterministic, so none of these are transient: a returned error means
//! the program, the host or the orchestrator setup is wrong.

use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

/// Crate result type
pub type Result<T> = std::result::Result<T, IntcodeError>;

#[derive(Debug, Error)]
pub enum IntcodeError {
    #[error("unknown opcode {opcode} at ip={ip}")]
    UnknownOpcode { opcode: i64, ip: usize },

    #[error("invalid parameter mode {mode} at ip={ip}")]
    InvalidMode { mode: i64, ip: usize },

    #[error("write operand in immediate mode at ip={ip}")]
    ImmediateWrite { ip: usize },

    #[error("negative address {address} resolved at ip={ip}")]
    NegativeAddress { address: i64, ip: usize },

    #[error("address {address} is beyond the memory limit of {limit} cells")]
    AddressOutOfRange { address: i64, limit: usize },

    #[error("step limit of {limit} instructions exceeded")]
    StepLimitExceeded { limit: u64 },

    #[error("machine faulted and cannot resume")]
    Faulted,

    #[error("invalid integer {token:?} at position {index}")]
    Parse {
        index: usize,
        token: String,
        #[source]
        source: ParseIntError,
    },

    #[error("failed to read program from {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no phase settings to search")]
    NoPhaseSettings,

    #[error("amplifier chain produced no output")]
    NoOutput,

    #[error("every amplifier is waiting for input")]
    Stalled,

    #[error("packet from {source_address} addressed to unknown computer {destination}")]
    UnknownDestination { destination: i64, source_address: usize },

    #[error("network did not settle within {limit} rounds")]
    RoundLimitExceeded { limit: u64 },
}
