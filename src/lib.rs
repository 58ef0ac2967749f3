//! # Intcode
//!
//! **Stored-program integer virtual machine and its orchestrators**
//!
//! One parametrized [`Machine`] with auto-growing memory, relative-base
//! addressing and two cooperative run modes (break-on-output and
//! exit-predicate), plus two ways of wiring several machines together:
//! a feedback amplifier ring and a packet-switched network with an
//! idle-triggered collector.
//!
//! Everything runs on the caller's thread. Machines never block: input is
//! answered synchronously through the [`Host`] trait, with
//! [`Input::NoInput`] standing in for "nothing queued".
//!
//! ## Quick Start
//!
//! ```rust
//! use intcode::{Exit, Machine, Program, QueueHost};
//!
//! let program: Program = "3,0,1002,0,3,0,4,0,99".parse().unwrap();
//! let mut vm = Machine::new(&program);
//! let mut host = QueueHost::with_inputs([14]);
//!
//! assert_eq!(vm.run_until_output(&mut host).unwrap(), Exit::Output(42));
//! assert_eq!(vm.run_until_output(&mut host).unwrap(), Exit::Halted);
//! ```

pub mod amplifier;
pub mod error;
pub mod io;
pub mod memory;
pub mod network;
pub mod opcodes;
pub mod program;
pub mod vm;

pub use crate::amplifier::{AmplifierChain, AmplifierConfig, Best, Topology};
pub use crate::error::{IntcodeError, Result};
pub use crate::io::{FnHost, Host, Input, QueueHost};
pub use crate::network::{Envelope, Network, NetworkConfig, Packet};
pub use crate::program::Program;
pub use crate::vm::{Exit, Machine, Step, TraceEvent};
