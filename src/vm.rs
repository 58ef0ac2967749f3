//! Intcode Virtual Machine
//!
//! Fetch-decode-execute loop over a private, auto-growing memory image.
//! Two driving modes sit on top of [`Machine::step`]:
//!
//! - break-on-output: [`Machine::run_until_output`] hands control back right
//!   after every OUTPUT, the suspension point for pipelines.
//! - exit-predicate: [`Machine::run_until_exit`] polls [`Host::should_exit`]
//!   after every instruction.
//!
//! Faults (unknown opcode, bad mode, negative or out-of-range address) are
//! final. A faulted machine refuses every later step.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::{IntcodeError, Result};
use crate::io::{Host, Input};
use crate::memory::Memory;
use crate::opcodes::{Instruction, Opcode, ParamMode};
use crate::program::Program;

// ═══════════════════════════════════════════════════════════════
// TRACE EVENTS
// ═══════════════════════════════════════════════════════════════

/// Snapshot taken just before an instruction executes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEvent {
    pub step: u64,
    pub ip: usize,
    pub instruction: Instruction,
    pub relative_base: i64,
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modes = self.instruction.modes;
        write!(
            f,
            "[{}] ip={} {} [{},{},{}] rb={}",
            self.step,
            self.ip,
            self.instruction.mnemonic(),
            modes[0] as u8,
            modes[1] as u8,
            modes[2] as u8,
            self.relative_base
        )
    }
}

type TraceHook = Arc<dyn Fn(&TraceEvent) + Send + Sync>;

// ═══════════════════════════════════════════════════════════════
// STEP / EXIT
// ═══════════════════════════════════════════════════════════════

/// Outcome of a single instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Executed,
    Output(i64),
    /// INPUT found nothing and the machine has no idle input configured.
    /// The instruction pointer still points at the INPUT.
    NeedsInput,
    Halted,
}

/// Why a run handed control back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Halted,
    Output(i64),
    NeedsInput,
    /// The host's exit predicate returned true
    Requested,
}

// ═══════════════════════════════════════════════════════════════
// MACHINE
// ═══════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct Machine {
    memory: Memory,
    ip: usize,
    relative_base: i64,
    halted: bool,
    faulted: bool,
    steps: u64,
    step_limit: Option<u64>,
    idle_input: Option<i64>,
    trace_hooks: Vec<TraceHook>,
}

impl Machine {
    /// Load a private copy of `program`
    pub fn new(program: &Program) -> Self {
        Self {
            memory: Memory::new(program.as_slice().to_vec()),
            ip: 0,
            relative_base: 0,
            halted: false,
            faulted: false,
            steps: 0,
            step_limit: None,
            idle_input: None,
            trace_hooks: Vec::new(),
        }
    }

    /// Maximum instructions a single run call may execute. `None` is unbounded.
    pub fn set_step_limit(&mut self, limit: Option<u64>) {
        self.step_limit = limit;
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Value written when the host answers [`Input::NoInput`]. With `None` the
    /// machine suspends instead and retries the INPUT on the next run.
    pub fn set_idle_input(&mut self, value: Option<i64>) {
        self.idle_input = value;
    }

    pub fn with_idle_input(mut self, value: i64) -> Self {
        self.idle_input = Some(value);
        self
    }

    /// Cells memory may grow to. `None` lets a program grow it without bound.
    pub fn set_memory_limit(&mut self, limit: Option<usize>) {
        self.memory.set_limit(limit);
    }

    pub fn with_memory_limit(mut self, limit: usize) -> Self {
        self.memory.set_limit(Some(limit));
        self
    }

    pub fn add_trace_hook<F: Fn(&TraceEvent) + Send + Sync + 'static>(&mut self, hook: F) {
        self.trace_hooks.push(Arc::new(hook));
    }

    /// Reset registers and memory to a fresh copy of `program`.
    /// Settings (including the memory limit) and trace hooks are kept.
    pub fn reload(&mut self, program: &Program) {
        self.memory.reset(program.as_slice());
        self.ip = 0;
        self.relative_base = 0;
        self.halted = false;
        self.faulted = false;
        self.steps = 0;
    }

    pub fn is_halted(&self) -> bool { self.halted }
    pub fn is_faulted(&self) -> bool { self.faulted }
    pub fn ip(&self) -> usize { self.ip }
    pub fn relative_base(&self) -> i64 { self.relative_base }

    /// Instructions executed since load
    pub fn steps(&self) -> u64 { self.steps }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn peek(&self, addr: usize) -> i64 {
        self.memory.peek(addr)
    }

    /// Patch memory before or between runs
    pub fn poke(&mut self, addr: usize, value: i64) -> Result<()> {
        self.memory.write(addr, value)
    }

    // ── Driving loops ──

    /// Run until HALT, or until input runs dry on a machine without idle input.
    pub fn run<H: Host>(&mut self, host: &mut H) -> Result<Exit> {
        self.drive(host, false, false)
    }

    /// Run until the next OUTPUT has been handed to the host, or HALT.
    pub fn run_until_output<H: Host>(&mut self, host: &mut H) -> Result<Exit> {
        self.drive(host, true, false)
    }

    /// Run, polling the host's exit predicate after every instruction.
    pub fn run_until_exit<H: Host>(&mut self, host: &mut H) -> Result<Exit> {
        self.drive(host, false, true)
    }

    fn drive<H: Host>(&mut self, host: &mut H, break_on_output: bool, poll_exit: bool) -> Result<Exit> {
        let mut executed: u64 = 0;

        loop {
            if let Some(limit) = self.step_limit {
                if executed >= limit {
                    warn!(limit, ip = self.ip, "step limit exceeded");
                    return Err(IntcodeError::StepLimitExceeded { limit });
                }
            }

            match self.step(host)? {
                Step::Halted => return Ok(Exit::Halted),
                Step::NeedsInput => return Ok(Exit::NeedsInput),
                Step::Output(value) if break_on_output => return Ok(Exit::Output(value)),
                Step::Output(_) | Step::Executed => {}
            }
            executed += 1;

            if poll_exit && host.should_exit() {
                return Ok(Exit::Requested);
            }
        }
    }

    /// Execute exactly one instruction. Stepping a halted machine is a no-op.
    pub fn step<H: Host>(&mut self, host: &mut H) -> Result<Step> {
        if self.faulted {
            return Err(IntcodeError::Faulted);
        }
        if self.halted {
            return Ok(Step::Halted);
        }

        match self.execute(host) {
            Ok(step) => Ok(step),
            Err(err) => {
                warn!(ip = self.ip, error = %err, "machine faulted");
                self.faulted = true;
                self.halted = true;
                Err(err)
            }
        }
    }

    fn execute<H: Host>(&mut self, host: &mut H) -> Result<Step> {
        let ip = self.ip;
        let inst = Instruction::decode(self.memory.read(ip)?, ip)?;

        // An INPUT with nothing to read has not executed yet
        let input = match inst.opcode {
            Opcode::Input => match host.next_input() {
                Input::Value(value) => Some(value),
                Input::NoInput => match self.idle_input {
                    Some(value) => Some(value),
                    None => {
                        debug!(ip, "waiting for input");
                        return Ok(Step::NeedsInput);
                    }
                },
            },
            _ => None,
        };

        self.emit_trace(inst);
        self.steps += 1;

        match inst.opcode {
            Opcode::Add | Opcode::Mul | Opcode::LessThan | Opcode::Equals => {
                let a = self.read_param(&inst, 0)?;
                let b = self.read_param(&inst, 1)?;
                let value = match inst.opcode {
                    Opcode::Add => a.wrapping_add(b),
                    Opcode::Mul => a.wrapping_mul(b),
                    Opcode::LessThan => i64::from(a < b),
                    _ => i64::from(a == b),
                };
                let dst = self.write_address(&inst, 2)?;
                self.memory.write(dst, value)?;
            }
            Opcode::Input => {
                let dst = self.write_address(&inst, 0)?;
                if let Some(value) = input {
                    self.memory.write(dst, value)?;
                }
            }
            Opcode::Output => {
                let value = self.read_param(&inst, 0)?;
                host.emit_output(value);
                self.ip += inst.opcode.width();
                return Ok(Step::Output(value));
            }
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => {
                let cond = self.read_param(&inst, 0)?;
                let target = self.read_param(&inst, 1)?;
                if (cond != 0) == (inst.opcode == Opcode::JumpIfTrue) {
                    self.ip = self.to_address(target)?;
                    return Ok(Step::Executed);
                }
            }
            Opcode::AdjustBase => {
                let delta = self.read_param(&inst, 0)?;
                self.relative_base = self.relative_base.wrapping_add(delta);
            }
            Opcode::Halt => {
                debug!(ip, steps = self.steps, "halted");
                self.halted = true;
                return Ok(Step::Halted);
            }
        }

        self.ip += inst.opcode.width();
        Ok(Step::Executed)
    }

    // ── Operand resolution ──

    /// Resolve an absolute address, refusing negatives and anything past
    /// the memory limit.
    fn to_address(&self, raw: i64) -> Result<usize> {
        if raw < 0 {
            return Err(IntcodeError::NegativeAddress { address: raw, ip: self.ip });
        }
        let addr = usize::try_from(raw).map_err(|_| IntcodeError::AddressOutOfRange {
            address: raw,
            limit: self.memory.limit().unwrap_or(usize::MAX),
        })?;
        self.memory.check(addr)?;
        Ok(addr)
    }

    fn raw_param(&mut self, idx: usize) -> Result<i64> {
        self.memory.read(self.ip + 1 + idx)
    }

    fn read_param(&mut self, inst: &Instruction, idx: usize) -> Result<i64> {
        let raw = self.raw_param(idx)?;
        match inst.modes[idx] {
            ParamMode::Immediate => Ok(raw),
            ParamMode::Position => {
                let addr = self.to_address(raw)?;
                self.memory.read(addr)
            }
            ParamMode::Relative => {
                let addr = self.to_address(self.relative_base.wrapping_add(raw))?;
                self.memory.read(addr)
            }
        }
    }

    /// The parameter word itself is the target (or its relative offset);
    /// it is never dereferenced a second time.
    fn write_address(&mut self, inst: &Instruction, idx: usize) -> Result<usize> {
        let raw = self.raw_param(idx)?;
        match inst.modes[idx] {
            ParamMode::Position => self.to_address(raw),
            ParamMode::Relative => self.to_address(self.relative_base.wrapping_add(raw)),
            ParamMode::Immediate => Err(IntcodeError::ImmediateWrite { ip: self.ip }),
        }
    }

    fn emit_trace(&self, instruction: Instruction) {
        let event = TraceEvent {
            step: self.steps,
            ip: self.ip,
            instruction,
            relative_base: self.relative_base,
        };
        trace!(%event, "exec");
        for hook in &self.trace_hooks {
            hook(&event);
        }
    }
}

impl From<&Program> for Machine {
    fn from(program: &Program) -> Self { Self::new(program) }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("ip", &self.ip)
            .field("relative_base", &self.relative_base)
            .field("halted", &self.halted)
            .field("faulted", &self.faulted)
            .field("steps", &self.steps)
            .field("memory_len", &self.memory.len())
            .field("memory_limit", &self.memory.limit())
            .field("step_limit", &self.step_limit)
            .field("idle_input", &self.idle_input)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::io::{FnHost, QueueHost};

    fn machine(code: &[i64]) -> Machine {
        Machine::new(&Program::from(code))
    }

    fn run_with_inputs(code: &[i64], inputs: &[i64]) -> Vec<i64> {
        let mut vm = machine(code);
        let mut host = QueueHost::with_inputs(inputs.iter().copied());
        assert_eq!(vm.run(&mut host).unwrap(), Exit::Halted);
        host.take_outputs()
    }

    #[test]
    fn test_arithmetic_self_check() {
        let mut vm = machine(&[1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50]);
        let result = vm.run(&mut QueueHost::new()).unwrap();
        assert_eq!(result, Exit::Halted);
        assert!(vm.is_halted());
        assert_eq!(vm.peek(0), 3500);
        assert_eq!(vm.peek(3), 70);
        assert_eq!(vm.steps(), 3);
    }

    #[test]
    fn test_small_programs() {
        for (code, addr, expected) in [
            (vec![1, 0, 0, 0, 99], 0, 2),
            (vec![2, 3, 0, 3, 99], 3, 6),
            (vec![2, 4, 4, 5, 99, 0], 5, 9801),
            (vec![1, 1, 1, 4, 99, 5, 6, 0, 99], 0, 30),
        ] {
            let mut vm = machine(&code);
            vm.run(&mut QueueHost::new()).unwrap();
            assert_eq!(vm.peek(addr), expected, "program {:?}", code);
        }
    }

    #[test]
    fn test_quine() {
        let code = [109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99];
        assert_eq!(run_with_inputs(&code, &[]), code.to_vec());
    }

    #[test]
    fn test_large_multiply() {
        let out = run_with_inputs(&[1102, 34915192, 34915192, 7, 4, 7, 99, 0], &[]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to_string().len(), 16);
    }

    #[test]
    fn test_large_literal() {
        assert_eq!(run_with_inputs(&[104, 1125899906842624, 99], &[]), vec![1125899906842624]);
    }

    #[test]
    fn test_input_echo() {
        assert_eq!(run_with_inputs(&[3, 0, 4, 0, 99], &[-42]), vec![-42]);
    }

    #[test]
    fn test_compare_and_jump() {
        let eq8 = [3, 9, 8, 9, 10, 9, 4, 9, 99, -1, 8];
        assert_eq!(run_with_inputs(&eq8, &[8]), vec![1]);
        assert_eq!(run_with_inputs(&eq8, &[7]), vec![0]);

        let lt8_immediate = [3, 3, 1107, -1, 8, 3, 4, 3, 99];
        assert_eq!(run_with_inputs(&lt8_immediate, &[5]), vec![1]);
        assert_eq!(run_with_inputs(&lt8_immediate, &[9]), vec![0]);

        let jump_nonzero = [3, 12, 6, 12, 15, 1, 13, 14, 13, 4, 13, 99, -1, 0, 1, 9];
        assert_eq!(run_with_inputs(&jump_nonzero, &[0]), vec![0]);
        assert_eq!(run_with_inputs(&jump_nonzero, &[3]), vec![1]);

        let around8 = [
            3, 21, 1008, 21, 8, 20, 1005, 20, 22, 107, 8, 21, 20, 1006, 20, 31, 1106, 0, 36, 98, 0,
            0, 1002, 21, 125, 20, 4, 20, 1105, 1, 46, 104, 999, 1105, 1, 46, 1101, 1000, 1, 20, 4,
            20, 1105, 1, 46, 98, 99,
        ];
        assert_eq!(run_with_inputs(&around8, &[7]), vec![999]);
        assert_eq!(run_with_inputs(&around8, &[8]), vec![1000]);
        assert_eq!(run_with_inputs(&around8, &[9]), vec![1001]);
    }

    #[test]
    fn test_relative_base_persists() {
        let mut vm = machine(&[109, 2000, 109, 19, 204, -34, 99]);
        vm.poke(1985, 77).unwrap();
        let mut host = QueueHost::new();
        vm.run(&mut host).unwrap();
        assert_eq!(host.outputs(), &[77]);
        assert_eq!(vm.relative_base(), 2019);
    }

    #[test]
    fn test_position_write_is_not_dereferenced() {
        // ADD 5 + 6 -> [5]. The cell at 5 holds 0; a double dereference would hit [0].
        let mut vm = machine(&[1101, 5, 6, 5, 99, 0]);
        vm.run(&mut QueueHost::new()).unwrap();
        assert_eq!(vm.peek(5), 11);
        assert_eq!(vm.peek(0), 1101);
    }

    #[test]
    fn test_relative_write_is_not_dereferenced() {
        // rb = 10, ADD 2 + 3 -> [rb - 3] = [7], past the end of the image
        let mut vm = machine(&[109, 10, 21101, 2, 3, -3, 99]);
        vm.run(&mut QueueHost::new()).unwrap();
        assert_eq!(vm.peek(7), 5);
        assert_eq!(vm.memory().len(), 8);
        assert_eq!(vm.peek(5), -3);
    }

    #[test]
    fn test_relative_input_target() {
        let mut vm = machine(&[109, 6, 203, 1, 99, 0, 0, 0]);
        vm.run(&mut QueueHost::with_inputs([33])).unwrap();
        assert_eq!(vm.peek(7), 33);
    }

    #[test]
    fn test_immediate_write_faults() {
        let mut vm = machine(&[11101, 1, 1, 0, 99]);
        let err = vm.run(&mut QueueHost::new()).unwrap_err();
        assert!(matches!(err, IntcodeError::ImmediateWrite { ip: 0 }));
        assert!(vm.is_faulted());
    }

    #[test]
    fn test_negative_address_faults() {
        let mut vm = machine(&[1, -1, 0, 0, 99]);
        let err = vm.run(&mut QueueHost::new()).unwrap_err();
        assert!(matches!(err, IntcodeError::NegativeAddress { address: -1, ip: 0 }));

        let mut vm = machine(&[109, -5, 204, 0, 99]);
        let err = vm.run(&mut QueueHost::new()).unwrap_err();
        assert!(matches!(err, IntcodeError::NegativeAddress { address: -5, ip: 2 }));

        let mut vm = machine(&[1105, 1, -3]);
        assert!(matches!(
            vm.run(&mut QueueHost::new()),
            Err(IntcodeError::NegativeAddress { address: -3, .. })
        ));
    }

    #[test]
    fn test_huge_addresses_fault_without_growing() {
        const HUGE: i64 = 1 << 62;
        let limit = crate::memory::DEFAULT_MEMORY_LIMIT;

        // write target
        let mut vm = machine(&[1101, 1, 1, HUGE, 99]);
        let err = vm.run(&mut QueueHost::new()).unwrap_err();
        assert!(matches!(err, IntcodeError::AddressOutOfRange { address: HUGE, limit: l } if l == limit));
        assert!(vm.is_faulted());
        assert_eq!(vm.memory().len(), 5);

        // read operand
        let mut vm = machine(&[1, HUGE, 0, 0, 99]);
        assert!(matches!(
            vm.run(&mut QueueHost::new()),
            Err(IntcodeError::AddressOutOfRange { address: HUGE, .. })
        ));

        // jump target
        let mut vm = machine(&[1105, 1, i64::MAX]);
        assert!(matches!(
            vm.run(&mut QueueHost::new()),
            Err(IntcodeError::AddressOutOfRange { address: i64::MAX, .. })
        ));
        assert_eq!(vm.ip(), 0);
        assert!(matches!(vm.step(&mut QueueHost::new()), Err(IntcodeError::Faulted)));

        // relative input target
        let mut vm = machine(&[109, HUGE, 203, 0, 99]);
        assert!(matches!(
            vm.run(&mut QueueHost::with_inputs([1])),
            Err(IntcodeError::AddressOutOfRange { address: HUGE, .. })
        ));
    }

    #[test]
    fn test_memory_limit_is_tunable() {
        let code = [1101, 2, 3, 150, 99];

        let mut vm = machine(&code).with_memory_limit(100);
        assert!(matches!(
            vm.run(&mut QueueHost::new()),
            Err(IntcodeError::AddressOutOfRange { address: 150, limit: 100 })
        ));

        let mut vm = machine(&code).with_memory_limit(151);
        vm.run(&mut QueueHost::new()).unwrap();
        assert_eq!(vm.peek(150), 5);

        let mut vm = machine(&code);
        vm.set_memory_limit(Some(10));
        assert!(vm.poke(10, 1).is_err());
        vm.reload(&Program::from(&code[..]));
        assert!(vm.run(&mut QueueHost::new()).is_err());
        vm.set_memory_limit(None);
        vm.reload(&Program::from(&code[..]));
        assert_eq!(vm.run(&mut QueueHost::new()).unwrap(), Exit::Halted);
    }

    #[test]
    fn test_unknown_opcode_is_final() {
        let mut vm = machine(&[1101, 1, 1, 5, 42, 0]);
        let mut host = QueueHost::new();
        let err = vm.run(&mut host).unwrap_err();
        assert!(matches!(err, IntcodeError::UnknownOpcode { opcode: 42, ip: 4 }));
        assert!(matches!(vm.step(&mut host), Err(IntcodeError::Faulted)));
        assert!(matches!(vm.run(&mut host), Err(IntcodeError::Faulted)));
    }

    #[test]
    fn test_break_on_output() {
        let mut vm = machine(&[104, 1, 104, 2, 104, 3, 99]);
        let mut host = QueueHost::new();
        assert_eq!(vm.run_until_output(&mut host).unwrap(), Exit::Output(1));
        assert_eq!(vm.ip(), 2);
        assert_eq!(vm.run_until_output(&mut host).unwrap(), Exit::Output(2));
        assert_eq!(vm.run_until_output(&mut host).unwrap(), Exit::Output(3));
        assert_eq!(vm.run_until_output(&mut host).unwrap(), Exit::Halted);
        assert_eq!(vm.run_until_output(&mut host).unwrap(), Exit::Halted);
        assert_eq!(host.outputs(), &[1, 2, 3]);
    }

    #[test]
    fn test_exit_predicate_polled_every_step() {
        let mut vm = machine(&[1101, 0, 0, 20, 1101, 0, 0, 20, 1101, 0, 0, 20, 99]);
        let mut polls = 0;
        let mut host = FnHost::new(|| Input::NoInput, |_| {}).with_exit(|| {
            polls += 1;
            polls == 2
        });
        assert_eq!(vm.run_until_exit(&mut host).unwrap(), Exit::Requested);
        assert_eq!(vm.ip(), 8);
        assert_eq!(vm.run_until_exit(&mut host).unwrap(), Exit::Halted);
        drop(host);
        assert_eq!(polls, 3);
    }

    #[test]
    fn test_suspend_on_missing_input() {
        let mut vm = machine(&[3, 0, 4, 0, 99]);
        let mut host = QueueHost::new();
        assert_eq!(vm.run(&mut host).unwrap(), Exit::NeedsInput);
        assert_eq!(vm.ip(), 0);
        assert!(!vm.is_halted());
        assert_eq!(vm.steps(), 0);

        host.push_input(-1);
        assert_eq!(vm.run(&mut host).unwrap(), Exit::Halted);
        assert_eq!(host.outputs(), &[-1]);
    }

    #[test]
    fn test_waiting_for_input_is_not_a_step() {
        let traced = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&traced);
        let mut vm = machine(&[3, 0, 99]).with_step_limit(1);
        vm.add_trace_hook(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let mut host = QueueHost::new();
        for _ in 0..3 {
            assert_eq!(vm.run(&mut host).unwrap(), Exit::NeedsInput);
        }
        assert_eq!(vm.steps(), 0);
        assert_eq!(traced.load(Ordering::SeqCst), 0);

        // The retried INPUT is the first instruction charged against the budget
        host.push_input(7);
        assert!(matches!(vm.run(&mut host), Err(IntcodeError::StepLimitExceeded { limit: 1 })));
        assert_eq!(vm.steps(), 1);
        assert_eq!(vm.peek(0), 7);
        assert_eq!(traced.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_idle_input_value() {
        let mut vm = machine(&[3, 0, 4, 0, 99]).with_idle_input(-1);
        let mut host = QueueHost::new();
        assert_eq!(vm.run(&mut host).unwrap(), Exit::Halted);
        assert_eq!(host.outputs(), &[-1]);
    }

    #[test]
    fn test_step_limit() {
        let mut vm = machine(&[1105, 1, 0]).with_step_limit(100);
        let err = vm.run(&mut QueueHost::new()).unwrap_err();
        assert!(matches!(err, IntcodeError::StepLimitExceeded { limit: 100 }));
        assert!(!vm.is_faulted());
        assert_eq!(vm.steps(), 100);

        vm.set_step_limit(None);
        vm.set_step_limit(Some(5));
        assert!(vm.run(&mut QueueHost::new()).is_err());
        assert_eq!(vm.steps(), 105);
    }

    #[test]
    fn test_reload_and_clone() {
        let program = Program::new(vec![1, 0, 0, 0, 99]);
        let mut vm = Machine::new(&program);
        vm.poke(1, 4).unwrap();
        vm.poke(2, 4).unwrap();
        let snapshot = vm.clone();

        vm.run(&mut QueueHost::new()).unwrap();
        assert_eq!(vm.peek(0), 198);
        assert_eq!(snapshot.peek(0), 1);
        assert!(!snapshot.is_halted());

        vm.reload(&program);
        assert!(!vm.is_halted());
        assert_eq!(vm.steps(), 0);
        vm.run(&mut QueueHost::new()).unwrap();
        assert_eq!(vm.peek(0), 2);
        assert_eq!(program.as_slice(), &[1, 0, 0, 0, 99]);
    }

    #[test]
    fn test_trace_hooks() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let mut vm = machine(&[1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50]);
        vm.add_trace_hook(move |event| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                assert_eq!(event.ip, 0);
                assert_eq!(event.instruction.opcode, Opcode::Add);
            }
        });
        vm.run(&mut QueueHost::new()).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_trace_event_display() {
        let event = TraceEvent {
            step: 4,
            ip: 12,
            instruction: Instruction::decode(1002, 12).unwrap(),
            relative_base: -3,
        };
        assert_eq!(event.to_string(), "[4] ip=12 MUL [0,1,0] rb=-3");
    }
}
