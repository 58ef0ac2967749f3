//! Amplifier Chains
//!
//! N machines loaded from the same program, each fed a phase setting as its
//! first input. In series the signal passes through once; in feedback the
//! last stage's output loops back to the first until every stage halts.
//! Stage hand-off is break-on-output, so stage i+1 never sees a value
//! stage i has not produced yet.

use tracing::{debug, info};

use crate::error::{IntcodeError, Result};
use crate::io::QueueHost;
use crate::memory::DEFAULT_MEMORY_LIMIT;
use crate::program::Program;
use crate::vm::{Exit, Machine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmplifierConfig {
    /// Instruction budget for each break-on-output run of a stage
    pub max_steps_per_run: u64,
    /// Memory cells each stage may grow to
    pub memory_limit: usize,
}

impl AmplifierConfig {
    pub fn with_max_steps_per_run(mut self, steps: u64) -> Self {
        self.max_steps_per_run = steps;
        self
    }

    pub fn with_memory_limit(mut self, cells: usize) -> Self {
        self.memory_limit = cells;
        self
    }
}

impl Default for AmplifierConfig {
    fn default() -> Self {
        Self {
            max_steps_per_run: 1_000_000,
            memory_limit: DEFAULT_MEMORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Series,
    Feedback,
}

/// Highest signal found by a phase search and the order that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Best {
    pub signal: i64,
    pub phases: Vec<i64>,
}

// ═══════════════════════════════════════════════════════════════
// CHAIN
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct Stage {
    machine: Machine,
    inbox: QueueHost,
}

#[derive(Debug, Clone)]
pub struct AmplifierChain {
    stages: Vec<Stage>,
}

impl AmplifierChain {
    pub fn new(program: &Program, phases: &[i64], config: &AmplifierConfig) -> Self {
        let stages = phases
            .iter()
            .map(|&phase| Stage {
                machine: Machine::new(program)
                    .with_step_limit(config.max_steps_per_run)
                    .with_memory_limit(config.memory_limit),
                inbox: QueueHost::with_inputs([phase]),
            })
            .collect();
        Self { stages }
    }

    pub fn len(&self) -> usize { self.stages.len() }
    pub fn is_empty(&self) -> bool { self.stages.is_empty() }

    pub fn run(&mut self, topology: Topology, input: i64) -> Result<i64> {
        match topology {
            Topology::Series => self.run_series(input),
            Topology::Feedback => self.run_feedback(input),
        }
    }

    /// Pass `input` through every stage once; each stage's first output
    /// feeds the next.
    pub fn run_series(&mut self, input: i64) -> Result<i64> {
        let mut signal = input;
        for stage in &mut self.stages {
            stage.inbox.push_input(signal);
            match stage.machine.run_until_output(&mut stage.inbox)? {
                Exit::Output(value) => signal = value,
                _ => return Err(IntcodeError::NoOutput),
            }
        }
        if self.stages.is_empty() {
            return Err(IntcodeError::NoOutput);
        }
        Ok(signal)
    }

    /// Cycle through the ring until every stage has halted. Returns the last
    /// value the final stage produced.
    pub fn run_feedback(&mut self, input: i64) -> Result<i64> {
        let n = self.stages.len();
        if n == 0 {
            return Err(IntcodeError::NoOutput);
        }
        self.stages[0].inbox.push_input(input);

        let mut last = None;
        let mut idle_turns = 0;
        let mut idx = 0;

        while !self.stages.iter().all(|s| s.machine.is_halted()) {
            let exit = {
                let stage = &mut self.stages[idx];
                stage.machine.run_until_output(&mut stage.inbox)?
            };

            match exit {
                Exit::Output(value) => {
                    idle_turns = 0;
                    self.stages[(idx + 1) % n].inbox.push_input(value);
                    if idx == n - 1 {
                        last = Some(value);
                    }
                }
                Exit::Halted | Exit::NeedsInput | Exit::Requested => {
                    idle_turns += 1;
                    if idle_turns > n {
                        return Err(IntcodeError::Stalled);
                    }
                }
            }

            idx = (idx + 1) % n;
        }

        last.ok_or(IntcodeError::NoOutput)
    }
}

// ═══════════════════════════════════════════════════════════════
// PHASE SEARCH
// ═══════════════════════════════════════════════════════════════

/// Rearrange `values` into the next lexicographic permutation.
/// Returns false (and leaves them sorted ascending) after the last one.
pub fn next_permutation(values: &mut [i64]) -> bool {
    if values.len() < 2 {
        return false;
    }

    let mut i = values.len() - 1;
    while i > 0 && values[i - 1] >= values[i] {
        i -= 1;
    }
    if i == 0 {
        values.reverse();
        return false;
    }

    let mut j = values.len() - 1;
    while values[j] <= values[i - 1] {
        j -= 1;
    }
    values.swap(i - 1, j);
    values[i..].reverse();
    true
}

/// Every distinct ordering of a set, in lexicographic order
#[derive(Debug, Clone)]
pub struct Permutations {
    next: Option<Vec<i64>>,
}

impl Permutations {
    pub fn new(set: &[i64]) -> Self {
        let mut first = set.to_vec();
        first.sort_unstable();
        Self { next: Some(first) }
    }
}

impl Iterator for Permutations {
    type Item = Vec<i64>;

    fn next(&mut self) -> Option<Vec<i64>> {
        let current = self.next.take()?;
        let mut following = current.clone();
        if next_permutation(&mut following) {
            self.next = Some(following);
        }
        Some(current)
    }
}

/// Try every ordering of `phase_set` and keep the highest final signal.
pub fn max_signal(
    program: &Program,
    phase_set: &[i64],
    topology: Topology,
    config: &AmplifierConfig,
) -> Result<Best> {
    if phase_set.is_empty() {
        return Err(IntcodeError::NoPhaseSettings);
    }

    let mut best: Option<Best> = None;
    for phases in Permutations::new(phase_set) {
        let signal = AmplifierChain::new(program, &phases, config).run(topology, 0)?;
        debug!(?phases, signal, "phase order tried");
        if best.as_ref().map_or(true, |b| signal > b.signal) {
            best = Some(Best { signal, phases });
        }
    }

    let best = best.ok_or(IntcodeError::NoPhaseSettings)?;
    info!(?topology, signal = best.signal, phases = ?best.phases, "phase search complete");
    Ok(best)
}

pub fn max_series_signal(program: &Program, phase_set: &[i64], config: &AmplifierConfig) -> Result<Best> {
    max_signal(program, phase_set, Topology::Series, config)
}

pub fn max_feedback_signal(program: &Program, phase_set: &[i64], config: &AmplifierConfig) -> Result<Best> {
    max_signal(program, phase_set, Topology::Feedback, config)
}
