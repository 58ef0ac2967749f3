//! Intcode I/O Boundary
//!
//! A machine talks to the outside world only through a [`Host`]: one call to
//! fetch the next input, one to hand over an output, and an optional exit
//! predicate polled after every instruction in exit-predicate runs.

use std::collections::VecDeque;

/// Answer to an INPUT request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    Value(i64),
    /// Nothing queued right now. What the machine does with this is decided
    /// by its idle-input setting, never by the value itself.
    NoInput,
}

impl From<Option<i64>> for Input {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Input::NoInput, Input::Value)
    }
}

impl From<i64> for Input {
    fn from(value: i64) -> Self { Input::Value(value) }
}

/// Host side of a running machine
pub trait Host {
    /// Called synchronously by INPUT. Must not block.
    fn next_input(&mut self) -> Input;

    /// Called by OUTPUT with the produced value.
    fn emit_output(&mut self, value: i64);

    /// Polled after every instruction by [`Machine::run_until_exit`].
    ///
    /// [`Machine::run_until_exit`]: crate::vm::Machine::run_until_exit
    fn should_exit(&mut self) -> bool {
        false
    }
}

impl<H: Host + ?Sized> Host for &mut H {
    fn next_input(&mut self) -> Input { (**self).next_input() }
    fn emit_output(&mut self, value: i64) { (**self).emit_output(value) }
    fn should_exit(&mut self) -> bool { (**self).should_exit() }
}

// ═══════════════════════════════════════════════════════════════
// QUEUE HOST
// ═══════════════════════════════════════════════════════════════

/// FIFO of pending inputs plus a log of every output
#[derive(Debug, Clone, Default)]
pub struct QueueHost {
    inputs: VecDeque<i64>,
    outputs: Vec<i64>,
}

impl QueueHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inputs(inputs: impl IntoIterator<Item = i64>) -> Self {
        Self { inputs: inputs.into_iter().collect(), outputs: Vec::new() }
    }

    pub fn push_input(&mut self, value: i64) {
        self.inputs.push_back(value);
    }

    /// Queue every byte of `text` as one input, e.g. a newline-terminated command.
    pub fn push_ascii(&mut self, text: &str) {
        self.inputs.extend(text.bytes().map(i64::from));
    }

    pub fn pending_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn outputs(&self) -> &[i64] {
        &self.outputs
    }

    pub fn take_outputs(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.outputs)
    }

    /// Outputs rendered as text. Values outside the ASCII range are skipped.
    pub fn ascii_output(&self) -> String {
        self.outputs
            .iter()
            .filter_map(|&v| u8::try_from(v).ok())
            .filter(u8::is_ascii)
            .map(char::from)
            .collect()
    }
}

impl Host for QueueHost {
    fn next_input(&mut self) -> Input {
        self.inputs.pop_front().into()
    }

    fn emit_output(&mut self, value: i64) {
        self.outputs.push(value);
    }
}

// ═══════════════════════════════════════════════════════════════
// CLOSURE HOST
// ═══════════════════════════════════════════════════════════════

fn never_exit() -> bool {
    false
}

/// Host assembled from plain callbacks
pub struct FnHost<I, O, E = fn() -> bool> {
    input: I,
    output: O,
    exit: E,
}

impl<I, O> FnHost<I, O>
where
    I: FnMut() -> Input,
    O: FnMut(i64),
{
    pub fn new(input: I, output: O) -> Self {
        Self { input, output, exit: never_exit }
    }
}

impl<I, O, E> FnHost<I, O, E> {
    /// Attach an exit predicate
    pub fn with_exit<F: FnMut() -> bool>(self, exit: F) -> FnHost<I, O, F> {
        FnHost { input: self.input, output: self.output, exit }
    }
}

impl<I, O, E> Host for FnHost<I, O, E>
where
    I: FnMut() -> Input,
    O: FnMut(i64),
    E: FnMut() -> bool,
{
    fn next_input(&mut self) -> Input { (self.input)() }
    fn emit_output(&mut self, value: i64) { (self.output)(value) }
    fn should_exit(&mut self) -> bool { (self.exit)() }
}
