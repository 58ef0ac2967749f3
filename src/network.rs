//! Packet-Switched Network
//!
//! M machines addressed `0..M`, each booted with its own address as first
//! input. Machines emit packets as three outputs (destination, X, Y). A
//! round gives every live computer one exit-predicate slice; packets sent
//! during the round are routed only once it ends, so nobody sees a packet
//! sent in the same round.
//!
//! Packets for the collector address go to a single overwritable slot. When
//! every receive queue is empty the network is idle and the slot's packet
//! wakes computer 0.

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, info, warn};

use crate::error::{IntcodeError, Result};
use crate::io::{Host, Input};
use crate::memory::DEFAULT_MEMORY_LIMIT;
use crate::program::Program;
use crate::vm::Machine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    pub computers: usize,
    /// Destination whose packets are held in the collector slot
    pub collector: i64,
    /// Written by INPUT when a receive queue is empty
    pub idle_input: i64,
    /// Instructions per computer per round, cut short when a packet completes
    pub steps_per_slice: u64,
    /// Rounds allowed before giving up
    pub max_rounds: u64,
    /// Memory cells each computer may grow to
    pub memory_limit: usize,
}

impl NetworkConfig {
    pub fn with_computers(mut self, computers: usize) -> Self {
        self.computers = computers;
        self
    }

    pub fn with_collector(mut self, collector: i64) -> Self {
        self.collector = collector;
        self
    }

    pub fn with_idle_input(mut self, value: i64) -> Self {
        self.idle_input = value;
        self
    }

    pub fn with_steps_per_slice(mut self, steps: u64) -> Self {
        self.steps_per_slice = steps;
        self
    }

    pub fn with_max_rounds(mut self, rounds: u64) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn with_memory_limit(mut self, cells: usize) -> Self {
        self.memory_limit = cells;
        self
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            computers: 50,
            collector: 255,
            idle_input: -1,
            steps_per_slice: 1,
            max_rounds: 10_000_000,
            memory_limit: DEFAULT_MEMORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Packet {
    pub x: i64,
    pub y: i64,
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A packet leaving a computer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    pub source: usize,
    pub destination: i64,
    pub packet: Packet,
}

// ═══════════════════════════════════════════════════════════════
// COMPUTER
// ═══════════════════════════════════════════════════════════════

/// Network interface: receive queue, partial outbound packet, slice counter
#[derive(Debug, Clone)]
struct Nic {
    inbox: VecDeque<i64>,
    outbox: Vec<i64>,
    sent: Option<(i64, Packet)>,
    slice_steps: u64,
    steps_per_slice: u64,
}

impl Host for Nic {
    fn next_input(&mut self) -> Input {
        self.inbox.pop_front().into()
    }

    fn emit_output(&mut self, value: i64) {
        self.outbox.push(value);
        if let [destination, x, y] = self.outbox[..] {
            self.sent = Some((destination, Packet { x, y }));
            self.outbox.clear();
        }
    }

    fn should_exit(&mut self) -> bool {
        self.slice_steps += 1;
        self.sent.is_some() || self.slice_steps >= self.steps_per_slice
    }
}

#[derive(Debug, Clone)]
struct Computer {
    address: usize,
    machine: Machine,
    nic: Nic,
}

impl Computer {
    /// Run one slice. Returns the packet completed during it, if any.
    fn run_slice(&mut self) -> Result<Option<Envelope>> {
        if self.machine.is_halted() {
            return Ok(None);
        }

        self.nic.slice_steps = 0;
        self.machine.run_until_exit(&mut self.nic)?;

        Ok(self.nic.sent.take().map(|(destination, packet)| Envelope {
            source: self.address,
            destination,
            packet,
        }))
    }
}

// ═══════════════════════════════════════════════════════════════
// NETWORK
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Network {
    computers: Vec<Computer>,
    config: NetworkConfig,
    collected: Option<Packet>,
    first_collected: Option<Packet>,
    last_wakeup: Option<Packet>,
    wakeups: u64,
    rounds: u64,
}

impl Network {
    pub fn new(program: &Program, config: NetworkConfig) -> Self {
        let computers = (0..config.computers)
            .map(|address| Computer {
                address,
                machine: Machine::new(program)
                    .with_idle_input(config.idle_input)
                    .with_memory_limit(config.memory_limit),
                nic: Nic {
                    inbox: VecDeque::from([address as i64]),
                    outbox: Vec::with_capacity(3),
                    sent: None,
                    slice_steps: 0,
                    steps_per_slice: config.steps_per_slice.max(1),
                },
            })
            .collect();

        Self {
            computers,
            config,
            collected: None,
            first_collected: None,
            last_wakeup: None,
            wakeups: 0,
            rounds: 0,
        }
    }

    pub fn config(&self) -> &NetworkConfig { &self.config }
    pub fn len(&self) -> usize { self.computers.len() }
    pub fn is_empty(&self) -> bool { self.computers.is_empty() }
    pub fn rounds(&self) -> u64 { self.rounds }
    pub fn wakeups(&self) -> u64 { self.wakeups }

    /// Packet currently held in the collector slot
    pub fn collected(&self) -> Option<Packet> { self.collected }

    /// First packet ever sent to the collector
    pub fn first_collected(&self) -> Option<Packet> { self.first_collected }

    /// Packet most recently used to wake computer 0
    pub fn last_wakeup(&self) -> Option<Packet> { self.last_wakeup }

    /// Values waiting in a computer's receive queue
    pub fn pending(&self, address: usize) -> Option<usize> {
        self.computers.get(address).map(|c| c.nic.inbox.len())
    }

    /// Idle means every receive queue is empty.
    pub fn is_idle(&self) -> bool {
        self.computers.iter().all(|c| c.nic.inbox.is_empty())
    }

    /// Route a packet as if some computer had sent it.
    pub fn send(&mut self, envelope: Envelope) -> Result<()> {
        let Envelope { source, destination, packet } = envelope;

        if destination == self.config.collector {
            debug!(source, %packet, "packet collected");
            self.first_collected.get_or_insert(packet);
            self.collected = Some(packet);
            return Ok(());
        }

        let target = usize::try_from(destination)
            .ok()
            .and_then(|idx| self.computers.get_mut(idx))
            .ok_or(IntcodeError::UnknownDestination { destination, source_address: source })?;

        debug!(source, destination, %packet, "packet routed");
        target.nic.inbox.push_back(packet.x);
        target.nic.inbox.push_back(packet.y);
        Ok(())
    }

    /// Give every computer one slice, then route what they sent.
    pub fn round(&mut self) -> Result<()> {
        let mut outgoing = Vec::new();
        for computer in &mut self.computers {
            if let Some(envelope) = computer.run_slice()? {
                outgoing.push(envelope);
            }
        }

        for envelope in outgoing {
            self.send(envelope)?;
        }

        self.rounds += 1;
        Ok(())
    }

    /// If idle and the collector slot is full, empty the slot into
    /// computer 0's receive queue and return the packet delivered.
    pub fn wake_if_idle(&mut self) -> Option<Packet> {
        if !self.is_idle() {
            return None;
        }

        let packet = self.collected.take()?;
        if let Some(first) = self.computers.first_mut() {
            first.nic.inbox.push_back(packet.x);
            first.nic.inbox.push_back(packet.y);
        }
        self.wakeups += 1;
        debug!(%packet, round = self.rounds, "network idle, waking computer 0");
        Some(packet)
    }

    fn check_budget(&self) -> Result<()> {
        if self.rounds >= self.config.max_rounds {
            warn!(limit = self.config.max_rounds, "round limit exceeded");
            return Err(IntcodeError::RoundLimitExceeded { limit: self.config.max_rounds });
        }
        Ok(())
    }

    /// Run until some computer sends a packet to the collector.
    pub fn run_until_first_collected(&mut self) -> Result<Packet> {
        loop {
            if let Some(packet) = self.first_collected {
                info!(%packet, rounds = self.rounds, "first packet collected");
                return Ok(packet);
            }
            self.check_budget()?;
            self.round()?;
        }
    }

    /// Run until two consecutive idle wake-ups carry the same Y, and return it.
    pub fn run_until_repeated_wakeup(&mut self) -> Result<i64> {
        loop {
            self.check_budget()?;
            self.round()?;

            if let Some(packet) = self.wake_if_idle() {
                let repeated = self.last_wakeup.map(|p| p.y) == Some(packet.y);
                self.last_wakeup = Some(packet);
                if repeated {
                    info!(y = packet.y, rounds = self.rounds, "network reached steady state");
                    return Ok(packet.y);
                }
            }
        }
    }
}
