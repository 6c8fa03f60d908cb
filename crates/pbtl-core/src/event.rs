//! Events, process identities and the event arena
//!
//! Events are shared immutable records held in an append-only arena;
//! frontiers refer to them by index. Index 0 is always the iota sentinel
//! standing for the initial state of every process.

use crate::clock::VectorClock;
use std::collections::{HashMap, HashSet};

/// Proposition reserved for the initial per-process sentinel state.
pub const IOTA: &str = "iota";

/// Index into the event arena.
pub type EventId = usize;

/// Arena index of the shared iota sentinel.
pub const IOTA_EVENT: EventId = 0;

/// The fixed set of process identifiers, with insertion order preserved
/// for deterministic printing.
#[derive(Debug, Clone, Default)]
pub struct ProcessSet {
    names: Vec<String>,
    index: HashMap<String, usize>,
    declared: bool,
}

impl ProcessSet {
    /// A set fixed up front by the trace's `system_processes` directive.
    pub fn new_declared() -> Self {
        Self {
            names: Vec::new(),
            index: HashMap::new(),
            declared: true,
        }
    }

    /// A set inferred from the union of processes observed in events.
    pub fn new_inferred() -> Self {
        Self {
            names: Vec::new(),
            index: HashMap::new(),
            declared: false,
        }
    }

    /// Add a new process; `None` if the name is already present.
    pub fn add(&mut self, name: &str) -> Option<usize> {
        if self.index.contains_key(name) {
            return None;
        }
        let idx = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        Some(idx)
    }

    /// Look up a process, inserting it when the set is being inferred.
    pub fn intern(&mut self, name: &str) -> Option<usize> {
        match self.index.get(name) {
            Some(&idx) => Some(idx),
            None if self.declared => None,
            None => self.add(name),
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn name(&self, idx: usize) -> &str {
        &self.names[idx]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn is_declared(&self) -> bool {
        self.declared
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Render a clock as `P:1;Q:2` in insertion order.
    pub fn render_clock(&self, clock: &VectorClock) -> String {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| format!("{}:{}", name, clock.get(idx)))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// An immutable trace event after resolution against the process set
#[derive(Debug, Clone)]
pub struct Event {
    pub eid: String,
    /// Sorted indices of the participating processes; length one means an
    /// internal event, two or more a rendezvous.
    pub participants: Vec<usize>,
    /// Clock after the event, covering every declared process.
    pub vc: VectorClock,
    /// Propositions holding immediately after the event.
    pub props: HashSet<String>,
}

impl Event {
    pub fn is_participant(&self, process: usize) -> bool {
        self.participants.binary_search(&process).is_ok()
    }
}

/// Append-only store of events, seeded with the iota sentinel.
#[derive(Debug)]
pub struct EventArena {
    events: Vec<Event>,
}

impl EventArena {
    pub fn new(processes: usize) -> Self {
        let sentinel = Event {
            eid: IOTA.to_string(),
            participants: (0..processes).collect(),
            vc: VectorClock::zero(processes),
            props: std::iter::once(IOTA.to_string()).collect(),
        };
        Self {
            events: vec![sentinel],
        }
    }

    pub fn push(&mut self, event: Event) -> EventId {
        self.events.push(event);
        self.events.len() - 1
    }

    pub fn get(&self, id: EventId) -> &Event {
        &self.events[id]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
