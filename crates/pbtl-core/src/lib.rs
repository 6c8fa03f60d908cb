//! PBTL Core - runtime verification of past-based temporal logic
//!
//! This crate provides the engine for monitoring PBTL properties over
//! partial-order executions: formula parsing, DLNF normalization, vector
//! clocks, frontier-set maintenance and the three-valued monitoring loop.

pub mod ast;
pub mod clock;
pub mod dlnf;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod frontier;
pub mod lexer;
pub mod monitor;
pub mod parser;
pub mod trace;

pub use ast::Formula;
pub use clock::VectorClock;
pub use dlnf::{Disjunct, Dlnf, Literal};
pub use error::{PbtlError, PbtlResult, TraceWarning};
pub use evaluator::{CompiledDisjunct, Verdict};
pub use event::{Event, EventArena, EventId, ProcessSet, IOTA};
pub use frontier::{Frontier, FrontierSet};
pub use monitor::{EventReport, Monitor, MonitorConfig, MonitorOutcome};
pub use parser::parse_formula;
pub use trace::{parse_trace, read_trace_file, CausalityChecker, TraceEvent, TraceFile};

/// Cap on the number of disjuncts the DLNF transformer will produce.
pub const DEFAULT_MAX_DISJUNCTS: usize = 4096;
