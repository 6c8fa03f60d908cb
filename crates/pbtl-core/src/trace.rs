//! CSV trace ingestion and clock-discipline validation
//!
//! A trace file carries an optional `# system_processes:` directive fixing
//! the process set, a mandatory `eid,processes,vc,props` header row, and
//! one event per data row. All format errors carry the 1-based line number
//! of the offending row.

use crate::clock::VectorClock;
use crate::error::{PbtlError, PbtlResult, TraceWarning};
use crate::event::{Event, ProcessSet, IOTA};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const DIRECTIVE: &str = "system_processes:";
const HEADER_ROW: &str = "eid,processes,vc,props";

/// A trace event as read from the CSV, prior to arena insertion.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    pub event: Event,
    pub line: usize,
}

/// A fully parsed trace file.
#[derive(Debug)]
pub struct TraceFile {
    pub processes: ProcessSet,
    pub events: Vec<TraceEvent>,
    pub warnings: Vec<TraceWarning>,
}

pub fn read_trace_file(path: &Path) -> PbtlResult<TraceFile> {
    let source = fs::read_to_string(path)?;
    parse_trace(&source)
}

struct RawRow {
    line: usize,
    eid: String,
    participants: Vec<usize>,
    clock_entries: Vec<(usize, u64)>,
    props: HashSet<String>,
}

pub fn parse_trace(source: &str) -> PbtlResult<TraceFile> {
    let mut processes: Option<ProcessSet> = None;
    let mut header_seen = false;
    let mut seen_eids: HashSet<String> = HashSet::new();
    let mut rows: Vec<RawRow> = Vec::new();

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            if let Some(names) = comment.trim_start().strip_prefix(DIRECTIVE) {
                if header_seen {
                    return Err(PbtlError::trace_format(
                        line_no,
                        "system_processes directive must precede the header row",
                    ));
                }
                if processes.is_some() {
                    return Err(PbtlError::trace_format(
                        line_no,
                        "duplicate system_processes directive",
                    ));
                }
                processes = Some(parse_directive(names, line_no)?);
            }
            continue;
        }
        if !header_seen {
            if line != HEADER_ROW {
                return Err(PbtlError::trace_format(
                    line_no,
                    format!("expected header row '{}'", HEADER_ROW),
                ));
            }
            header_seen = true;
            continue;
        }
        let set = processes.get_or_insert_with(ProcessSet::new_inferred);
        rows.push(parse_row(line, line_no, set, &mut seen_eids)?);
    }

    if !header_seen {
        return Err(PbtlError::trace_format(
            source.lines().count() + 1,
            format!("missing header row '{}'", HEADER_ROW),
        ));
    }

    let mut warnings = Vec::new();
    let processes = match processes {
        Some(set) => {
            if !set.is_declared() {
                warnings.push(TraceWarning::new(
                    "system_processes directive missing; process set inferred from events",
                ));
            }
            set
        }
        None => ProcessSet::new_inferred(),
    };

    let events = resolve_rows(rows, &processes)?;
    Ok(TraceFile {
        processes,
        events,
        warnings,
    })
}

fn parse_directive(names: &str, line_no: usize) -> PbtlResult<ProcessSet> {
    let mut set = ProcessSet::new_declared();
    for name in names.split('|') {
        let name = name.trim();
        if name.is_empty() {
            return Err(PbtlError::trace_format(
                line_no,
                "empty process name in system_processes directive",
            ));
        }
        if set.add(name).is_none() {
            return Err(PbtlError::trace_format(
                line_no,
                format!("duplicate process '{}' in system_processes directive", name),
            ));
        }
    }
    Ok(set)
}

fn parse_row(
    line: &str,
    line_no: usize,
    processes: &mut ProcessSet,
    seen_eids: &mut HashSet<String>,
) -> PbtlResult<RawRow> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(PbtlError::trace_format(
            line_no,
            format!("expected 4 comma-separated fields, found {}", fields.len()),
        ));
    }

    let eid = fields[0];
    if eid.is_empty() {
        return Err(PbtlError::trace_format(line_no, "empty event id"));
    }
    if !seen_eids.insert(eid.to_string()) {
        return Err(PbtlError::trace_format(
            line_no,
            format!("duplicate event id '{}'", eid),
        ));
    }

    let mut participants = Vec::new();
    for name in fields[1].split('|') {
        let name = name.trim();
        if name.is_empty() {
            return Err(PbtlError::trace_format(line_no, "empty process name"));
        }
        let idx = processes.intern(name).ok_or_else(|| {
            PbtlError::trace_format(line_no, format!("unknown process '{}'", name))
        })?;
        if participants.contains(&idx) {
            return Err(PbtlError::trace_format(
                line_no,
                format!("duplicate participant '{}'", name),
            ));
        }
        participants.push(idx);
    }
    participants.sort_unstable();

    let mut clock_entries = Vec::new();
    let mut clock_processes = HashSet::new();
    for entry in fields[2].split(';') {
        let entry = entry.trim();
        let (name, stamp) = entry.split_once(':').ok_or_else(|| {
            PbtlError::trace_format(line_no, format!("invalid vector clock entry '{}'", entry))
        })?;
        let name = name.trim();
        let idx = processes.intern(name).ok_or_else(|| {
            PbtlError::trace_format(
                line_no,
                format!("unknown process '{}' in vector clock", name),
            )
        })?;
        if !clock_processes.insert(idx) {
            return Err(PbtlError::trace_format(
                line_no,
                format!("duplicate vector clock entry for '{}'", name),
            ));
        }
        let stamp: u64 = stamp.trim().parse().map_err(|_| {
            PbtlError::trace_format(
                line_no,
                format!("non-numeric timestamp '{}' for process '{}'", stamp.trim(), name),
            )
        })?;
        clock_entries.push((idx, stamp));
    }

    let mut props = HashSet::new();
    if !fields[3].is_empty() {
        for prop in fields[3].split('|') {
            let prop = prop.trim();
            if prop.is_empty() {
                return Err(PbtlError::trace_format(line_no, "empty proposition label"));
            }
            if prop == IOTA {
                return Err(PbtlError::trace_format(
                    line_no,
                    "proposition 'iota' is reserved for the initial sentinel",
                ));
            }
            props.insert(prop.to_string());
        }
    }

    Ok(RawRow {
        line: line_no,
        eid: eid.to_string(),
        participants,
        clock_entries,
        props,
    })
}

// Second pass: the process set is complete, so clocks can be densified and
// checked for coverage of every declared process.
fn resolve_rows(rows: Vec<RawRow>, processes: &ProcessSet) -> PbtlResult<Vec<TraceEvent>> {
    let count = processes.len();
    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let mut vc = VectorClock::zero(count);
        let mut covered = vec![false; count];
        for (idx, stamp) in row.clock_entries {
            vc.set(idx, stamp);
            covered[idx] = true;
        }
        if let Some(missing) = covered.iter().position(|seen| !seen) {
            return Err(PbtlError::trace_format(
                row.line,
                format!(
                    "missing vector clock entry for process '{}'",
                    processes.name(missing)
                ),
            ));
        }
        events.push(TraceEvent {
            event: Event {
                eid: row.eid,
                participants: row.participants,
                vc,
                props: row.props,
            },
            line: row.line,
        });
    }
    Ok(events)
}

/// Validates the clock discipline of a delivered event stream: a
/// participant's component strictly increases, a non-participant's never
/// exceeds the running join of everything seen so far.
#[derive(Debug)]
pub struct CausalityChecker {
    seen: VectorClock,
}

impl CausalityChecker {
    pub fn new(processes: usize) -> Self {
        Self {
            seen: VectorClock::zero(processes),
        }
    }

    pub fn check(&mut self, event: &Event, processes: &ProcessSet) -> PbtlResult<()> {
        for &p in &event.participants {
            if event.vc.get(p) <= self.seen.get(p) {
                return Err(PbtlError::causality(
                    event.eid.as_str(),
                    format!(
                        "clock for participant {} did not advance ({} <= {})",
                        processes.name(p),
                        event.vc.get(p),
                        self.seen.get(p)
                    ),
                ));
            }
        }
        for q in 0..self.seen.len() {
            if !event.is_participant(q) && event.vc.get(q) > self.seen.get(q) {
                return Err(PbtlError::causality(
                    event.eid.as_str(),
                    format!(
                        "clock for non-participant {} advanced ({} > {})",
                        processes.name(q),
                        event.vc.get(q),
                        self.seen.get(q)
                    ),
                ));
            }
        }
        self.seen.join(&event.vc);
        Ok(())
    }
}
