//! Top-level monitoring loop
//!
//! Consumes the ordered event stream, updates the frontier store and
//! re-evaluates the DLNF disjuncts after every event. Conclusive states
//! latch: a disjunct without N-literals that has been TRUE stays TRUE, and
//! FALSE is always permanent. A disjunct carrying N-literals remains
//! falsifiable by extension, so its TRUE state is recomputed each event.

use crate::dlnf::Dlnf;
use crate::error::{PbtlResult, TraceWarning};
use crate::evaluator::{CompiledDisjunct, Verdict};
use crate::event::{EventArena, ProcessSet};
use crate::frontier::FrontierSet;
use crate::trace::{CausalityChecker, TraceEvent};
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    /// Stop consuming events once the overall verdict is conclusive.
    pub stop_on_verdict: bool,
    /// Attach frontier-set summaries to every event report.
    pub verbose: bool,
    /// Attach per-disjunct states to every event report.
    pub debug: bool,
    /// Downgrade causality violations to warnings.
    pub lenient: bool,
}

/// Structured record of one absorbed event.
#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub eid: String,
    pub participants: Vec<String>,
    pub clock: String,
    pub frontier_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontiers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disjunct_states: Option<Vec<String>>,
    pub verdict: Verdict,
}

/// Result of a complete monitoring run.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorOutcome {
    pub final_verdict: Verdict,
    pub events_processed: usize,
    pub stopped_early: bool,
}

pub struct Monitor {
    processes: ProcessSet,
    arena: EventArena,
    frontiers: FrontierSet,
    disjuncts: Vec<CompiledDisjunct>,
    states: Vec<Verdict>,
    checker: CausalityChecker,
    warnings: Vec<TraceWarning>,
    config: MonitorConfig,
    events_processed: usize,
}

impl Monitor {
    pub fn new(dlnf: &Dlnf, processes: ProcessSet, config: MonitorConfig) -> Self {
        let count = processes.len();
        let arena = EventArena::new(count);
        let frontiers = FrontierSet::new(&arena, count);
        let disjuncts: Vec<CompiledDisjunct> = dlnf
            .disjuncts
            .iter()
            .map(CompiledDisjunct::compile)
            .collect();
        let states = vec![Verdict::Inconclusive; disjuncts.len()];
        Self {
            checker: CausalityChecker::new(count),
            processes,
            arena,
            frontiers,
            disjuncts,
            states,
            warnings: Vec::new(),
            config,
            events_processed: 0,
        }
    }

    /// Overall verdict from the current per-disjunct states.
    pub fn verdict(&self) -> Verdict {
        self.states
            .iter()
            .copied()
            .reduce(Verdict::join)
            .unwrap_or(Verdict::False)
    }

    pub fn warnings(&self) -> &[TraceWarning] {
        &self.warnings
    }

    pub fn frontier_summary(&self) -> String {
        self.frontiers.render(&self.arena)
    }

    pub fn disjunct_summary(&self) -> Vec<String> {
        self.disjuncts
            .iter()
            .zip(&self.states)
            .map(|(disjunct, state)| format!("{}: {}", disjunct.profile(), state))
            .collect()
    }

    /// Absorb one event and re-evaluate every disjunct against the updated
    /// frontier set.
    pub fn process_event(&mut self, traced: TraceEvent) -> PbtlResult<EventReport> {
        let TraceEvent { event, line } = traced;
        let mut violated = false;
        if let Err(violation) = self.checker.check(&event, &self.processes) {
            if self.config.lenient {
                self.warnings
                    .push(TraceWarning::new(violation.to_string()).with_line(line));
                violated = true;
            } else {
                return Err(violation);
            }
        }

        let id = self.arena.push(event);
        match self.frontiers.absorb(&self.arena, id) {
            Ok(()) => {}
            Err(err) if violated => {
                // the event was already reported as a violation; without a
                // ready frontier there is nothing further to update
                self.warnings.push(
                    TraceWarning::new(format!("event not absorbed: {}", err)).with_line(line),
                );
            }
            Err(err) => return Err(err),
        }

        for (state, disjunct) in self.states.iter_mut().zip(&self.disjuncts) {
            let latched = *state == Verdict::False
                || (*state == Verdict::True && !disjunct.has_forbidden_past());
            if !latched {
                *state = disjunct.evaluate(&self.frontiers);
            }
        }
        self.events_processed += 1;

        let event = self.arena.get(id);
        Ok(EventReport {
            eid: event.eid.clone(),
            participants: event
                .participants
                .iter()
                .map(|&p| self.processes.name(p).to_string())
                .collect(),
            clock: self.processes.render_clock(&event.vc),
            frontier_count: self.frontiers.len(),
            frontiers: self
                .config
                .verbose
                .then(|| self.frontiers.render(&self.arena)),
            disjunct_states: self.config.debug.then(|| self.disjunct_summary()),
            verdict: self.verdict(),
        })
    }

    /// Drive the monitor over a whole event stream.
    pub fn run(
        &mut self,
        events: impl IntoIterator<Item = TraceEvent>,
    ) -> PbtlResult<(MonitorOutcome, Vec<EventReport>)> {
        let mut reports = Vec::new();
        let mut stopped_early = false;
        for traced in events {
            let report = self.process_event(traced)?;
            let verdict = report.verdict;
            reports.push(report);
            if self.config.stop_on_verdict && verdict.is_conclusive() {
                stopped_early = true;
                break;
            }
        }
        let outcome = MonitorOutcome {
            final_verdict: self.verdict(),
            events_processed: self.events_processed,
            stopped_early,
        };
        Ok((outcome, reports))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dlnf::Dlnf;
    use crate::parser::parse_formula;
    use crate::trace::parse_trace;

    fn monitor_for(property: &str, trace_source: &str, config: MonitorConfig) -> (Monitor, Vec<TraceEvent>) {
        let formula = parse_formula(property).unwrap();
        let dlnf = Dlnf::transform(&formula).unwrap();
        let trace = parse_trace(trace_source).unwrap();
        (Monitor::new(&dlnf, trace.processes, config), trace.events)
    }

    const SIMPLE: &str = "\
# system_processes: W
eid,processes,vc,props
e1,W,W:1,good
e2,W,W:2,bad
";

    #[test]
    fn test_verdict_of_empty_disjunction_is_false() {
        let (monitor, _) = monitor_for("FALSE", SIMPLE, MonitorConfig::default());
        assert_eq!(monitor.verdict(), Verdict::False);
    }

    #[test]
    fn test_trivially_true_property() {
        let (mut monitor, events) = monitor_for("TRUE", SIMPLE, MonitorConfig::default());
        let (outcome, _) = monitor.run(events).unwrap();
        assert_eq!(outcome.final_verdict, Verdict::True);
    }

    #[test]
    fn test_per_event_reports() {
        let (mut monitor, events) = monitor_for(
            "EP(bad)",
            SIMPLE,
            MonitorConfig {
                verbose: true,
                debug: true,
                ..Default::default()
            },
        );
        let (outcome, reports) = monitor.run(events).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].eid, "e1");
        assert_eq!(reports[0].clock, "W:1");
        assert_eq!(reports[0].verdict, Verdict::Inconclusive);
        assert!(reports[0].frontiers.is_some());
        assert_eq!(reports[1].verdict, Verdict::True);
        assert_eq!(outcome.final_verdict, Verdict::True);
        assert!(!outcome.stopped_early);
    }

    #[test]
    fn test_true_latches_for_disjuncts_without_forbidden_past() {
        let source = "\
# system_processes: W
eid,processes,vc,props
e1,W,W:1,hit
e2,W,W:2,other
";
        // the M-literal witness disappears at e2, but TRUE latches
        let (mut monitor, events) =
            monitor_for("EP(hit & !miss)", source, MonitorConfig::default());
        let (outcome, reports) = monitor.run(events).unwrap();
        assert_eq!(reports[0].verdict, Verdict::True);
        assert_eq!(reports[1].verdict, Verdict::True);
        assert_eq!(outcome.final_verdict, Verdict::True);
    }

    #[test]
    fn test_forbidden_past_is_reevaluated() {
        // satisfied transiently at e1, then the forbidden prop arrives
        let (mut monitor, events) = monitor_for(
            "EP(EP(good) & !EP(bad))",
            SIMPLE,
            MonitorConfig::default(),
        );
        let (outcome, reports) = monitor.run(events).unwrap();
        assert_eq!(reports[0].verdict, Verdict::True);
        assert_eq!(reports[1].verdict, Verdict::False);
        assert_eq!(outcome.final_verdict, Verdict::False);
    }

    #[test]
    fn test_stop_on_verdict() {
        let (mut monitor, events) = monitor_for(
            "EP(good)",
            SIMPLE,
            MonitorConfig {
                stop_on_verdict: true,
                ..Default::default()
            },
        );
        let (outcome, reports) = monitor.run(events).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(outcome.stopped_early);
        assert_eq!(outcome.final_verdict, Verdict::True);
        assert_eq!(outcome.events_processed, 1);
    }

    #[test]
    fn test_causality_violation_aborts() {
        let source = "\
# system_processes: W
eid,processes,vc,props
e1,W,W:2,a
e2,W,W:1,b
";
        let (mut monitor, events) = monitor_for("EP(a)", source, MonitorConfig::default());
        let result = monitor.run(events);
        assert!(matches!(
            result,
            Err(crate::error::PbtlError::CausalityViolation { .. })
        ));
    }

    #[test]
    fn test_lenient_mode_warns_and_continues() {
        let source = "\
# system_processes: W
eid,processes,vc,props
e1,W,W:2,a
e2,W,W:1,b
e3,W,W:3,c
";
        let (mut monitor, events) = monitor_for(
            "EP(EP(a) & EP(c))",
            source,
            MonitorConfig {
                lenient: true,
                ..Default::default()
            },
        );
        let (outcome, _) = monitor.run(events).unwrap();
        assert_eq!(outcome.final_verdict, Verdict::True);
        assert!(!monitor.warnings().is_empty());
    }
}
