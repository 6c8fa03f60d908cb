//! pbtl - monitor PBTL properties over vector-clocked distributed traces
//!
//! Reads one property formula and one CSV trace, feeds the events through
//! the monitoring engine and reports a per-event log plus the final
//! three-valued verdict. The exit code reflects input validity, never the
//! verdict.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use pbtl_core::{
    parse_formula, read_trace_file, CausalityChecker, Dlnf, EventReport, Monitor, MonitorConfig,
    MonitorOutcome, TraceWarning, Verdict,
};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pbtl")]
#[command(version)]
#[command(about = "PBTL Monitor - past-based temporal logic over partial-order traces")]
struct Cli {
    /// Property file containing one PBTL formula
    #[arg(short = 'p', long = "property", value_name = "PATH")]
    property: PathBuf,

    /// CSV trace file with vector-clocked events
    #[arg(short = 't', long = "trace", value_name = "PATH")]
    trace: PathBuf,

    /// Print the frontier set after every event
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Print the DLNF and per-disjunct states while monitoring
    #[arg(long = "debug")]
    debug: bool,

    /// Validate the property and trace without monitoring
    #[arg(long = "validate-only")]
    validate_only: bool,

    /// Stop consuming events once the verdict is conclusive
    #[arg(long = "stop-on-verdict")]
    stop_on_verdict: bool,

    /// Dump the final monitor state after the run
    #[arg(long = "debug-final")]
    debug_final: bool,

    /// Downgrade causality violations to warnings
    #[arg(long = "lenient")]
    lenient: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    format: OutputFormat,
}

#[derive(ValueEnum, Clone, Debug)]
enum OutputFormat {
    /// Human-readable per-event log
    Human,
    /// JSON output for programmatic use
    Json,
}

#[derive(Serialize)]
struct JsonReport {
    property: String,
    dlnf: String,
    final_verdict: Verdict,
    events_processed: usize,
    stopped_early: bool,
    warnings: Vec<String>,
    events: Vec<EventReport>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let property_source = fs::read_to_string(&cli.property)
        .with_context(|| format!("Failed to read property file {}", cli.property.display()))?;
    let formula = parse_formula(&property_source)
        .with_context(|| format!("Invalid property in {}", cli.property.display()))?;
    let dlnf = Dlnf::transform(&formula)
        .with_context(|| format!("Failed to normalize property in {}", cli.property.display()))?;

    let trace = read_trace_file(&cli.trace)
        .with_context(|| format!("Failed to read trace file {}", cli.trace.display()))?;

    if cli.validate_only {
        let mut checker = CausalityChecker::new(trace.processes.len());
        for traced in &trace.events {
            checker
                .check(&traced.event, &trace.processes)
                .with_context(|| format!("Trace line {}", traced.line))?;
        }
        print_warnings(&trace.warnings);
        println!(
            "{} property and trace are valid ({} events, {} processes)",
            "OK".green().bold(),
            trace.events.len(),
            trace.processes.len()
        );
        return Ok(());
    }

    if cli.debug {
        eprintln!("DLNF: {}", dlnf);
    }

    let config = MonitorConfig {
        stop_on_verdict: cli.stop_on_verdict,
        verbose: cli.verbose,
        debug: cli.debug,
        lenient: cli.lenient,
    };
    let mut monitor = Monitor::new(&dlnf, trace.processes, config);
    let (outcome, reports) = monitor.run(trace.events)?;

    let mut warnings = trace.warnings;
    warnings.extend(monitor.warnings().iter().cloned());

    match cli.format {
        OutputFormat::Human => {
            print_warnings(&warnings);
            for report in &reports {
                print_event(report);
            }
            if cli.debug_final {
                eprintln!("final frontier set: {}", monitor.frontier_summary());
                for line in monitor.disjunct_summary() {
                    eprintln!("final disjunct {}", line);
                }
            }
            println!("FINAL VERDICT: {}", colorize(outcome.final_verdict));
        }
        OutputFormat::Json => {
            let report = JsonReport {
                property: formula.to_string(),
                dlnf: dlnf.to_string(),
                final_verdict: outcome.final_verdict,
                events_processed: outcome.events_processed,
                stopped_early: outcome.stopped_early,
                warnings: warnings.iter().map(|w| w.to_string()).collect(),
                events: reports,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    summarize(&outcome);
    Ok(())
}

fn print_warnings(warnings: &[TraceWarning]) {
    for warning in warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
}

fn print_event(report: &EventReport) {
    println!(
        "[{}] processes={{{}}} vc={} frontiers={} verdict={}",
        report.eid,
        report.participants.join(","),
        report.clock,
        report.frontier_count,
        colorize(report.verdict)
    );
    if let Some(frontiers) = &report.frontiers {
        println!("    frontier set: {}", frontiers);
    }
    if let Some(states) = &report.disjunct_states {
        for state in states {
            println!("    disjunct {}", state);
        }
    }
}

fn colorize(verdict: Verdict) -> String {
    match verdict {
        Verdict::True => verdict.to_string().green().bold().to_string(),
        Verdict::False => verdict.to_string().red().bold().to_string(),
        Verdict::Inconclusive => verdict.to_string().yellow().to_string(),
    }
}

fn summarize(outcome: &MonitorOutcome) {
    if outcome.stopped_early {
        eprintln!(
            "stopped after {} event(s) on a conclusive verdict",
            outcome.events_processed
        );
    }
}
