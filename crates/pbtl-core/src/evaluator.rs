//! Three-valued disjunct evaluation over the frontier set

use crate::dlnf::{Disjunct, Literal};
use crate::frontier::{Frontier, FrontierSet};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Monitoring verdict, ordered FALSE < INCONCLUSIVE < TRUE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    True,
    False,
    Inconclusive,
}

impl Verdict {
    pub fn is_conclusive(self) -> bool {
        !matches!(self, Verdict::Inconclusive)
    }

    /// Disjunction under the verdict lattice: TRUE dominates, FALSE only
    /// survives when both sides are FALSE.
    pub fn join(self, other: Verdict) -> Verdict {
        match (self, other) {
            (Verdict::True, _) | (_, Verdict::True) => Verdict::True,
            (Verdict::False, Verdict::False) => Verdict::False,
            _ => Verdict::Inconclusive,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::True => write!(f, "TRUE"),
            Verdict::False => write!(f, "FALSE"),
            Verdict::Inconclusive => write!(f, "INCONCLUSIVE"),
        }
    }
}

/// A disjunct with its literals bucketed by kind, ready for repeated
/// evaluation against the frontier set.
#[derive(Debug, Clone)]
pub struct CompiledDisjunct {
    /// M-literals: must be in the props of the witness cut
    now_pos: Vec<String>,
    /// negated M-literals: must be absent from the props of the witness
    now_neg: Vec<String>,
    /// P-literals: must appear in the causal past of the witness
    past_pos: Vec<String>,
    /// N-literals: must never appear in the causal past of the witness
    past_neg: Vec<String>,
    contradictory: bool,
}

impl CompiledDisjunct {
    pub fn compile(disjunct: &Disjunct) -> Self {
        let mut now_pos = Vec::new();
        let mut now_neg = Vec::new();
        let mut past_pos = Vec::new();
        let mut past_neg = Vec::new();
        for literal in &disjunct.literals {
            match literal {
                Literal::Prop(p) => now_pos.push(p.clone()),
                Literal::NotProp(p) => now_neg.push(p.clone()),
                Literal::Ep(p) => past_pos.push(p.clone()),
                Literal::NotEp(p) => past_neg.push(p.clone()),
            }
        }

        let now_pos_set: HashSet<&str> = now_pos.iter().map(String::as_str).collect();
        let past_pos_set: HashSet<&str> = past_pos.iter().map(String::as_str).collect();
        // p & !p and EP(p) & !EP(p) are unsatisfiable outright; so is
        // p & !EP(p), since a proposition holding now is already in the past
        let contradictory = now_neg.iter().any(|p| now_pos_set.contains(p.as_str()))
            || past_neg.iter().any(|p| {
                past_pos_set.contains(p.as_str()) || now_pos_set.contains(p.as_str())
            });

        Self {
            now_pos,
            now_neg,
            past_pos,
            past_neg,
            contradictory,
        }
    }

    /// Whether the disjunct carries N-literals; such a disjunct stays
    /// falsifiable by extension and its TRUE state is never latched.
    pub fn has_forbidden_past(&self) -> bool {
        !self.past_neg.is_empty()
    }

    pub fn is_contradictory(&self) -> bool {
        self.contradictory
    }

    /// Literal-kind profile, e.g. "P+M+N", for debug output.
    pub fn profile(&self) -> String {
        let mut parts = Vec::new();
        if !self.now_pos.is_empty() || !self.now_neg.is_empty() {
            parts.push("M");
        }
        if !self.past_pos.is_empty() {
            parts.push("P");
        }
        if !self.past_neg.is_empty() {
            parts.push("N");
        }
        if parts.is_empty() {
            "TRUE".to_string()
        } else {
            parts.join("+")
        }
    }

    /// All four clauses hold at this witness cut.
    pub fn satisfied_at(&self, frontier: &Frontier) -> bool {
        self.now_pos.iter().all(|p| frontier.holds_now(p))
            && self.now_neg.iter().all(|p| !frontier.holds_now(p))
            && self.past_pos.iter().all(|p| frontier.holds_in_past(p))
            && self.past_neg.iter().all(|p| !frontier.holds_in_past(p))
    }

    /// No extension of the current frontier set can satisfy the disjunct:
    /// it is contradictory, or some forbidden proposition is already in
    /// the past of every retained frontier (it cannot be un-observed).
    pub fn permanently_false(&self, frontiers: &FrontierSet) -> bool {
        if self.contradictory {
            return true;
        }
        self.past_neg
            .iter()
            .any(|p| frontiers.iter().all(|f| f.holds_in_past(p)))
    }

    /// Current verdict: witnesses are searched in insertion order.
    pub fn evaluate(&self, frontiers: &FrontierSet) -> Verdict {
        if self.contradictory {
            return Verdict::False;
        }
        if frontiers.iter().any(|f| self.satisfied_at(f)) {
            return Verdict::True;
        }
        if self.permanently_false(frontiers) {
            return Verdict::False;
        }
        Verdict::Inconclusive
    }
}
