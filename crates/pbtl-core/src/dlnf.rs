//! Disjunctive Literal Normal Form and the transformer that produces it
//!
//! A DLNF formula is a disjunction of conjunctions whose atoms are one of
//! four shapes: `p`, `!p`, `EP(p)` or `!EP(p)`. The transformer pushes
//! negations inward, distributes `EP` over disjunction and distributes `&`
//! over `|` until only these shapes remain, or rejects the formula as
//! outside the reducible subset.

use crate::ast::Formula;
use crate::error::{PbtlError, PbtlResult};
use std::collections::HashSet;
use std::fmt;

/// An atomic DLNF literal
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Literal {
    /// `p` holds at the witness frontier
    Prop(String),
    /// `p` does not hold at the witness frontier
    NotProp(String),
    /// `p` occurred somewhere in the causal past of the witness
    Ep(String),
    /// `p` never occurred in the causal past of the witness
    NotEp(String),
}

impl Literal {
    fn to_formula(&self) -> Formula {
        match self {
            Literal::Prop(p) => Formula::prop(p.clone()),
            Literal::NotProp(p) => Formula::not(Formula::prop(p.clone())),
            Literal::Ep(p) => Formula::ep(Formula::prop(p.clone())),
            Literal::NotEp(p) => Formula::not(Formula::ep(Formula::prop(p.clone()))),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Prop(p) => write!(f, "{}", p),
            Literal::NotProp(p) => write!(f, "!{}", p),
            Literal::Ep(p) => write!(f, "EP({})", p),
            Literal::NotEp(p) => write!(f, "!EP({})", p),
        }
    }
}

/// One conjunction of literals; empty means trivially true
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disjunct {
    pub literals: Vec<Literal>,
}

impl Disjunct {
    fn to_formula(&self) -> Formula {
        self.literals
            .iter()
            .map(Literal::to_formula)
            .reduce(Formula::and)
            .unwrap_or(Formula::True)
    }
}

impl fmt::Display for Disjunct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.literals.is_empty() {
            return write!(f, "TRUE");
        }
        let rendered: Vec<String> = self.literals.iter().map(|l| l.to_string()).collect();
        write!(f, "{}", rendered.join(" & "))
    }
}

/// A formula in DLNF; no disjuncts means trivially false
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dlnf {
    pub disjuncts: Vec<Disjunct>,
}

impl Dlnf {
    /// Transform an arbitrary formula using the default disjunct cap.
    pub fn transform(formula: &Formula) -> PbtlResult<Dlnf> {
        Self::transform_with_limit(formula, crate::DEFAULT_MAX_DISJUNCTS)
    }

    /// Transform an arbitrary formula, failing with `FormulaTooLarge` if the
    /// rewrite would exceed `max_disjuncts` alternatives.
    pub fn transform_with_limit(formula: &Formula, max_disjuncts: usize) -> PbtlResult<Dlnf> {
        let transformer = Transformer { max_disjuncts };
        let raw = transformer.disjunctive(formula)?;
        Ok(Dlnf {
            disjuncts: simplify(raw),
        })
    }

    pub fn is_trivially_true(&self) -> bool {
        self.disjuncts.iter().any(|d| d.literals.is_empty())
    }

    pub fn is_trivially_false(&self) -> bool {
        self.disjuncts.is_empty()
    }

    /// Rebuild an AST with the same meaning; transforming it again yields
    /// this DLNF (modulo ordering).
    pub fn to_formula(&self) -> Formula {
        self.disjuncts
            .iter()
            .map(Disjunct::to_formula)
            .reduce(Formula::or)
            .unwrap_or(Formula::False)
    }
}

impl fmt::Display for Dlnf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.disjuncts.is_empty() {
            return write!(f, "FALSE");
        }
        let rendered: Vec<String> = self.disjuncts.iter().map(|d| d.to_string()).collect();
        write!(f, "{}", rendered.join("  |  "))
    }
}

// Working representation during the rewrite: a disjunction of conjunctions.
type Dnf = Vec<Vec<Literal>>;

struct Transformer {
    max_disjuncts: usize,
}

impl Transformer {
    fn ensure_within_limit(&self, disjuncts: usize) -> PbtlResult<()> {
        if disjuncts > self.max_disjuncts {
            Err(PbtlError::FormulaTooLarge {
                disjuncts,
                max: self.max_disjuncts,
            })
        } else {
            Ok(())
        }
    }

    /// Rewrite a formula standing in disjunctive position. `EP` over a
    /// conjunction of literal shapes denotes "some reachable frontier
    /// satisfies the block" here and is lowered to the block itself;
    /// `EP` over a single proposition stays a past literal.
    fn disjunctive(&self, formula: &Formula) -> PbtlResult<Dnf> {
        match formula {
            Formula::Or(left, right) => {
                let mut out = self.disjunctive(left)?;
                out.extend(self.disjunctive(right)?);
                self.ensure_within_limit(out.len())?;
                Ok(out)
            }
            Formula::Ep(body) => {
                let inner = self.disjunctive(body)?;
                Ok(inner.into_iter().map(lower_ep_block).collect())
            }
            other => self.conjunctive(other, true),
        }
    }

    /// Polarity-carrying DNF rewrite: returns the DNF of the formula when
    /// `polarity` is true, of its negation otherwise. `EP` bodies must
    /// reduce to single positive past-or-proposition literals here.
    fn conjunctive(&self, formula: &Formula, polarity: bool) -> PbtlResult<Dnf> {
        match (formula, polarity) {
            (Formula::True, true) | (Formula::False, false) => Ok(vec![vec![]]),
            (Formula::True, false) | (Formula::False, true) => Ok(vec![]),
            (Formula::Prop(p), true) => Ok(vec![vec![Literal::Prop(p.clone())]]),
            (Formula::Prop(p), false) => Ok(vec![vec![Literal::NotProp(p.clone())]]),
            (Formula::Not(inner), _) => self.conjunctive(inner, !polarity),
            (Formula::And(left, right), true) | (Formula::Or(left, right), false) => {
                let lhs = self.conjunctive(left, polarity)?;
                let rhs = self.conjunctive(right, polarity)?;
                self.cross(lhs, rhs)
            }
            (Formula::And(left, right), false) | (Formula::Or(left, right), true) => {
                let mut out = self.conjunctive(left, polarity)?;
                out.extend(self.conjunctive(right, polarity)?);
                self.ensure_within_limit(out.len())?;
                Ok(out)
            }
            (Formula::Ep(body), true) => {
                let inner = self.conjunctive(body, true)?;
                let mut out = Dnf::with_capacity(inner.len());
                for conjunct in inner {
                    if conjunct.is_empty() {
                        // EP(TRUE) is TRUE
                        out.push(vec![]);
                    } else {
                        out.push(vec![past_literal(conjunct, formula)?]);
                    }
                }
                Ok(out)
            }
            (Formula::Ep(body), false) => {
                // !EP(d1 | d2 | ...) == !EP(d1) & !EP(d2) & ...
                let inner = self.conjunctive(body, true)?;
                let mut conjunct = Vec::with_capacity(inner.len());
                for alternative in inner {
                    if alternative.is_empty() {
                        // !EP(TRUE) is unsatisfiable
                        return Ok(vec![]);
                    }
                    conjunct.push(negated_past_literal(alternative, formula)?);
                }
                // inner empty means the body was FALSE, so !EP(FALSE) is TRUE
                Ok(vec![conjunct])
            }
        }
    }

    // Distribute '&' over '|': the cartesian product of two DNFs.
    fn cross(&self, lhs: Dnf, rhs: Dnf) -> PbtlResult<Dnf> {
        self.ensure_within_limit(lhs.len().saturating_mul(rhs.len()))?;
        let mut out = Dnf::with_capacity(lhs.len() * rhs.len());
        for left in &lhs {
            for right in &rhs {
                let mut conjunct = left.clone();
                conjunct.extend(right.iter().cloned());
                out.push(conjunct);
            }
        }
        Ok(out)
    }
}

// EP over a block in disjunctive position: a single proposition stays a
// past literal (EP distributes over '|'), everything else is witnessed by
// one reachable frontier and lowers to the block itself.
fn lower_ep_block(conjunct: Vec<Literal>) -> Vec<Literal> {
    if let [Literal::Prop(p)] = conjunct.as_slice() {
        return vec![Literal::Ep(p.clone())];
    }
    conjunct
}

fn past_literal(conjunct: Vec<Literal>, context: &Formula) -> PbtlResult<Literal> {
    match conjunct.as_slice() {
        [Literal::Prop(p)] | [Literal::Ep(p)] => Ok(Literal::Ep(p.clone())),
        _ => Err(PbtlError::UnsupportedFormula {
            formula: context.to_string(),
        }),
    }
}

fn negated_past_literal(conjunct: Vec<Literal>, context: &Formula) -> PbtlResult<Literal> {
    match conjunct.as_slice() {
        [Literal::Prop(p)] | [Literal::Ep(p)] => Ok(Literal::NotEp(p.clone())),
        _ => Err(PbtlError::UnsupportedFormula {
            formula: context.to_string(),
        }),
    }
}

// Drop repeated literals within a disjunct and repeated disjuncts within
// the formula, preserving first-occurrence order.
fn simplify(raw: Dnf) -> Vec<Disjunct> {
    let mut seen_disjuncts: HashSet<Vec<Literal>> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for conjunct in raw {
        let mut seen = HashSet::new();
        let mut literals = Vec::with_capacity(conjunct.len());
        for literal in conjunct {
            if seen.insert(literal.clone()) {
                literals.push(literal);
            }
        }
        let mut key = literals.clone();
        key.sort();
        if seen_disjuncts.insert(key) {
            out.push(Disjunct { literals });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;

    fn dlnf(source: &str) -> Dlnf {
        Dlnf::transform(&parse_formula(source).unwrap()).unwrap()
    }

    fn literals(dlnf: &Dlnf, index: usize) -> Vec<String> {
        dlnf.disjuncts[index]
            .literals
            .iter()
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn test_plain_proposition() {
        let result = dlnf("ready");
        assert_eq!(result.disjuncts.len(), 1);
        assert_eq!(literals(&result, 0), vec!["ready"]);
    }

    #[test]
    fn test_ep_distributes_over_or() {
        let result = dlnf("EP(a | b)");
        assert_eq!(result.disjuncts.len(), 2);
        assert_eq!(literals(&result, 0), vec!["EP(a)"]);
        assert_eq!(literals(&result, 1), vec!["EP(b)"]);
    }

    #[test]
    fn test_ep_block_lowers_to_past_literals() {
        let result = dlnf("EP(EP(request) & EP(response))");
        assert_eq!(result.disjuncts.len(), 1);
        assert_eq!(literals(&result, 0), vec!["EP(request)", "EP(response)"]);
    }

    #[test]
    fn test_ep_block_keeps_present_literals() {
        let result = dlnf("EP(status_ok & load_lt_100 & !critical_alarm)");
        assert_eq!(result.disjuncts.len(), 1);
        assert_eq!(
            literals(&result, 0),
            vec!["status_ok", "load_lt_100", "!critical_alarm"]
        );
    }

    #[test]
    fn test_mixed_block() {
        let result = dlnf("EP(EP(a) & EP(b) & EP(c) & !EP(d))");
        assert_eq!(result.disjuncts.len(), 1);
        assert_eq!(
            literals(&result, 0),
            vec!["EP(a)", "EP(b)", "EP(c)", "!EP(d)"]
        );
    }

    #[test]
    fn test_negated_ep() {
        let result = dlnf("!EP(bad)");
        assert_eq!(result.disjuncts.len(), 1);
        assert_eq!(literals(&result, 0), vec!["!EP(bad)"]);
    }

    #[test]
    fn test_negation_pushes_through_de_morgan() {
        let result = dlnf("!(a | EP(b))");
        assert_eq!(result.disjuncts.len(), 1);
        assert_eq!(literals(&result, 0), vec!["!a", "!EP(b)"]);
    }

    #[test]
    fn test_double_negation() {
        let result = dlnf("!!a");
        assert_eq!(result.disjuncts.len(), 1);
        assert_eq!(literals(&result, 0), vec!["a"]);
    }

    #[test]
    fn test_negated_ep_distributes_over_body_disjunction() {
        let result = dlnf("!EP(a | b)");
        assert_eq!(result.disjuncts.len(), 1);
        assert_eq!(literals(&result, 0), vec!["!EP(a)", "!EP(b)"]);
    }

    #[test]
    fn test_nested_ep_collapses() {
        let result = dlnf("EP(EP(p))");
        assert_eq!(result.disjuncts.len(), 1);
        assert_eq!(literals(&result, 0), vec!["EP(p)"]);

        let result = dlnf("!EP(EP(p))");
        assert_eq!(literals(&result, 0), vec!["!EP(p)"]);
    }

    #[test]
    fn test_and_distributes_over_or() {
        let result = dlnf("(a | b) & c");
        assert_eq!(result.disjuncts.len(), 2);
        assert_eq!(literals(&result, 0), vec!["a", "c"]);
        assert_eq!(literals(&result, 1), vec!["b", "c"]);
    }

    #[test]
    fn test_constants_fold() {
        assert!(dlnf("FALSE").is_trivially_false());
        assert!(dlnf("TRUE").is_trivially_true());
        assert!(dlnf("a & FALSE").is_trivially_false());
        assert!(dlnf("EP(TRUE)").is_trivially_true());
        assert!(dlnf("!EP(TRUE)").is_trivially_false());
        assert!(dlnf("!EP(FALSE)").is_trivially_true());
    }

    #[test]
    fn test_duplicate_literals_are_suppressed() {
        let result = dlnf("a & a & EP(b) & EP(b)");
        assert_eq!(result.disjuncts.len(), 1);
        assert_eq!(literals(&result, 0), vec!["a", "EP(b)"]);
    }

    #[test]
    fn test_unsupported_ep_conjunction_under_and() {
        let formula = parse_formula("x & EP(a & b)").unwrap();
        assert!(matches!(
            Dlnf::transform(&formula),
            Err(PbtlError::UnsupportedFormula { .. })
        ));
    }

    #[test]
    fn test_unsupported_negated_ep_conjunction() {
        let formula = parse_formula("!EP(a & b)").unwrap();
        assert!(matches!(
            Dlnf::transform(&formula),
            Err(PbtlError::UnsupportedFormula { .. })
        ));
    }

    #[test]
    fn test_disjunct_limit() {
        let formula = parse_formula("(a | b) & (c | d) & (e | f)").unwrap();
        assert!(matches!(
            Dlnf::transform_with_limit(&formula, 4),
            Err(PbtlError::FormulaTooLarge { max: 4, .. })
        ));
    }

    #[test]
    fn test_idempotence() {
        for source in [
            "EP(EP(a) & EP(b) & !EP(d))",
            "EP(a | b) & !EP(c)",
            "a & !b | EP(c)",
            "EP(status_ok & !critical_alarm)",
        ] {
            let once = dlnf(source);
            let twice = Dlnf::transform(&once.to_formula()).unwrap();
            let normalize = |d: &Dlnf| {
                let mut keys: Vec<Vec<Literal>> = d
                    .disjuncts
                    .iter()
                    .map(|dis| {
                        let mut lits = dis.literals.clone();
                        lits.sort();
                        lits
                    })
                    .collect();
                keys.sort();
                keys
            };
            assert_eq!(normalize(&once), normalize(&twice), "not idempotent: {}", source);
        }
    }
}
