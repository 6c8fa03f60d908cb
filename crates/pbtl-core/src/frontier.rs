//! Consistent cuts over the observed prefix and their maintenance
//!
//! A frontier maps every process to its latest absorbed event and caches
//! two proposition unions: `present` (props of the latest events) and
//! `past` (props of every event in the cut's history, including the
//! present). The store derives a new frontier set from the old one each
//! time an event is absorbed.

use crate::error::{PbtlError, PbtlResult};
use crate::event::{EventArena, EventId, IOTA_EVENT};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Frontier {
    latest: Vec<EventId>,
    present: HashSet<String>,
    past: HashSet<String>,
}

impl Frontier {
    fn initial(arena: &EventArena, processes: usize) -> Self {
        let sentinel = arena.get(IOTA_EVENT);
        Self {
            latest: vec![IOTA_EVENT; processes],
            present: sentinel.props.clone(),
            past: sentinel.props.clone(),
        }
    }

    pub fn latest(&self, process: usize) -> EventId {
        self.latest[process]
    }

    /// Proposition holds at this cut (in the props of a latest event).
    pub fn holds_now(&self, prop: &str) -> bool {
        self.present.contains(prop)
    }

    /// Proposition occurred somewhere in the causal past of this cut.
    pub fn holds_in_past(&self, prop: &str) -> bool {
        self.past.contains(prop)
    }

    /// Logical time of this cut on one process.
    pub fn cut_stamp(&self, arena: &EventArena, process: usize) -> u64 {
        arena.get(self.latest[process]).vc.get(process)
    }

    /// Mutual causal consistency: no entry knows more about a process than
    /// that process's own entry.
    pub fn is_consistent(&self, arena: &EventArena) -> bool {
        for q in 0..self.latest.len() {
            let own = arena.get(self.latest[q]).vc.get(q);
            for p in 0..self.latest.len() {
                if p != q && arena.get(self.latest[p]).vc.get(q) > own {
                    return false;
                }
            }
        }
        true
    }

    // Extension of this cut by one event, if the cut can accept it.
    fn try_extend(&self, arena: &EventArena, id: EventId) -> Option<Frontier> {
        let event = arena.get(id);
        for &p in &event.participants {
            // the cut must hold e's predecessor on every participant
            if arena.get(self.latest[p]).vc.get(p) >= event.vc.get(p) {
                return None;
            }
        }
        for q in 0..self.latest.len() {
            // e must not know of observations beyond this cut elsewhere
            if !event.is_participant(q) && event.vc.get(q) > arena.get(self.latest[q]).vc.get(q) {
                return None;
            }
        }

        let mut latest = self.latest.clone();
        for &p in &event.participants {
            latest[p] = id;
        }
        let extended = Frontier {
            present: present_props(&latest, arena),
            past: {
                let mut past = self.past.clone();
                past.extend(event.props.iter().cloned());
                past
            },
            latest,
        };
        if !extended.is_consistent(arena) {
            return None;
        }
        Some(extended)
    }

    pub fn render(&self, arena: &EventArena) -> String {
        let entries: Vec<&str> = self
            .latest
            .iter()
            .map(|&id| arena.get(id).eid.as_str())
            .collect();
        format!("[{}]", entries.join(","))
    }
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        // the caches are derived from the entries
        self.latest == other.latest
    }
}

impl Eq for Frontier {}

fn present_props(latest: &[EventId], arena: &EventArena) -> HashSet<String> {
    let mut present = HashSet::new();
    let mut seen: HashSet<EventId> = HashSet::new();
    for &id in latest {
        if seen.insert(id) {
            present.extend(arena.get(id).props.iter().cloned());
        }
    }
    present
}

/// The set of reachable consistent cuts, in insertion order.
#[derive(Debug)]
pub struct FrontierSet {
    frontiers: Vec<Frontier>,
}

impl FrontierSet {
    pub fn new(arena: &EventArena, processes: usize) -> Self {
        Self {
            frontiers: vec![Frontier::initial(arena, processes)],
        }
    }

    /// Absorb one event: every frontier either extends with it or is kept
    /// for later extension; extensions that duplicate or are strictly
    /// dominated by another retained cut are retired.
    pub fn absorb(&mut self, arena: &EventArena, id: EventId) -> PbtlResult<()> {
        let mut next: Vec<Frontier> = Vec::with_capacity(self.frontiers.len() + 1);
        let mut absorbed = false;
        for frontier in &self.frontiers {
            match frontier.try_extend(arena, id) {
                Some(extended) => {
                    absorbed = true;
                    push_unique(&mut next, extended);
                }
                None => push_unique(&mut next, frontier.clone()),
            }
        }
        if !absorbed {
            return Err(PbtlError::internal(format!(
                "event {} was not absorbed by any frontier",
                arena.get(id).eid
            )));
        }
        dominance_prune(&mut next, arena);
        self.frontiers = next;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frontier> {
        self.frontiers.iter()
    }

    pub fn len(&self) -> usize {
        self.frontiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frontiers.is_empty()
    }

    pub fn render(&self, arena: &EventArena) -> String {
        let entries: Vec<String> = self.frontiers.iter().map(|f| f.render(arena)).collect();
        format!("{{{}}}", entries.join(", "))
    }
}

fn push_unique(frontiers: &mut Vec<Frontier>, candidate: Frontier) {
    if !frontiers.iter().any(|f| *f == candidate) {
        frontiers.push(candidate);
    }
}

// Retire every cut strictly dominated (component-wise on cut stamps, with
// at least one strict step) by another cut in the set.
fn dominance_prune(frontiers: &mut Vec<Frontier>, arena: &EventArena) {
    if frontiers.len() < 2 {
        return;
    }
    let processes = frontiers[0].latest.len();
    let stamps: Vec<Vec<u64>> = frontiers
        .iter()
        .map(|f| (0..processes).map(|p| f.cut_stamp(arena, p)).collect())
        .collect();
    let retained: Vec<bool> = (0..frontiers.len())
        .map(|i| {
            !stamps
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && strictly_dominates(other, &stamps[i]))
        })
        .collect();
    let mut keep = retained.into_iter();
    frontiers.retain(|_| keep.next().unwrap_or(false));
}

fn strictly_dominates(a: &[u64], b: &[u64]) -> bool {
    a.iter().zip(b).all(|(x, y)| x >= y) && a.iter().zip(b).any(|(x, y)| x > y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VectorClock;
    use crate::event::{Event, EventArena, IOTA};
    use std::collections::HashSet as Set;

    fn event(eid: &str, participants: Vec<usize>, stamps: Vec<u64>, props: &[&str]) -> Event {
        Event {
            eid: eid.to_string(),
            participants,
            vc: VectorClock::from_stamps(stamps),
            props: props.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_initial_frontier_holds_iota() {
        let arena = EventArena::new(2);
        let store = FrontierSet::new(&arena, 2);
        assert_eq!(store.len(), 1);
        let initial = store.iter().next().unwrap();
        assert!(initial.holds_now(IOTA));
        assert!(initial.holds_in_past(IOTA));
        assert!(initial.is_consistent(&arena));
    }

    #[test]
    fn test_absorb_internal_event() {
        let mut arena = EventArena::new(2);
        let mut store = FrontierSet::new(&arena, 2);
        let id = arena.push(event("a1", vec![0], vec![1, 0], &["x"]));
        store.absorb(&arena, id).unwrap();

        assert_eq!(store.len(), 1);
        let frontier = store.iter().next().unwrap();
        assert_eq!(frontier.latest(0), id);
        assert_eq!(frontier.latest(1), IOTA_EVENT);
        assert!(frontier.holds_now("x"));
        assert!(frontier.holds_in_past("x"));
        assert!(frontier.holds_in_past(IOTA));
    }

    #[test]
    fn test_absorb_replaces_present_but_extends_past() {
        let mut arena = EventArena::new(1);
        let mut store = FrontierSet::new(&arena, 1);
        let first = arena.push(event("e1", vec![0], vec![1], &["early"]));
        let second = arena.push(event("e2", vec![0], vec![2], &["late"]));
        store.absorb(&arena, first).unwrap();
        store.absorb(&arena, second).unwrap();

        assert_eq!(store.len(), 1);
        let frontier = store.iter().next().unwrap();
        assert!(!frontier.holds_now("early"));
        assert!(frontier.holds_now("late"));
        assert!(frontier.holds_in_past("early"));
        assert!(frontier.holds_in_past("late"));
    }

    #[test]
    fn test_absorb_rendezvous_merges() {
        let mut arena = EventArena::new(2);
        let mut store = FrontierSet::new(&arena, 2);
        let a1 = arena.push(event("a1", vec![0], vec![1, 0], &["x"]));
        let b1 = arena.push(event("b1", vec![1], vec![0, 1], &["y"]));
        let joint = arena.push(event("joint", vec![0, 1], vec![2, 2], &["sync"]));
        store.absorb(&arena, a1).unwrap();
        store.absorb(&arena, b1).unwrap();
        store.absorb(&arena, joint).unwrap();

        assert_eq!(store.len(), 1);
        let frontier = store.iter().next().unwrap();
        assert_eq!(frontier.latest(0), joint);
        assert_eq!(frontier.latest(1), joint);
        for prop in ["x", "y", "sync"] {
            assert!(frontier.holds_in_past(prop));
        }
        assert!(frontier.holds_now("sync"));
        assert!(!frontier.holds_now("x"));
    }

    #[test]
    fn test_event_absorbed_nowhere_is_an_invariant_error() {
        let mut arena = EventArena::new(1);
        let mut store = FrontierSet::new(&arena, 1);
        // clock regressed to 0, no frontier is "ready" for it
        let id = arena.push(event("bad", vec![0], vec![0], &[]));
        assert!(matches!(
            store.absorb(&arena, id),
            Err(PbtlError::InternalInvariant { .. })
        ));
    }

    #[test]
    fn test_absorb_commutes_for_concurrent_events() {
        let mut arena = EventArena::new(2);
        let a1 = arena.push(event("a1", vec![0], vec![1, 0], &["x"]));
        let b1 = arena.push(event("b1", vec![1], vec![0, 1], &["y"]));

        let mut forward = FrontierSet::new(&arena, 2);
        forward.absorb(&arena, a1).unwrap();
        forward.absorb(&arena, b1).unwrap();

        let mut backward = FrontierSet::new(&arena, 2);
        backward.absorb(&arena, b1).unwrap();
        backward.absorb(&arena, a1).unwrap();

        let cuts = |set: &FrontierSet| -> Set<Vec<EventId>> {
            set.iter().map(|f| {
                (0..2).map(|p| f.latest(p)).collect::<Vec<_>>()
            }).collect()
        };
        assert_eq!(cuts(&forward), cuts(&backward));
    }

    #[test]
    fn test_every_retained_frontier_is_consistent() {
        let mut arena = EventArena::new(3);
        let mut store = FrontierSet::new(&arena, 3);
        let ids = vec![
            arena.push(event("p1", vec![0], vec![1, 0, 0], &["prepare"])),
            arena.push(event("p2", vec![1], vec![0, 1, 0], &["prepare"])),
            arena.push(event("p3", vec![2], vec![0, 0, 1], &["prepare"])),
            arena.push(event("commit", vec![0, 1, 2], vec![2, 2, 2], &["commit"])),
        ];
        for id in ids {
            store.absorb(&arena, id).unwrap();
            for frontier in store.iter() {
                assert!(frontier.is_consistent(&arena));
            }
        }
    }

    #[test]
    fn test_strict_domination() {
        assert!(strictly_dominates(&[2, 1], &[1, 1]));
        assert!(!strictly_dominates(&[1, 1], &[1, 1]));
        assert!(!strictly_dominates(&[2, 0], &[1, 1]));
    }

    #[test]
    fn test_dominance_prune_retires_covered_cuts() {
        let mut arena = EventArena::new(2);
        let a1 = arena.push(event("a1", vec![0], vec![1, 0], &[]));
        let store = FrontierSet::new(&arena, 2);
        let initial = store.iter().next().unwrap().clone();
        let extended = initial.try_extend(&arena, a1).unwrap();

        let mut frontiers = vec![initial, extended.clone()];
        dominance_prune(&mut frontiers, &arena);
        assert_eq!(frontiers, vec![extended]);
    }
}
