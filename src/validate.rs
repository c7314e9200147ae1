//! Soundness checks for receding-horizon decompositions.
//!
//! The checks are independent and read-only. Findings are returned as data; a report with no
//! findings means the decomposition satisfies the sufficient conditions checked here, not that
//! a controller exists.

use std::collections::BTreeSet;
use std::fmt;

use log::{debug, info};

use crate::arena::CellId;
use crate::horizon::{holds, Condition, GoalPoset, RecedingHorizonProblem};
use crate::region::{diff_union, intersect_union};
use crate::transys::TransitionSystem;

/// Non-excluded states that are in no layer of any goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageGap {
    pub uncovered: BTreeSet<CellId>,
}

/// Non-excluded states missing from one goal's layers.
///
/// Informational: other goals may still cover these states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalCoverage {
    pub goal: usize,
    pub name: String,
    pub uncovered: BTreeSet<CellId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderingKind {
    /// `F(Wj)` is not a lower layer than `Wj`.
    SuccessorNotCloser { successor: usize },
    /// `F(W0) != W0`.
    GoalNotFixed { successor: usize },
    /// States of the goal layer that do not satisfy the goal.
    NotGoal { states: BTreeSet<CellId> },
    /// States of `Wj` without an edge into `F(Wj)`.
    NoProgressEdge { states: BTreeSet<CellId> },
    /// States placed in two layers.
    Overlap { other_layer: usize, states: BTreeSet<CellId> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingViolation {
    pub goal: usize,
    pub layer: usize,
    pub kind: OrderingKind,
}

/// States where the initial condition does not entail `Φ`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub states: BTreeSet<CellId>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub coverage: Option<CoverageGap>,
    /// Per-goal gaps; these do not affect [`ValidationReport::is_sound`].
    pub goal_coverage: Vec<GoalCoverage>,
    pub ordering: Vec<OrderingViolation>,
    pub invariant: Vec<InvariantViolation>,
}

impl ValidationReport {
    /// Every non-excluded state lies in a layer of some goal.
    pub fn coverage_ok(&self) -> bool {
        self.coverage.is_none()
    }
    pub fn ordering_ok(&self) -> bool {
        self.ordering.is_empty()
    }
    pub fn invariant_ok(&self) -> bool {
        self.invariant.is_empty()
    }

    /// All checks passed.
    pub fn is_sound(&self) -> bool {
        self.coverage_ok() && self.ordering_ok() && self.invariant_ok()
    }
}

fn ids(set: &BTreeSet<CellId>) -> String {
    set.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sound() {
            writeln!(f, "decomposition is sound")?;
        }
        if let Some(gap) = &self.coverage {
            writeln!(f, "coverage: {{{}}} are in no goal's layers", ids(&gap.uncovered))?;
        }
        for gap in &self.goal_coverage {
            writeln!(f, "note: goal '{}' does not reach {{{}}}", gap.name, ids(&gap.uncovered))?;
        }
        for v in &self.ordering {
            write!(f, "ordering: goal {} layer {}: ", v.goal, v.layer)?;
            match &v.kind {
                OrderingKind::SuccessorNotCloser { successor } => {
                    writeln!(f, "successor layer {} is not closer", successor)?
                }
                OrderingKind::GoalNotFixed { successor } => writeln!(f, "goal layer maps to {}", successor)?,
                OrderingKind::NotGoal { states } => writeln!(f, "{{{}}} do not satisfy the goal", ids(states))?,
                OrderingKind::NoProgressEdge { states } => {
                    writeln!(f, "{{{}}} have no edge to the successor layer", ids(states))?
                }
                OrderingKind::Overlap { other_layer, states } => {
                    writeln!(f, "{{{}}} also in layer {}", ids(states), other_layer)?
                }
            }
        }
        for v in &self.invariant {
            writeln!(f, "invariant: {} {{{}}}", v.reason, ids(&v.states))?;
        }
        Ok(())
    }
}

fn check_coverage(rhp: &RecedingHorizonProblem) -> Option<CoverageGap> {
    let uncovered: BTreeSet<CellId> = rhp
        .transition_system()
        .states()
        .iter()
        .copied()
        .filter(|id| !rhp.excluded().contains(id))
        .filter(|id| rhp.posets().iter().all(|poset| poset.layer_of(*id).is_none()))
        .collect();
    (!uncovered.is_empty()).then_some(CoverageGap { uncovered })
}

fn check_goal_coverage(rhp: &RecedingHorizonProblem) -> Vec<GoalCoverage> {
    let ts = rhp.transition_system();
    rhp.posets()
        .iter()
        .enumerate()
        .filter_map(|(g, poset)| {
            let uncovered: BTreeSet<CellId> = ts
                .states()
                .iter()
                .copied()
                .filter(|id| !rhp.excluded().contains(id))
                .filter(|id| poset.layer_of(*id).is_none())
                .collect();
            (!uncovered.is_empty()).then(|| GoalCoverage {
                goal: g,
                name: poset.name.clone(),
                uncovered,
            })
        })
        .collect()
}

fn check_poset(ts: &TransitionSystem, g: usize, poset: &GoalPoset) -> Vec<OrderingViolation> {
    let mut out = Vec::new();
    let mut push = |layer: usize, kind: OrderingKind| out.push(OrderingViolation { goal: g, layer, kind });

    for (j, layer) in poset.layers.iter().enumerate() {
        for (k, other) in poset.layers.iter().enumerate().skip(j + 1) {
            let shared: BTreeSet<CellId> = layer.intersection(other).copied().collect();
            if !shared.is_empty() {
                push(j, OrderingKind::Overlap { other_layer: k, states: shared });
            }
        }

        let successor = poset.successor.get(j).copied().unwrap_or(usize::MAX);
        if j == 0 {
            if successor != 0 {
                push(0, OrderingKind::GoalNotFixed { successor });
            }
            let not_goal: BTreeSet<CellId> = layer
                .iter()
                .copied()
                .filter(|&id| holds(ts, id, &poset.goal) != Some(true))
                .collect();
            if !not_goal.is_empty() {
                push(0, OrderingKind::NotGoal { states: not_goal });
            }
            continue;
        }

        if successor >= j {
            push(j, OrderingKind::SuccessorNotCloser { successor });
            continue;
        }
        let target = &poset.layers[successor];
        let stuck: BTreeSet<CellId> = layer
            .iter()
            .copied()
            .filter(|&id| !ts.successors(id).any(|t| target.contains(&t)))
            .collect();
        if !stuck.is_empty() {
            push(j, OrderingKind::NoProgressEdge { states: stuck });
        }
    }
    out
}

fn check_invariant(rhp: &RecedingHorizonProblem) -> Vec<InvariantViolation> {
    let ts = rhp.transition_system();
    let mut offending = BTreeSet::new();
    let mut unknown = BTreeSet::new();

    for &id in ts.states() {
        let Some(region) = ts.region(id) else { continue };
        // Does the initial condition touch this state?
        let initial = match rhp.init() {
            Condition::Formula(f) => holds(ts, id, f),
            Condition::Set(set) => Some(!region.intersect(set).is_empty()),
        };
        match initial {
            Some(false) => continue,
            None => {
                unknown.insert(id);
                continue;
            }
            Some(true) => {}
        }
        // Does Φ hold on the initial part of it?
        let entailed = match (rhp.init(), rhp.phi()) {
            (_, Condition::Formula(f)) => holds(ts, id, f),
            (Condition::Set(init), Condition::Set(phi)) => {
                Some(diff_union(&intersect_union(region.polytopes(), init), phi).is_empty())
            }
            (Condition::Formula(_), Condition::Set(phi)) => Some(region.is_subset(phi)),
        };
        match entailed {
            Some(true) => {}
            Some(false) => {
                offending.insert(id);
            }
            None => {
                unknown.insert(id);
            }
        }
    }

    let mut out = Vec::new();
    if !offending.is_empty() {
        out.push(InvariantViolation {
            states: offending,
            reason: format!("initial condition {} does not imply {}", rhp.init(), rhp.phi()),
        });
    }
    if !unknown.is_empty() {
        out.push(InvariantViolation {
            states: unknown,
            reason: "condition cannot be evaluated on these states".to_string(),
        });
    }
    out
}

/// Check coverage, monotone ordering and invariant entailment of a decomposition.
pub fn validate(rhp: &RecedingHorizonProblem) -> ValidationReport {
    let ts = rhp.transition_system();
    let report = ValidationReport {
        coverage: check_coverage(rhp),
        goal_coverage: check_goal_coverage(rhp),
        ordering: rhp
            .posets()
            .iter()
            .enumerate()
            .flat_map(|(g, poset)| check_poset(ts, g, poset))
            .collect(),
        invariant: check_invariant(rhp),
    };
    debug!(
        "validation: {} uncovered states, {} partial goals, {} ordering violations, {} invariant violations",
        report.coverage.as_ref().map_or(0, |gap| gap.uncovered.len()),
        report.goal_coverage.len(),
        report.ordering.len(),
        report.invariant.len()
    );
    info!("validation {}", if report.is_sound() { "passed" } else { "failed" });
    report
}
