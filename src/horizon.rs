//! Receding-horizon decomposition.
//!
//! For every goal, the states of a transition system are layered by graph distance to the goal:
//! `W0` holds the goal states and `Wj` the states with an edge into `W(j-1)` that are not in
//! any lower layer. Each nonempty layer becomes one short-horizon problem whose progress
//! objective is its successor layer `F(Wj) = W(j-1)`, with `F(W0) = W0`.

use std::collections::BTreeSet;
use std::fmt;

use log::{debug, info, warn};

use crate::arena::CellId;
use crate::error::{ConfigError, Result};
use crate::formula::Formula;
use crate::polytope::Polytope;
use crate::region::is_subset_union;
use crate::spec::GrSpec;
use crate::transys::TransitionSystem;

/// A named goal `ψ`, a propositional formula over the transition system's labels.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalSpec {
    pub name: String,
    pub goal: Formula,
}

impl GoalSpec {
    pub fn new(name: impl Into<String>, goal: Formula) -> Self {
        Self { name: name.into(), goal }
    }
}

/// A state condition, given either propositionally or as a set of continuous states.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Formula(Formula),
    /// Union of polytopes in the continuous state space.
    Set(Vec<Polytope>),
}

impl Condition {
    /// Check whether the condition holds in a whole abstract state.
    ///
    /// `None` when a formula cannot be evaluated on the state's labels.
    pub fn holds_in(&self, ts: &TransitionSystem, id: CellId) -> Option<bool> {
        match self {
            Condition::Formula(f) => holds(ts, id, f),
            Condition::Set(set) => ts.region(id).map(|r| r.is_subset(set)),
        }
    }

    /// The condition as a formula over labels and locations.
    pub fn as_formula(&self, ts: &TransitionSystem) -> Formula {
        match self {
            Condition::Formula(f) => f.clone(),
            Condition::Set(_) => {
                let cells = ts.states().iter().copied().filter(|&id| self.holds_in(ts, id) == Some(true));
                ts.loc_in(cells)
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Formula(phi) => write!(f, "{}", phi),
            Condition::Set(set) => write!(f, "<set of {} polytopes>", set.len()),
        }
    }
}

/// Evaluate a propositional formula in an abstract state.
pub(crate) fn holds(ts: &TransitionSystem, id: CellId, formula: &Formula) -> Option<bool> {
    let region = ts.region(id)?;
    let pos = ts.position(id)? as i64;
    formula.eval_with(
        &|p| region.holds(p),
        &|var, k| (var == crate::transys::LOC).then_some(k == pos),
    )
}

/// Options of [`decompose`].
#[derive(Debug, Clone, Default)]
pub struct DecomposeConfig {
    /// States left out of every layer and of coverage checks.
    pub excluded: BTreeSet<CellId>,
    /// Only states satisfying this formula may be placed outside the goal layer.
    pub safe: Option<Formula>,
}

/// Distance layers towards one goal.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalPoset {
    pub name: String,
    pub goal: Formula,
    /// `layers[0]` is the goal layer.
    pub layers: Vec<BTreeSet<CellId>>,
    /// `successor[j]` is the index of `F(Wj)`.
    pub successor: Vec<usize>,
    /// Non-excluded states in no layer.
    pub unassigned: BTreeSet<CellId>,
}

impl GoalPoset {
    pub fn layer_of(&self, id: CellId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.contains(&id))
    }
}

/// One short-horizon problem: reach `F(Wj)` from `Wj` while keeping `Φ`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortHorizonProblem {
    /// Index of the goal poset.
    pub goal: usize,
    pub layer: usize,
    /// `Wj`.
    pub states: BTreeSet<CellId>,
    /// Index of `F(Wj)` in the goal poset.
    pub successor: usize,
    /// States of `F(Wj)`.
    pub target: BTreeSet<CellId>,
    /// The invariant `Φ` as a formula over labels and locations.
    pub phi: Formula,
    /// Parent fragments exactly as given: variables, environment assumptions, system safety and
    /// system progress.
    pub inherited: GrSpec,
    spec: GrSpec,
}

impl ShortHorizonProblem {
    /// Specification to hand to the game solver.
    ///
    /// Starts in `Wj ∧ Φ`, keeps `Φ` and the inherited safety, and must visit `F(Wj)`. The
    /// parent's `sys_init` and `sys_prog` are not part of it: the initial condition becomes
    /// `loc ∈ Wj ∧ Φ` and progress is replaced by `loc ∈ F(Wj)`. Both remain available in
    /// [`ShortHorizonProblem::inherited`].
    pub fn to_spec(&self) -> GrSpec {
        self.spec.clone()
    }
}

/// A long-horizon objective broken into short-horizon problems.
#[derive(Debug, Clone)]
pub struct RecedingHorizonProblem {
    ts: TransitionSystem,
    spec: GrSpec,
    phi: Condition,
    init: Condition,
    excluded: BTreeSet<CellId>,
    posets: Vec<GoalPoset>,
    problems: Vec<ShortHorizonProblem>,
}

impl RecedingHorizonProblem {
    /// Assemble a problem from already computed posets.
    ///
    /// [`decompose`] is the usual way to obtain one; this constructor accepts any layering, which
    /// the validator then checks.
    pub fn from_parts(
        ts: TransitionSystem,
        spec: GrSpec,
        phi: Condition,
        init: Condition,
        excluded: BTreeSet<CellId>,
        posets: Vec<GoalPoset>,
    ) -> Self {
        let phi_formula = phi.as_formula(&ts);
        let mut problems = Vec::new();
        for (g, poset) in posets.iter().enumerate() {
            for (j, states) in poset.layers.iter().enumerate() {
                if states.is_empty() {
                    continue;
                }
                let successor = poset.successor.get(j).copied().unwrap_or(j);
                let target = poset.layers.get(successor).cloned().unwrap_or_default();

                let mut sub = ts.to_spec();
                sub.merge(GrSpec {
                    sys_init: Vec::new(),
                    sys_prog: Vec::new(),
                    ..spec.clone()
                });
                sub.sys_init.push(ts.loc_in(states.iter().copied()));
                sub.sys_init.push(phi_formula.clone());
                sub.sys_safety.push(phi_formula.clone());
                sub.sys_prog.push(ts.loc_in(target.iter().copied()));

                problems.push(ShortHorizonProblem {
                    goal: g,
                    layer: j,
                    states: states.clone(),
                    successor,
                    target,
                    phi: phi_formula.clone(),
                    inherited: spec.clone(),
                    spec: sub,
                });
            }
        }
        Self {
            ts,
            spec,
            phi,
            init,
            excluded,
            posets,
            problems,
        }
    }

    pub fn transition_system(&self) -> &TransitionSystem {
        &self.ts
    }
    pub fn spec(&self) -> &GrSpec {
        &self.spec
    }
    pub fn phi(&self) -> &Condition {
        &self.phi
    }
    pub fn init(&self) -> &Condition {
        &self.init
    }
    pub fn excluded(&self) -> &BTreeSet<CellId> {
        &self.excluded
    }
    pub fn posets(&self) -> &[GoalPoset] {
        &self.posets
    }
    pub fn problems(&self) -> &[ShortHorizonProblem] {
        &self.problems
    }

    /// The short-horizon problem to solve when at `id`, heading for goal `goal`.
    pub fn problem_for(&self, goal: usize, id: CellId) -> Option<&ShortHorizonProblem> {
        self.problems.iter().find(|p| p.goal == goal && p.states.contains(&id))
    }
}

fn check_formula(ts: &TransitionSystem, what: &str, formula: &Formula) -> Result<()> {
    if !formula.is_propositional() {
        return Err(ConfigError::InvalidOption {
            reason: format!("{} must be propositional, got {}", what, formula),
        }
        .into());
    }
    for atom in formula.atoms() {
        if !ts.propositions().contains(&atom) {
            return Err(ConfigError::MalformedProposition {
                name: atom,
                reason: format!("used in {} but not a label of the transition system", what),
            }
            .into());
        }
    }
    Ok(())
}

/// Layer the states of `ts` by distance to each goal.
///
/// `spec` supplies the environment assumptions and system safety inherited by every
/// short-horizon problem. A state that reaches no goal is left unassigned and reported
/// by the validator, not here.
pub fn decompose(
    ts: &TransitionSystem,
    spec: &GrSpec,
    goals: &[GoalSpec],
    phi: Condition,
    init: Condition,
    config: &DecomposeConfig,
) -> Result<RecedingHorizonProblem> {
    for goal in goals {
        check_formula(ts, "goal", &goal.goal)?;
    }
    if let Some(safe) = &config.safe {
        check_formula(ts, "safe", safe)?;
    }
    for cond in [&phi, &init] {
        if let Condition::Formula(f) = cond {
            check_formula(ts, "condition", f)?;
        }
    }
    if let Some(&id) = config.excluded.iter().find(|&&id| ts.position(id).is_none()) {
        return Err(ConfigError::UnknownCell(id).into());
    }

    let candidates: BTreeSet<CellId> = ts
        .states()
        .iter()
        .copied()
        .filter(|id| !config.excluded.contains(id))
        .collect();
    let safe: BTreeSet<CellId> = candidates
        .iter()
        .copied()
        .filter(|&id| match &config.safe {
            Some(f) => holds(ts, id, f) == Some(true),
            None => true,
        })
        .collect();

    let mut posets = Vec::with_capacity(goals.len());
    for goal in goals {
        let w0: BTreeSet<CellId> = candidates
            .iter()
            .copied()
            .filter(|&id| holds(ts, id, &goal.goal) == Some(true))
            .collect();
        let mut assigned = w0.clone();
        let mut layers = vec![w0];
        loop {
            let previous = &layers[layers.len() - 1];
            let next: BTreeSet<CellId> = previous
                .iter()
                .flat_map(|&t| ts.predecessors(t))
                .filter(|id| safe.contains(id) && !assigned.contains(id))
                .collect();
            if next.is_empty() {
                break;
            }
            debug!("goal '{}': layer {} has {} states", goal.name, layers.len(), next.len());
            assigned.extend(next.iter().copied());
            layers.push(next);
        }

        let successor = (0..layers.len()).map(|j| j.saturating_sub(1)).collect();
        let unassigned: BTreeSet<CellId> = candidates.difference(&assigned).copied().collect();
        if !unassigned.is_empty() {
            warn!("goal '{}': {} states reach no layer", goal.name, unassigned.len());
        }
        info!("goal '{}': {} layers", goal.name, layers.len());
        posets.push(GoalPoset {
            name: goal.name.clone(),
            goal: goal.goal.clone(),
            layers,
            successor,
            unassigned,
        });
    }

    Ok(RecedingHorizonProblem::from_parts(
        ts.clone(),
        spec.clone(),
        phi,
        init,
        config.excluded.clone(),
        posets,
    ))
}
