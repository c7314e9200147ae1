//! Interface to an external GR(1) game solver.
//!
//! No solver is implemented here. A solver plugs in through [`GameSolver`] and reports one of
//! three ordinary outcomes; an unrealizable specification is not an error.

use std::collections::BTreeMap;
use std::fmt;

use log::info;

use crate::arena::CellId;
use crate::horizon::{RecedingHorizonProblem, ShortHorizonProblem};
use crate::spec::GrSpec;
use crate::transys::{TransitionSystem, LOC};

/// Values of specification variables. Booleans are encoded as 0 and 1.
pub type Assignment = BTreeMap<String, i64>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyNode {
    pub state: Assignment,
    /// Indices of successor nodes.
    pub successors: Vec<usize>,
}

/// Finite-memory winning strategy, as a graph of variable assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Strategy {
    pub nodes: Vec<StrategyNode>,
    pub initial: Vec<usize>,
}

impl Strategy {
    /// Location visited at a node, mapped back to the cell.
    pub fn cell_at(&self, ts: &TransitionSystem, node: usize) -> Option<CellId> {
        let loc = *self.nodes.get(node)?.state.get(LOC)?;
        usize::try_from(loc).ok().and_then(|pos| ts.states().get(pos).copied())
    }
}

/// Environment behaviour defeating every system strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counterexample {
    pub trace: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverOutcome {
    Strategy(Strategy),
    Counterexample(Counterexample),
    /// The solver could not decide, with its reason.
    Infeasible(String),
}

impl SolverOutcome {
    pub fn is_realizable(&self) -> bool {
        matches!(self, SolverOutcome::Strategy(_))
    }

    pub fn strategy(&self) -> Option<&Strategy> {
        match self {
            SolverOutcome::Strategy(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for SolverOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverOutcome::Strategy(s) => write!(f, "REALIZABLE ({} nodes)", s.nodes.len()),
            SolverOutcome::Counterexample(c) => write!(f, "UNREALIZABLE ({} steps)", c.trace.len()),
            SolverOutcome::Infeasible(reason) => write!(f, "UNKNOWN ({})", reason),
        }
    }
}

/// A GR(1) game solver.
pub trait GameSolver {
    fn solve(&self, spec: &GrSpec) -> SolverOutcome;
}

impl<F> GameSolver for F
where
    F: Fn(&GrSpec) -> SolverOutcome,
{
    fn solve(&self, spec: &GrSpec) -> SolverOutcome {
        self(spec)
    }
}

/// Solve `spec` over the moves allowed by `ts`.
pub fn synthesize<S: GameSolver + ?Sized>(solver: &S, ts: &TransitionSystem, spec: &GrSpec) -> SolverOutcome {
    let full = ts.to_spec() | spec.clone();
    let outcome = solver.solve(&full);
    info!("synthesis over {} states: {}", ts.num_states(), outcome);
    outcome
}

pub fn solve_short_horizon<S: GameSolver + ?Sized>(solver: &S, problem: &ShortHorizonProblem) -> SolverOutcome {
    solver.solve(&problem.to_spec())
}

/// Solve every short-horizon problem, in the order of [`RecedingHorizonProblem::problems`].
pub fn solve_receding_horizon<S: GameSolver + ?Sized>(solver: &S, rhp: &RecedingHorizonProblem) -> Vec<SolverOutcome> {
    rhp.problems()
        .iter()
        .map(|p| {
            let outcome = solve_short_horizon(solver, p);
            info!("goal {} layer {}: {}", p.goal, p.layer, outcome);
            outcome
        })
        .collect()
}
