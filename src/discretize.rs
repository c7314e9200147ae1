//! Reachability refinement of a partition into a transition system.
//!
//! Each sweep evaluates the robust one-step predecessor of every target cell inside every
//! source cell. A pair falls into one of three cases:
//!
//! - the predecessor is (numerically) empty: no edge;
//! - it covers the source cell up to a remainder below [`DiscretizeConfig::min_cell_volume`]:
//!   edge, certified by the predecessor pieces while the cell is kept whole;
//! - it covers part of the source cell: the source cell is split in two.
//!
//! All pairs of a sweep read the same partition snapshot, so they are evaluated independently
//! (in parallel when [`DiscretizeConfig::parallel`] is set). Splits are committed between sweeps,
//! and only pairs touching a freshly allocated cell are recomputed in the next one.

use std::collections::HashMap;
use std::fmt;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::arena::CellId;
use crate::dynamics::{Dynamics, LtiSys};
use crate::error::{ConfigError, Error, GeometryError, Result};
use crate::partition::{pwa_partition, Partition};
use crate::polytope::Polytope;
use crate::reach::solve_feasible;
use crate::region::{union_volume, Region};
use crate::transys::{Edge, TransitionSystem};

/// Options of the refinement loop.
#[derive(Debug, Clone)]
pub struct DiscretizeConfig {
    /// Maximum number of committed refinement sweeps.
    pub max_iterations: usize,
    /// Pieces smaller than this are ignored instead of split off.
    pub min_cell_volume: f64,
    /// Evaluate the pairs of a sweep on the rayon thread pool.
    pub parallel: bool,
}

impl Default for DiscretizeConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            min_cell_volume: 1e-2,
            parallel: true,
        }
    }
}

impl DiscretizeConfig {
    fn validate(&self) -> Result<()> {
        if !(self.min_cell_volume.is_finite() && self.min_cell_volume >= 0.0) {
            return Err(ConfigError::InvalidOption {
                reason: format!("min_cell_volume must be finite and non-negative, got {}", self.min_cell_volume),
            }
            .into());
        }
        Ok(())
    }
}

/// Outcome of [`discretize`].
///
/// `converged == false` means the iteration budget ran out before a fixpoint was reached. The
/// transition system then only holds edges whose source cell is wholly controllable.
#[derive(Debug, Clone)]
pub struct DiscretizeResult {
    pub partition: Partition,
    pub ts: TransitionSystem,
    pub converged: bool,
    /// Number of committed sweeps.
    pub iterations: usize,
    /// Pairs whose LP failed and were treated as "no edge".
    pub geometry_failures: usize,
}

impl fmt::Display for DiscretizeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cells, {} edges after {} sweeps ({}), {} geometry failures",
            self.partition.len(),
            self.ts.num_edges(),
            self.iterations,
            if self.converged { "converged" } else { "not converged" },
            self.geometry_failures
        )
    }
}

#[derive(Debug, Clone)]
enum PairOutcome {
    NoEdge,
    Whole { witness: Vec<Polytope>, controls: Vec<Polytope> },
    Split { inside: Vec<Polytope>, outside: Vec<Polytope> },
    Failed(GeometryError),
}

fn evaluate(source: &Region, target: &Region, sys: &LtiSys, min_volume: f64) -> PairOutcome {
    let pre = match solve_feasible(source, target, sys) {
        Ok(pre) => pre,
        Err(e) => return PairOutcome::Failed(e),
    };
    if pre.is_empty() || pre.volume() < min_volume {
        return PairOutcome::NoEdge;
    }
    let outside = source.diff(&pre.states);
    if outside.is_empty() || union_volume(&outside) < min_volume {
        return PairOutcome::Whole {
            witness: pre.states,
            controls: pre.controls,
        };
    }
    PairOutcome::Split {
        inside: pre.states,
        outside,
    }
}

fn subsystem_of<'a>(partition: &Partition, dynamics: &'a Dynamics, id: CellId) -> Result<&'a LtiSys> {
    let index = partition.cell(id)?.subsystem.unwrap_or(0);
    dynamics.subsystem(index).ok_or_else(|| {
        ConfigError::InvalidOption {
            reason: format!("cell {} refers to missing subsystem {}", id, index),
        }
        .into()
    })
}

/// Refine `partition` under `dynamics` until every pair of cells is either connected by a
/// certified edge or provably disconnected.
///
/// For PWA dynamics the partition is first split along the subsystem domains, unless its cells
/// are already tagged. Only structural problems are errors; running out of iterations is
/// reported through [`DiscretizeResult::converged`].
pub fn discretize(partition: Partition, dynamics: &Dynamics, config: &DiscretizeConfig) -> Result<DiscretizeResult> {
    config.validate()?;
    if dynamics.state_dim() != partition.dim() {
        return Err(Error::dimension("dynamics state", partition.dim(), dynamics.state_dim()));
    }

    let mut partition = match dynamics {
        Dynamics::Pwa(pwa) if partition.iter().any(|(_, c)| c.subsystem.is_none()) => pwa_partition(partition, pwa)?,
        _ => partition,
    };

    let mut cache: HashMap<(CellId, CellId), PairOutcome> = HashMap::new();
    let mut iterations = 0;
    let converged = loop {
        let ids: Vec<CellId> = partition.ids().collect();
        let systems: HashMap<CellId, &LtiSys> = ids
            .iter()
            .map(|&id| subsystem_of(&partition, dynamics, id).map(|s| (id, s)))
            .collect::<Result<_>>()?;

        let pending: Vec<(CellId, CellId)> = ids
            .iter()
            .flat_map(|&i| ids.iter().map(move |&j| (i, j)))
            .filter(|pair| !cache.contains_key(pair))
            .collect();
        info!(
            "sweep {}: {} cells, {} pairs to evaluate ({} cached)",
            iterations,
            ids.len(),
            pending.len(),
            cache.len()
        );

        let run = |&(i, j): &(CellId, CellId)| -> Result<((CellId, CellId), PairOutcome)> {
            let source = &partition.cell(i)?.region;
            let target = &partition.cell(j)?.region;
            let outcome = evaluate(source, target, systems[&i], config.min_cell_volume);
            debug!("pair ({}, {}): {}", i, j, outcome_name(&outcome));
            Ok(((i, j), outcome))
        };
        let results: Vec<((CellId, CellId), PairOutcome)> = if config.parallel {
            pending.par_iter().map(run).collect::<Result<_>>()?
        } else {
            pending.iter().map(run).collect::<Result<_>>()?
        };
        for ((i, j), outcome) in results {
            if let PairOutcome::Failed(e) = &outcome {
                warn!("pair ({}, {}) failed ({}), treating it as disconnected", i, j, e);
            }
            cache.insert((i, j), outcome);
        }

        // At most one split per source cell: the first target in cell order.
        let mut splits: Vec<(CellId, Vec<Polytope>, Vec<Polytope>)> = Vec::new();
        for &i in &ids {
            let first = ids.iter().find_map(|&j| match &cache[&(i, j)] {
                PairOutcome::Split { inside, outside } => Some((inside.clone(), outside.clone())),
                _ => None,
            });
            if let Some((inside, outside)) = first {
                splits.push((i, inside, outside));
            }
        }

        if splits.is_empty() {
            break true;
        }
        if iterations >= config.max_iterations {
            warn!(
                "refinement stopped after {} sweeps with {} pending splits",
                iterations,
                splits.len()
            );
            break false;
        }

        for (id, inside, outside) in splits {
            let valuation = partition.cell(id)?.region.valuation().clone();
            partition.split(
                id,
                vec![Region::new(inside, valuation.clone()), Region::new(outside, valuation)],
            );
        }
        partition.advance();
        cache.retain(|(i, j), _| partition.is_live(*i) && partition.is_live(*j));
        iterations += 1;
    };

    let mut geometry_failures = 0;
    let mut edges = Vec::new();
    for ((from, to), outcome) in &cache {
        match outcome {
            PairOutcome::Whole { witness, controls } => edges.push(Edge {
                from: *from,
                to: *to,
                witness: witness.clone(),
                controls: controls.clone(),
            }),
            PairOutcome::Failed(_) => geometry_failures += 1,
            PairOutcome::NoEdge | PairOutcome::Split { .. } => {}
        }
    }

    let ts = TransitionSystem::new(&partition, edges)?;
    let result = DiscretizeResult {
        partition,
        ts,
        converged,
        iterations,
        geometry_failures,
    };
    info!("discretization done: {}", result);
    Ok(result)
}

fn outcome_name(outcome: &PairOutcome) -> &'static str {
    match outcome {
        PairOutcome::NoEdge => "no edge",
        PairOutcome::Whole { .. } => "whole",
        PairOutcome::Split { .. } => "split",
        PairOutcome::Failed(_) => "failed",
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::prop::Propositions;
    use nalgebra::{DMatrix, DVector};

    fn integrator() -> Dynamics {
        LtiSys::new(
            DMatrix::identity(1, 1),
            DMatrix::identity(1, 1),
            None,
            Polytope::from_box(&[-1.0], &[1.0]),
            Polytope::from_box(&[0.0], &[6.0]),
        )
        .unwrap()
        .into()
    }

    fn halves() -> Partition {
        let props = Propositions::new(1)
            .with("right", vec![Polytope::from_box(&[3.0], &[6.0])])
            .unwrap();
        Partition::from_propositions(Polytope::from_box(&[0.0], &[6.0]), props).unwrap()
    }

    #[test]
    fn test_grid_is_a_fixpoint() {
        let part = halves().refine_grid(&[1.0]).unwrap();
        let result = discretize(part, &integrator(), &DiscretizeConfig::default()).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.partition.len(), 6);
        // Self-loops plus both directions between neighbours.
        assert_eq!(result.ts.num_edges(), 6 + 2 * 5);
    }

    #[test]
    fn test_refines_until_fixpoint() {
        let config = DiscretizeConfig {
            parallel: false,
            ..Default::default()
        };
        let result = discretize(halves(), &integrator(), &config).unwrap();
        assert!(result.converged);
        assert!(result.iterations > 0);
        assert!(result.partition.len() > 2);
        assert!(result.partition.covers_domain());
        assert!(result.partition.is_interior_disjoint());
        // Valuations survive refinement.
        for (_, cell) in result.partition.iter() {
            let x = cell.region.interior_point().unwrap();
            assert_eq!(cell.region.holds("right"), Some(x[0] >= 3.0));
        }
    }

    #[test]
    fn test_zero_budget_keeps_partition() {
        let config = DiscretizeConfig {
            max_iterations: 0,
            ..Default::default()
        };
        let part = halves();
        let ids: Vec<_> = part.ids().collect();
        let result = discretize(part, &integrator(), &config).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.partition.ids().collect::<Vec<_>>(), ids);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let seq = DiscretizeConfig {
            parallel: false,
            ..Default::default()
        };
        let a = discretize(halves(), &integrator(), &seq).unwrap();
        let b = discretize(halves(), &integrator(), &DiscretizeConfig::default()).unwrap();
        assert_eq!(a.partition.len(), b.partition.len());
        assert_eq!(a.ts.num_edges(), b.ts.num_edges());
    }

    #[test]
    fn test_whole_edge_witness_leaves_out_the_remainder() {
        // [0, 1.005] reaches (1.005, 6] only from x >= 0.005; the remainder is too small to split.
        let props = Propositions::new(1)
            .with("left", vec![Polytope::from_box(&[0.0], &[1.005])])
            .unwrap();
        let part = Partition::from_propositions(Polytope::from_box(&[0.0], &[6.0]), props).unwrap();
        let config = DiscretizeConfig {
            max_iterations: 0,
            ..Default::default()
        };
        let result = discretize(part, &integrator(), &config).unwrap();
        let left = result.partition.find_cell(&DVector::from_vec(vec![0.5])).unwrap();
        let right = result.partition.find_cell(&DVector::from_vec(vec![3.0])).unwrap();

        let edge = result.ts.edge(left, right).unwrap();
        assert!((union_volume(&edge.witness) - 1.0).abs() < 1e-6);
        assert!(!edge.witness.iter().any(|p| p.contains(&DVector::from_vec(vec![0.0]))));
        // The source cell itself is not split.
        assert!((result.partition.region(left).unwrap().volume() - 1.005).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_bad_options() {
        let config = DiscretizeConfig {
            min_cell_volume: f64::NAN,
            ..Default::default()
        };
        assert!(discretize(halves(), &integrator(), &config).unwrap_err().is_configuration());
    }
}
