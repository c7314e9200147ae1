//! Finite transition systems over partition cells.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::arena::CellId;
use crate::error::{ConfigError, Error, Result};
use crate::formula::Formula;
use crate::partition::Partition;
use crate::polytope::Polytope;
use crate::region::Region;
use crate::spec::{GrSpec, VarDomain};

/// Name of the discrete location variable in exported specifications.
pub const LOC: &str = "loc";

/// A certified transition `from → to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: CellId,
    pub to: CellId,
    /// Part of the source cell from which the target is reachable.
    pub witness: Vec<Polytope>,
    /// Controls valid for the witness.
    pub controls: Vec<Polytope>,
}

/// Directed graph over the cells of one partition generation.
///
/// The system is immutable: refining the partition produces a new one, see
/// [`TransitionSystem::check_current`].
#[derive(Debug, Clone)]
pub struct TransitionSystem {
    generation: u32,
    states: Vec<CellId>,
    regions: BTreeMap<CellId, Region>,
    props: Vec<String>,
    edges: BTreeMap<(CellId, CellId), Edge>,
}

impl TransitionSystem {
    /// Build a transition system over all live cells of `partition`.
    ///
    /// Fails if an edge mentions a cell that is not live.
    pub fn new(partition: &Partition, edges: impl IntoIterator<Item = Edge>) -> Result<Self> {
        let states: Vec<CellId> = partition.ids().collect();
        let regions = partition
            .iter()
            .map(|(id, cell)| (id, cell.region.clone()))
            .collect::<BTreeMap<_, _>>();
        let mut map = BTreeMap::new();
        for edge in edges {
            for id in [edge.from, edge.to] {
                if !regions.contains_key(&id) {
                    return Err(ConfigError::UnknownCell(id).into());
                }
            }
            map.insert((edge.from, edge.to), edge);
        }
        Ok(Self {
            generation: partition.generation(),
            states,
            regions,
            props: partition.propositions().names().map(str::to_string).collect(),
            edges: map,
        })
    }

    /// Partition generation this system was built for.
    pub fn generation(&self) -> u32 {
        self.generation
    }
    pub fn states(&self) -> &[CellId] {
        &self.states
    }
    pub fn num_states(&self) -> usize {
        self.states.len()
    }
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }
    pub fn propositions(&self) -> &[String] {
        &self.props
    }

    /// Value of the location variable for a state.
    pub fn position(&self, id: CellId) -> Option<usize> {
        self.states.iter().position(|&s| s == id)
    }

    pub fn region(&self, id: CellId) -> Option<&Region> {
        self.regions.get(&id)
    }

    /// Propositions true in a state.
    pub fn label(&self, id: CellId) -> BTreeSet<&str> {
        self.regions
            .get(&id)
            .map(|r| r.true_props().collect())
            .unwrap_or_default()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge(&self, from: CellId, to: CellId) -> Option<&Edge> {
        self.edges.get(&(from, to))
    }

    pub fn has_edge(&self, from: CellId, to: CellId) -> bool {
        self.edges.contains_key(&(from, to))
    }

    pub fn successors(&self, id: CellId) -> impl Iterator<Item = CellId> + '_ {
        self.edges.range((id, CellId::new(0))..=(id, CellId::new(u32::MAX))).map(|(&(_, to), _)| to)
    }

    pub fn predecessors(&self, id: CellId) -> impl Iterator<Item = CellId> + '_ {
        self.edges.keys().filter(move |(_, to)| *to == id).map(|&(from, _)| from)
    }

    /// Fail unless this system was built from the current state of `partition`.
    pub fn check_current(&self, partition: &Partition) -> Result<()> {
        let same = partition.generation() == self.generation
            && partition.len() == self.states.len()
            && self.states.iter().all(|&id| partition.is_live(id));
        if same {
            Ok(())
        } else {
            Err(Error::StaleTransitionSystem {
                built_for: self.generation,
                current: partition.generation(),
            })
        }
    }

    /// Location formula `loc ∈ ids`.
    pub fn loc_in(&self, ids: impl IntoIterator<Item = CellId>) -> Formula {
        Formula::var_in(LOC, ids.into_iter().filter_map(|id| self.position(id)).map(|p| p as i64))
    }

    /// Specification fragment stating that the system moves along the graph.
    ///
    /// The location variable `loc` ranges over state positions. Each proposition is declared as
    /// a system variable tied to the locations whose cell satisfies it.
    pub fn to_spec(&self) -> GrSpec {
        let mut spec = GrSpec::new();
        let max = self.states.len().saturating_sub(1) as i64;
        spec.sys_vars.insert(LOC.to_string(), VarDomain::Int { min: 0, max });
        for p in &self.props {
            spec.sys_vars.insert(p.clone(), VarDomain::Bool);
        }

        for (pos, &id) in self.states.iter().enumerate() {
            let next = self.loc_in(self.successors(id)).next();
            spec.sys_safety.push(Formula::var_eq(LOC, pos as i64).implies(next));
        }

        for p in &self.props {
            let cells = self
                .states
                .iter()
                .copied()
                .filter(|id| self.regions[id].holds(p) == Some(true));
            let labeling = Formula::atom(p.as_str()).iff(self.loc_in(cells));
            spec.sys_init.push(labeling.clone());
            spec.sys_safety.push(labeling);
        }
        spec
    }
}

impl fmt::Display for TransitionSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "TransitionSystem(generation = {}, {} states, {} edges)",
            self.generation,
            self.num_states(),
            self.num_edges()
        )?;
        for &id in &self.states {
            let succ: Vec<String> = self.successors(id).map(|s| s.to_string()).collect();
            let label: Vec<&str> = self.label(id).into_iter().collect();
            writeln!(f, "  {} {{{}}} -> [{}]", id, label.join(", "), succ.join(", "))?;
        }
        Ok(())
    }
}
