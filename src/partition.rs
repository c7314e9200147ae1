//! Proposition-preserving partitions of the continuous domain.
//!
//! A [`Partition`] owns its cells in a [`CellArena`]. Refinement never edits a cell in place:
//! the parent is retired and its pieces receive fresh ids, so an id held from an earlier round
//! can be checked with [`Partition::is_live`] instead of silently aliasing a different cell.

use log::{debug, info};
use nalgebra::DVector;

use crate::arena::{CellArena, CellId};
use crate::dynamics::PwaSys;
use crate::error::{ConfigError, Error, Result};
use crate::polytope::Polytope;
use crate::prop::Propositions;
use crate::region::{diff_union, intersect_union, Region, Valuation};

/// One abstraction cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub region: Region,
    /// Active PWA subsystem, once assigned by [`pwa_partition`].
    pub subsystem: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Partition {
    domain: Polytope,
    props: Propositions,
    cells: CellArena<Cell>,
}

impl Partition {
    /// Build the coarsest proposition-preserving partition of `domain`.
    ///
    /// Starting from the whole domain, every cell is split against each proposition in turn
    /// into its true part and its false part; pieces without interior are dropped. Cells come
    /// out in a deterministic order: for each proposition, the true part precedes the false part.
    pub fn from_propositions(domain: Polytope, props: Propositions) -> Result<Self> {
        if props.dim() != domain.dim() {
            return Err(Error::dimension("propositions", domain.dim(), props.dim()));
        }
        if !domain.is_full_dim() {
            return Err(ConfigError::EmptyDomain.into());
        }

        let mut regions = vec![Region::from_polytope(domain.reduce(), Valuation::new())];
        for (name, true_set) in props.iter() {
            let mut next = Vec::with_capacity(regions.len() * 2);
            for region in &regions {
                let inside = region.intersect(true_set);
                let outside = region.diff(true_set);
                for (pieces, value) in [(inside, true), (outside, false)] {
                    if pieces.is_empty() {
                        continue;
                    }
                    let mut valuation = region.valuation().clone();
                    valuation.insert(name.to_string(), value);
                    next.push(Region::new(pieces, valuation));
                }
            }
            debug!("proposition '{}': {} -> {} regions", name, regions.len(), next.len());
            regions = next;
        }

        let mut cells = CellArena::new();
        for region in regions {
            cells.alloc(Cell { region, subsystem: None });
        }
        info!("proposition-preserving partition with {} cells", cells.len());

        Ok(Self { domain, props, cells })
    }

    pub fn domain(&self) -> &Polytope {
        &self.domain
    }
    pub fn propositions(&self) -> &Propositions {
        &self.props
    }
    pub fn dim(&self) -> usize {
        self.domain.dim()
    }
    pub fn len(&self) -> usize {
        self.cells.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Refinement round of this partition. Changes whenever cells are split.
    pub fn generation(&self) -> u32 {
        self.cells.generation()
    }

    pub fn is_live(&self, id: CellId) -> bool {
        self.cells.is_live(id)
    }

    /// Live cell ids in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells.ids()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellId, &Cell)> + '_ {
        self.cells.iter()
    }

    pub fn cell(&self, id: CellId) -> Result<&Cell> {
        self.cells.get(id).ok_or(Error::Configuration(ConfigError::UnknownCell(id)))
    }

    pub fn region(&self, id: CellId) -> Result<&Region> {
        self.cell(id).map(|c| &c.region)
    }

    /// First live cell containing `x`.
    pub fn find_cell(&self, x: &DVector<f64>) -> Option<CellId> {
        self.cells
            .iter()
            .find(|(_, cell)| cell.region.contains(x))
            .map(|(id, _)| id)
    }

    /// Replace a cell by its pieces. Returns the fresh ids.
    pub(crate) fn split(&mut self, id: CellId, pieces: Vec<Region>) -> Vec<CellId> {
        let subsystem = self.cells[id].subsystem;
        self.cells.retire(id);
        let children: Vec<CellId> = pieces
            .into_iter()
            .map(|region| self.cells.alloc(Cell { region, subsystem }))
            .collect();
        debug!("split {} into {:?}", id, children);
        children
    }

    /// Close a refinement round.
    pub(crate) fn advance(&mut self) {
        self.cells.advance();
    }

    /// Split every cell along an axis-aligned grid with the given cell widths.
    ///
    /// Valuations are inherited. Cells already inside a single grid box keep their id.
    pub fn refine_grid(mut self, widths: &[f64]) -> Result<Self> {
        if widths.len() != self.dim() {
            return Err(Error::dimension("grid widths", self.dim(), widths.len()));
        }
        if widths.iter().any(|w| !(w.is_finite() && *w > 0.0)) {
            return Err(ConfigError::InvalidOption {
                reason: "grid widths must be positive".to_string(),
            }
            .into());
        }
        let (lo, hi) = self.domain.bounding_box()?;

        let axes: Vec<Vec<(f64, f64)>> = (0..self.dim())
            .map(|k| grid_cuts(lo[k], hi[k], widths[k]))
            .collect::<Result<_>>()?;
        let boxes = grid_boxes(&axes);

        let ids: Vec<CellId> = self.ids().collect();
        for id in ids {
            let region = self.cells[id].region.clone();
            let pieces: Vec<Region> = boxes
                .iter()
                .map(|b| region.intersect(std::slice::from_ref(b)))
                .filter(|ps| !ps.is_empty())
                .map(|ps| Region::new(ps, region.valuation().clone()))
                .collect();
            if pieces.len() > 1 {
                self.split(id, pieces);
            }
        }
        self.advance();
        info!("grid refinement: {} cells", self.len());
        Ok(self)
    }

    /// Check that the cells cover the domain up to a boundary set.
    pub fn covers_domain(&self) -> bool {
        let all: Vec<Polytope> = self
            .cells
            .iter()
            .flat_map(|(_, c)| c.region.polytopes().iter().cloned())
            .collect();
        diff_union(&[self.domain.clone()], &all).is_empty()
    }

    /// Check that no two cells share interior points.
    pub fn is_interior_disjoint(&self) -> bool {
        let cells: Vec<&Cell> = self.cells.iter().map(|(_, c)| c).collect();
        for (i, a) in cells.iter().enumerate() {
            for b in &cells[i + 1..] {
                if !intersect_union(a.region.polytopes(), b.region.polytopes()).is_empty() {
                    return false;
                }
            }
        }
        true
    }
}

/// Consecutive intervals of width `w` covering `[lo, hi]`, the last one possibly shorter.
fn grid_cuts(lo: f64, hi: f64, w: f64) -> Result<Vec<(f64, f64)>> {
    let mut cuts = Vec::new();
    let mut start = lo;
    while start < hi - 1e-9 {
        let end = (start + w).min(hi);
        if end <= start {
            return Err(ConfigError::InvalidOption {
                reason: format!("grid width {} vanishes at coordinate {}", w, start),
            }
            .into());
        }
        cuts.push((start, end));
        start = end;
    }
    Ok(cuts)
}

/// Cartesian product of per-axis intervals, as boxes in lexicographic order.
fn grid_boxes(axes: &[Vec<(f64, f64)>]) -> Vec<Polytope> {
    let mut ranges: Vec<(Vec<f64>, Vec<f64>)> = vec![(Vec::new(), Vec::new())];
    for axis in axes {
        let mut next = Vec::with_capacity(ranges.len() * axis.len());
        for (lo, hi) in &ranges {
            for &(a, b) in axis {
                let mut lo = lo.clone();
                let mut hi = hi.clone();
                lo.push(a);
                hi.push(b);
                next.push((lo, hi));
            }
        }
        ranges = next;
    }
    ranges.into_iter().map(|(lo, hi)| Polytope::from_box(&lo, &hi)).collect()
}

/// Proposition-preserving partition, see [`Partition::from_propositions`].
pub fn prop_preserving_partition(domain: Polytope, props: Propositions) -> Result<Partition> {
    Partition::from_propositions(domain, props)
}

/// Intersect every cell with every PWA subdomain and tag the pieces with their subsystem.
///
/// Fails with a configuration error if the PWA subdomains do not partition the domain.
pub fn pwa_partition(mut partition: Partition, pwa: &PwaSys) -> Result<Partition> {
    if pwa.state_dim() != partition.dim() {
        return Err(Error::dimension("PWA system", partition.dim(), pwa.state_dim()));
    }
    // Re-validate: the system may have been built against a different domain.
    let subdomains: Vec<Polytope> = pwa.subsystems().iter().map(|s| s.domain().clone()).collect();
    let gap = diff_union(&[partition.domain.clone()], &subdomains);
    if !gap.is_empty() {
        return Err(ConfigError::PwaDomainGap {
            uncovered_volume: crate::region::union_volume(&gap),
        }
        .into());
    }

    let ids: Vec<CellId> = partition.ids().collect();
    for id in ids {
        let region = partition.cells[id].region.clone();
        let retired = partition.cells.retire(id);
        debug_assert!(retired);
        for (index, sub) in subdomains.iter().enumerate() {
            let pieces = region.intersect(std::slice::from_ref(sub));
            if !pieces.is_empty() {
                partition.cells.alloc(Cell {
                    region: Region::new(pieces, region.valuation().clone()),
                    subsystem: Some(index),
                });
            }
        }
    }
    partition.advance();
    info!("PWA partition: {} cells over {} subsystems", partition.len(), subdomains.len());
    Ok(partition)
}
