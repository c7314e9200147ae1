//! Regions: unions of polytopes sharing one proposition valuation.

use std::collections::BTreeMap;

use nalgebra::DVector;

use crate::polytope::Polytope;

/// Truth value of every tracked proposition, by name.
pub type Valuation = BTreeMap<String, bool>;

/// One abstraction cell: a finite union of polytopes with a constant valuation.
///
/// The polytopes of a region are kept pairwise interior-disjoint, so the volume of the region
/// is the sum of the volumes of its pieces.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    polytopes: Vec<Polytope>,
    valuation: Valuation,
}

impl Region {
    pub fn new(polytopes: Vec<Polytope>, valuation: Valuation) -> Self {
        Self { polytopes, valuation }
    }

    pub fn from_polytope(polytope: Polytope, valuation: Valuation) -> Self {
        Self::new(vec![polytope], valuation)
    }

    pub fn dim(&self) -> Option<usize> {
        self.polytopes.first().map(|p| p.dim())
    }
    pub fn polytopes(&self) -> &[Polytope] {
        &self.polytopes
    }
    pub fn valuation(&self) -> &Valuation {
        &self.valuation
    }

    /// Truth value of a proposition in this region.
    pub fn holds(&self, prop: &str) -> Option<bool> {
        self.valuation.get(prop).copied()
    }

    /// Propositions that are true in this region.
    pub fn true_props(&self) -> impl Iterator<Item = &str> {
        self.valuation.iter().filter(|(_, v)| **v).map(|(k, _)| k.as_str())
    }

    pub fn volume(&self) -> f64 {
        union_volume(&self.polytopes)
    }

    /// A region is empty when none of its pieces has an interior.
    pub fn is_empty(&self) -> bool {
        !self.polytopes.iter().any(|p| p.is_full_dim())
    }

    pub fn contains(&self, x: &DVector<f64>) -> bool {
        self.polytopes.iter().any(|p| p.contains(x))
    }

    /// A point inside the region, taken from the largest piece.
    pub fn interior_point(&self) -> Option<DVector<f64>> {
        self.polytopes
            .iter()
            .filter_map(|p| p.chebyshev_ball().ok().flatten())
            .max_by(|(r1, _), (r2, _)| r1.total_cmp(r2))
            .filter(|(r, _)| *r > crate::polytope::ABS_TOL)
            .map(|(_, c)| c)
    }

    pub fn intersect(&self, other: &[Polytope]) -> Vec<Polytope> {
        intersect_union(&self.polytopes, other)
    }

    pub fn diff(&self, other: &[Polytope]) -> Vec<Polytope> {
        diff_union(&self.polytopes, other)
    }

    pub fn is_subset(&self, other: &[Polytope]) -> bool {
        is_subset_union(&self.polytopes, other)
    }
}

/// Pairwise intersections with an interior.
pub fn intersect_union(lhs: &[Polytope], rhs: &[Polytope]) -> Vec<Polytope> {
    let mut out = Vec::new();
    for p in lhs {
        for q in rhs {
            let r = p.intersect(q);
            if r.is_full_dim() {
                out.push(r.reduce());
            }
        }
    }
    out
}

/// `lhs \ rhs` as interior-disjoint full-dimensional pieces.
pub fn diff_union(lhs: &[Polytope], rhs: &[Polytope]) -> Vec<Polytope> {
    let mut out = Vec::new();
    for p in lhs {
        let mut pieces = vec![p.clone()];
        for q in rhs {
            pieces = pieces.iter().flat_map(|piece| piece.diff(q)).collect();
            if pieces.is_empty() {
                break;
            }
        }
        out.extend(pieces);
    }
    out
}

/// Check `∪lhs ⊆ ∪rhs` up to a boundary set.
pub fn is_subset_union(lhs: &[Polytope], rhs: &[Polytope]) -> bool {
    diff_union(lhs, rhs).is_empty()
}

/// Rewrite a possibly overlapping union as interior-disjoint pieces.
pub fn make_disjoint(pieces: Vec<Polytope>) -> Vec<Polytope> {
    let mut out: Vec<Polytope> = Vec::new();
    for p in pieces.into_iter().filter(|p| p.is_full_dim()) {
        let fresh = diff_union(&[p], &out);
        out.extend(fresh);
    }
    out
}

/// Volume of an interior-disjoint union.
pub fn union_volume(pieces: &[Polytope]) -> f64 {
    pieces.iter().map(|p| p.volume()).sum()
}
