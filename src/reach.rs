//! One-step robust controllable predecessors.
//!
//! For a source polytope `S`, a target polytope `T` and dynamics `x⁺ = Ax + Bu + Ed + K`, the
//! set of pairs `(x, u)` with `x ∈ S`, `u ∈ U` and `x⁺ ∈ T` for every `d ∈ D` is the polytope
//!
//! ```text
//! [ Hs    0  ]  [x]     [ hs                 ]
//! [ 0     Hu ]  [u]  ≤  [ hu                 ]
//! [ HtA   HtB]          [ ht - HtK - w(Ht E) ]
//! ```
//!
//! where `w` holds the support of each row of `Ht E` over `D`. Projecting it onto `x` gives the
//! states that can be steered into `T`; projecting onto `u` gives the controls that do it for
//! some state.

use log::trace;
use nalgebra::DVector;

use crate::dynamics::LtiSys;
use crate::error::GeometryError;
use crate::polytope::Polytope;
use crate::region::{make_disjoint, Region};

/// States of the source that can be driven into the target, and controls witnessing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Predecessor {
    /// Interior-disjoint pieces inside the source region.
    pub states: Vec<Polytope>,
    /// Controls used by at least one of those states.
    pub controls: Vec<Polytope>,
}

impl Predecessor {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn volume(&self) -> f64 {
        crate::region::union_volume(&self.states)
    }
}

/// Constraints on `x⁺` turned into constraints on `(x, u)`, tightened by the disturbance.
fn target_rows(target: &Polytope, sys: &LtiSys) -> Result<Vec<(Vec<f64>, f64)>, GeometryError> {
    let n = sys.state_dim();
    let m = sys.input_dim();
    let mut rows = Vec::with_capacity(target.num_constraints());
    for (h, g) in target.rows() {
        let h = DVector::from_vec(h);
        let ha = sys.a().tr_mul(&h);
        let hb = sys.b().tr_mul(&h);
        let mut rhs = g - h.dot(sys.k());
        if let (Some(e), Some(d)) = (sys.e(), sys.disturbance_set()) {
            rhs -= d.support(&e.tr_mul(&h))?;
        }
        let mut row = Vec::with_capacity(n + m);
        row.extend(ha.iter());
        row.extend(hb.iter());
        rows.push((row, rhs));
    }
    Ok(rows)
}

fn lift_input(sys: &LtiSys) -> Vec<(Vec<f64>, f64)> {
    let n = sys.state_dim();
    sys.input_set()
        .rows()
        .into_iter()
        .map(|(h, g)| {
            let mut row = vec![0.0; n];
            row.extend(h);
            (row, g)
        })
        .collect()
}

/// Lifted `(x, u)` polytope for one source/target pair.
pub(crate) fn lifted(source: &Polytope, target: &Polytope, sys: &LtiSys) -> Result<Polytope, GeometryError> {
    let n = sys.state_dim();
    let m = sys.input_dim();
    let mut rows: Vec<(Vec<f64>, f64)> = source
        .rows()
        .into_iter()
        .map(|(mut h, g)| {
            h.resize(n + m, 0.0);
            (h, g)
        })
        .collect();
    rows.extend(lift_input(sys));
    rows.extend(target_rows(target, sys)?);
    Ok(Polytope::from_rows(n + m, rows))
}

/// Robust one-step predecessor of `target` inside `source`.
///
/// The result may be empty. LP failures are returned so that the caller can decide what a
/// failed pair means.
pub fn solve_feasible(source: &Region, target: &Region, sys: &LtiSys) -> Result<Predecessor, GeometryError> {
    let n = sys.state_dim();
    let m = sys.input_dim();
    let state_axes: Vec<usize> = (0..n).collect();
    let input_axes: Vec<usize> = (n..n + m).collect();

    let mut states = Vec::new();
    let mut controls = Vec::new();
    for s in source.polytopes() {
        for t in target.polytopes() {
            let joint = lifted(s, t, sys)?;
            if joint.chebyshev_ball()?.is_none() {
                continue;
            }
            let pre = joint.project(&state_axes);
            if pre.is_full_dim() {
                states.push(pre.reduce());
                controls.push(joint.project(&input_axes).reduce());
            }
        }
    }
    trace!("predecessor: {} state pieces, {} control pieces", states.len(), controls.len());

    Ok(Predecessor {
        states: make_disjoint(states),
        controls,
    })
}

/// Controls in `U` that move the specific state `x` into `target` for every disturbance.
pub fn feasible_inputs(x: &DVector<f64>, target: &Polytope, sys: &LtiSys) -> Result<Polytope, GeometryError> {
    let n = sys.state_dim();
    let m = sys.input_dim();
    let mut rows: Vec<(Vec<f64>, f64)> = sys.input_set().rows();
    for (row, rhs) in target_rows(target, sys)? {
        let shift: f64 = row[..n].iter().zip(x.iter()).map(|(h, xi)| h * xi).sum();
        rows.push((row[n..n + m].to_vec(), rhs - shift));
    }
    Ok(Polytope::from_rows(m, rows))
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::region::Valuation;
    use nalgebra::DMatrix;

    fn integrator() -> LtiSys {
        LtiSys::new(
            DMatrix::identity(1, 1),
            DMatrix::identity(1, 1),
            None,
            Polytope::from_box(&[-1.0], &[1.0]),
            Polytope::from_box(&[0.0], &[6.0]),
        )
        .unwrap()
    }

    fn interval(lo: f64, hi: f64) -> Region {
        Region::from_polytope(Polytope::from_box(&[lo], &[hi]), Valuation::new())
    }

    #[test]
    fn test_adjacent_cells_fully_controllable() {
        let pre = solve_feasible(&interval(0.0, 1.0), &interval(1.0, 2.0), &integrator()).unwrap();
        assert!((pre.volume() - 1.0).abs() < 1e-6);
        assert_eq!(pre.controls.len(), 1);
    }

    #[test]
    fn test_partially_controllable() {
        // From [0,3] only [2,3] reaches [3,6] with |u| <= 1.
        let pre = solve_feasible(&interval(0.0, 3.0), &interval(3.0, 6.0), &integrator()).unwrap();
        assert!((pre.volume() - 1.0).abs() < 1e-6);
        let x = DVector::from_vec(vec![2.5]);
        assert!(pre.states.iter().any(|p| p.contains(&x)));
    }

    #[test]
    fn test_distant_cells_unreachable() {
        // Only the single point x = 1 reaches x = 2, which has no interior.
        let pre = solve_feasible(&interval(0.0, 1.0), &interval(2.0, 3.0), &integrator()).unwrap();
        assert!(pre.is_empty());
    }

    #[test]
    fn test_disturbance_shrinks_predecessor() {
        let sys = integrator()
            .with_disturbance(DMatrix::identity(1, 1), Polytope::from_box(&[-0.25], &[0.25]))
            .unwrap();
        let pre = solve_feasible(&interval(0.0, 3.0), &interval(3.0, 6.0), &sys).unwrap();
        assert!((pre.volume() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_feasible_inputs_for_state() {
        let us = feasible_inputs(&DVector::from_vec(vec![2.5]), &Polytope::from_box(&[3.0], &[6.0]), &integrator())
            .unwrap();
        let (lo, hi) = us.bounding_box().unwrap();
        assert!((lo[0] - 0.5).abs() < 1e-6);
        assert!((hi[0] - 1.0).abs() < 1e-6);
    }
}
