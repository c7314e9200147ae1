//! Continuous inputs realizing discrete transitions.
//!
//! An input sequence `u(0) .. u(N-1)` is found with one LP over the stacked inputs. The states
//! are eliminated through `x(k) = A^k x0 + Σ A^(k-1-i) (B u(i) + K)`, so every state constraint
//! becomes a row in `u`, tightened by the worst-case disturbance accumulated up to step `k`:
//!
//! ```text
//! x(1) .. x(N-1) ∈ P1,   x(N) ∈ P3,   u(k) ∈ U
//! ```
//!
//! The cost is `r·[x(1); ..; x(N)] + q Σ |u(k)|₁ + w |x(N) - xc|₁`, with `xc` the Chebyshev centre of
//! the target piece; absolute values go through auxiliary variables.

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use crate::arena::CellId;
use crate::dynamics::{Dynamics, LtiSys};
use crate::error::{ConfigError, Error, GeometryError, Result};
use crate::lp;
use crate::partition::Partition;
use crate::polytope::Polytope;
use crate::transys::TransitionSystem;

/// Options of [`get_input_sequence`].
#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// Number of steps `N` until the target must be reached.
    pub horizon: usize,
    /// Linear cost `r` on the stacked states `[x(1); ..; x(N)]`, zero when `None`.
    pub state_cost: Option<DVector<f64>>,
    /// Weight `q` of the input magnitude.
    pub input_weight: f64,
    /// Weight `w` pulling `x(N)` towards the centre of the target piece.
    pub mid_weight: f64,
    /// Keep `x(1) .. x(N-1)` inside the start cell. Otherwise they only have to stay in the
    /// partition domain.
    pub conservative: bool,
    /// Simulate the sequence without disturbance and discard it if it leaves the constraints.
    pub test_result: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            horizon: 1,
            state_cost: None,
            input_weight: 1.0,
            mid_weight: 3.0,
            conservative: true,
            test_result: true,
        }
    }
}

impl ControlConfig {
    fn validate(&self, n: usize) -> Result<()> {
        if self.horizon == 0 {
            return Err(ConfigError::InvalidOption {
                reason: "control horizon must be at least 1".to_string(),
            }
            .into());
        }
        for (name, w) in [("input_weight", self.input_weight), ("mid_weight", self.mid_weight)] {
            if !(w.is_finite() && w >= 0.0) {
                return Err(ConfigError::InvalidOption {
                    reason: format!("{} must be finite and non-negative, got {}", name, w),
                }
                .into());
            }
        }
        if let Some(r) = &self.state_cost {
            if r.len() != self.horizon * n {
                return Err(Error::dimension("state cost", self.horizon * n, r.len()));
            }
        }
        Ok(())
    }
}

/// Affine prediction `x(k) = free[k] + Σ_i gain[k][i] u(i)` for `k = 1..=N`.
struct Prediction {
    free: Vec<DVector<f64>>,
    /// `gain[k-1][i] = A^(k-1-i) B` for `i < k`.
    gain: Vec<Vec<DMatrix<f64>>>,
    /// `powers[j] = A^j`.
    powers: Vec<DMatrix<f64>>,
}

impl Prediction {
    fn new(x0: &DVector<f64>, sys: &LtiSys, horizon: usize) -> Self {
        let mut powers = vec![DMatrix::identity(sys.state_dim(), sys.state_dim())];
        for j in 1..horizon {
            powers.push(sys.a() * &powers[j - 1]);
        }
        let mut free = Vec::with_capacity(horizon);
        let mut x = x0.clone();
        for _ in 0..horizon {
            x = sys.a() * &x + sys.k();
            free.push(x.clone());
        }
        let gain = (1..=horizon)
            .map(|k| (0..k).map(|i| &powers[k - 1 - i] * sys.b()).collect())
            .collect();
        Self { free, gain, powers }
    }

    /// Worst case of `h · x(k)` over the disturbances of the first `k` steps.
    fn tightening(&self, h: &DVector<f64>, k: usize, sys: &LtiSys) -> std::result::Result<f64, GeometryError> {
        let (Some(e), Some(d)) = (sys.e(), sys.disturbance_set()) else {
            return Ok(0.0);
        };
        let mut total = 0.0;
        for power in &self.powers[..k] {
            total += d.support(&e.tr_mul(&power.tr_mul(h)))?;
        }
        Ok(total)
    }
}

/// Solve the input LP for one choice of stay set `P1` and target piece `P3`.
///
/// Returns `None` when the LP is infeasible.
fn solve_piece(
    x0: &DVector<f64>,
    sys: &LtiSys,
    stay: &Polytope,
    target: &Polytope,
    centre: &DVector<f64>,
    config: &ControlConfig,
) -> Result<Option<(f64, Vec<DVector<f64>>)>> {
    let n = sys.state_dim();
    let m = sys.input_dim();
    let horizon = config.horizon;
    let pred = Prediction::new(x0, sys, horizon);

    // Variables: inputs, then |u| bounds, then |x(N) - xc| bounds.
    let nu = horizon * m;
    let nv = 2 * nu + n;
    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut rhs: Vec<f64> = Vec::new();

    for k in 1..=horizon {
        let poly = if k < horizon { stay } else { target };
        for (h, g) in poly.rows() {
            let h = DVector::from_vec(h);
            let mut row = vec![0.0; nv];
            for (i, gain) in pred.gain[k - 1].iter().enumerate() {
                for (j, v) in gain.tr_mul(&h).iter().enumerate() {
                    row[i * m + j] = *v;
                }
            }
            rows.push(row);
            rhs.push(g - h.dot(&pred.free[k - 1]) - pred.tightening(&h, k, sys)?);
        }
    }
    for k in 0..horizon {
        for (h, g) in sys.input_set().rows() {
            let mut row = vec![0.0; nv];
            row[k * m..(k + 1) * m].copy_from_slice(&h);
            rows.push(row);
            rhs.push(g);
        }
    }
    for idx in 0..nu {
        for sign in [1.0, -1.0] {
            let mut row = vec![0.0; nv];
            row[idx] = sign;
            row[nu + idx] = -1.0;
            rows.push(row);
            rhs.push(0.0);
        }
    }
    let last = &pred.gain[horizon - 1];
    for axis in 0..n {
        for sign in [1.0, -1.0] {
            let mut row = vec![0.0; nv];
            for (i, gain) in last.iter().enumerate() {
                for j in 0..m {
                    row[i * m + j] = sign * gain[(axis, j)];
                }
            }
            row[2 * nu + axis] = -1.0;
            rows.push(row);
            rhs.push(sign * (centre[axis] - pred.free[horizon - 1][axis]));
        }
    }

    let mut cost = DVector::zeros(nv);
    let mut offset = 0.0;
    if let Some(r) = &config.state_cost {
        for k in 1..=horizon {
            let rk = r.rows((k - 1) * n, n).clone_owned();
            offset += rk.dot(&pred.free[k - 1]);
            for (i, gain) in pred.gain[k - 1].iter().enumerate() {
                for (j, v) in gain.tr_mul(&rk).iter().enumerate() {
                    cost[i * m + j] += *v;
                }
            }
        }
    }
    for idx in nu..2 * nu {
        cost[idx] = config.input_weight;
    }
    for idx in 2 * nu..nv {
        cost[idx] = config.mid_weight;
    }

    let a = DMatrix::from_row_iterator(rows.len(), nv, rows.into_iter().flatten());
    let b = DVector::from_vec(rhs);
    let sol = match lp::solve(&cost, &a, &b) {
        Ok(sol) => sol,
        Err(GeometryError::Infeasible) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let inputs = (0..horizon).map(|k| sol.x.rows(k * m, m).clone_owned()).collect();
    Ok(Some((sol.objective + offset, inputs)))
}

/// Compute an input sequence moving `x0` from cell `start` into cell `end` in
/// [`ControlConfig::horizon`] steps.
///
/// Every target polytope is tried and the cheapest feasible sequence is returned. The start
/// cell's subsystem is used for all steps.
pub fn get_input_sequence(
    x0: &DVector<f64>,
    dynamics: &Dynamics,
    partition: &Partition,
    ts: &TransitionSystem,
    start: CellId,
    end: CellId,
    config: &ControlConfig,
) -> Result<Vec<DVector<f64>>> {
    ts.check_current(partition)?;
    if x0.len() != partition.dim() {
        return Err(Error::dimension("initial state", partition.dim(), x0.len()));
    }
    config.validate(partition.dim())?;
    if !ts.has_edge(start, end) {
        return Err(Error::NoTransition { from: start, to: end });
    }

    let index = partition.cell(start)?.subsystem.unwrap_or(0);
    let sys = dynamics.subsystem(index).ok_or_else(|| {
        Error::from(ConfigError::InvalidOption {
            reason: format!("cell {} refers to missing subsystem {}", start, index),
        })
    })?;

    let stays: Vec<Polytope> = if config.conservative {
        let pieces = partition.region(start)?.polytopes();
        let holding: Vec<Polytope> = pieces.iter().filter(|p| p.contains(x0)).cloned().collect();
        if holding.is_empty() {
            pieces.to_vec()
        } else {
            holding
        }
    } else {
        vec![partition.domain().clone()]
    };

    let mut best: Option<(f64, Vec<DVector<f64>>)> = None;
    for target in partition.region(end)?.polytopes() {
        let Some((_, centre)) = target.chebyshev_ball()? else {
            continue;
        };
        for stay in &stays {
            let Some((cost, inputs)) = solve_piece(x0, sys, stay, target, &centre, config)? else {
                continue;
            };
            if !inputs.iter().all(|u| sys.input_set().contains(u)) {
                warn!("input sequence leaves the input set, discarding it");
                continue;
            }
            if config.test_result && !is_seq_inside(x0, &inputs, sys, stay, target) {
                warn!("input sequence fails the nominal simulation, discarding it");
                continue;
            }
            debug!("target piece reachable with cost {:.3e}", cost);
            if best.as_ref().map_or(true, |(c, _)| cost < *c) {
                best = Some((cost, inputs));
            }
        }
    }
    best.map(|(_, inputs)| inputs)
        .ok_or(Error::NoTrajectory { from: start, to: end })
}

/// Compute a control moving `x0` from cell `start` into cell `end` in one step, with the
/// default costs of [`ControlConfig`].
pub fn get_input(
    x0: &DVector<f64>,
    dynamics: &Dynamics,
    partition: &Partition,
    ts: &TransitionSystem,
    start: CellId,
    end: CellId,
) -> Result<DVector<f64>> {
    get_input_sequence(x0, dynamics, partition, ts, start, end, &ControlConfig::default())?
        .into_iter()
        .next()
        .ok_or(Error::NoTrajectory { from: start, to: end })
}

/// Simulate `u_seq` from `x0` without disturbance.
///
/// Returns `true` if every intermediate state lies in `p0` and the final state lies in `p1`.
/// An empty sequence never reaches `p1`.
pub fn is_seq_inside(x0: &DVector<f64>, u_seq: &[DVector<f64>], sys: &LtiSys, p0: &Polytope, p1: &Polytope) -> bool {
    let Some((last, init)) = u_seq.split_last() else {
        return false;
    };
    let mut x = x0.clone();
    let mut inside = true;
    for u in init {
        x = sys.step(&x, u, None);
        inside &= p0.contains(&x);
    }
    let xn = sys.step(&x, last, None);
    inside && p1.contains(&xn)
}
