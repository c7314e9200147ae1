//! Dense linear programming.
//!
//! Solves `min cᵀx  s.t.  Ax ≤ b` over free variables with a two-phase tableau simplex.
//! Pivoting follows Bland's rule, which rules out cycling on degenerate vertices; the problems
//! fed in by the polytope layer are small (a few dozen rows), so a dense tableau is adequate.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::error::GeometryError;

/// Pivot tolerance.
const EPS: f64 = 1e-10;
/// Phase-one residual accepted as feasible, relative to the rows that needed an artificial.
const FEAS_TOL: f64 = 1e-9;
/// Hard cap on simplex pivots per phase.
const MAX_PIVOTS: usize = 50_000;

#[derive(Debug, Clone)]
pub struct LpSolution {
    pub x: DVector<f64>,
    pub objective: f64,
}

struct Tableau {
    /// Constraint rows; the last column holds the right-hand side.
    t: DMatrix<f64>,
    /// Basic variable of each row.
    basis: Vec<usize>,
    /// Reduced costs; the last entry holds the negated objective value.
    r: DVector<f64>,
}

impl Tableau {
    fn cols(&self) -> usize {
        self.t.ncols() - 1
    }

    fn price(&mut self, cost: &DVector<f64>) {
        let cols = self.cols();
        let mut r = DVector::zeros(cols + 1);
        for j in 0..cols {
            r[j] = cost[j];
        }
        for (i, &bv) in self.basis.iter().enumerate() {
            let cb = cost[bv];
            if cb != 0.0 {
                for j in 0..=cols {
                    r[j] -= cb * self.t[(i, j)];
                }
            }
        }
        self.r = r;
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let p = self.t[(row, col)];
        {
            let mut pr = self.t.row_mut(row);
            pr /= p;
        }
        let pivot_row = self.t.row(row).clone_owned();
        for i in 0..self.t.nrows() {
            if i != row {
                let f = self.t[(i, col)];
                if f != 0.0 {
                    let mut ri = self.t.row_mut(i);
                    ri -= f * &pivot_row;
                }
            }
        }
        let f = self.r[col];
        if f != 0.0 {
            for j in 0..self.r.len() {
                self.r[j] -= f * pivot_row[j];
            }
        }
        self.basis[row] = col;
    }

    /// Run simplex iterations, letting only columns `< allowed` enter the basis.
    fn run(&mut self, allowed: usize) -> Result<f64, GeometryError> {
        let rhs = self.cols();
        for _ in 0..MAX_PIVOTS {
            let entering = (0..allowed).find(|&j| self.r[j] < -EPS);
            let Some(col) = entering else {
                return Ok(-self.r[rhs]);
            };

            let mut leaving: Option<(usize, f64)> = None;
            for i in 0..self.t.nrows() {
                let a = self.t[(i, col)];
                if a > EPS {
                    let ratio = self.t[(i, rhs)] / a;
                    leaving = match leaving {
                        None => Some((i, ratio)),
                        Some((k, best)) => {
                            if ratio < best - EPS || (ratio <= best + EPS && self.basis[i] < self.basis[k]) {
                                Some((i, ratio))
                            } else {
                                Some((k, best))
                            }
                        }
                    };
                }
            }
            match leaving {
                Some((row, _)) => self.pivot(row, col),
                None => return Err(GeometryError::Unbounded),
            }
        }
        Err(GeometryError::IterationLimit)
    }
}

/// Minimize `cᵀx` subject to `Ax ≤ b`.
pub fn solve(c: &DVector<f64>, a: &DMatrix<f64>, b: &DVector<f64>) -> Result<LpSolution, GeometryError> {
    let (m, n) = a.shape();
    assert_eq!(c.len(), n, "objective length must match the number of columns");
    assert_eq!(b.len(), m, "rhs length must match the number of rows");

    if c.iter().chain(a.iter()).chain(b.iter()).any(|v| !v.is_finite()) {
        return Err(GeometryError::NonFinite);
    }

    // Free variables are split as x = x⁺ - x⁻, every row gets a slack, and rows with a
    // negative rhs additionally get an artificial variable for phase one.
    let n_art = b.iter().filter(|&&v| v < 0.0).count();
    let first_art = 2 * n + m;
    let cols = first_art + n_art;

    let mut t = DMatrix::zeros(m, cols + 1);
    let mut basis = vec![0; m];
    let mut art = first_art;
    for i in 0..m {
        let sign = if b[i] < 0.0 { -1.0 } else { 1.0 };
        for j in 0..n {
            t[(i, j)] = sign * a[(i, j)];
            t[(i, n + j)] = -sign * a[(i, j)];
        }
        t[(i, 2 * n + i)] = sign;
        t[(i, cols)] = sign * b[i];
        if b[i] < 0.0 {
            t[(i, art)] = 1.0;
            basis[i] = art;
            art += 1;
        } else {
            basis[i] = 2 * n + i;
        }
    }

    let mut tab = Tableau {
        t,
        basis,
        r: DVector::zeros(cols + 1),
    };

    if n_art > 0 {
        let mut cost = DVector::zeros(cols);
        for j in first_art..cols {
            cost[j] = 1.0;
        }
        tab.price(&cost);
        let infeasibility = tab.run(cols)?;
        // The residual is relative to the rows that needed an artificial, not to loose caps.
        let scale = 1.0 + b.iter().filter(|&&v| v < 0.0).fold(0.0_f64, |acc, &v| acc.max(-v));
        if infeasibility > FEAS_TOL * scale {
            debug!("phase one ended with infeasibility {:.3e}", infeasibility);
            return Err(GeometryError::Infeasible);
        }
        // Drive remaining (zero-valued) artificials out of the basis where possible.
        for i in 0..m {
            if tab.basis[i] >= first_art {
                if let Some(j) = (0..first_art).find(|&j| tab.t[(i, j)].abs() > 1e-9) {
                    tab.pivot(i, j);
                }
            }
        }
    }

    let mut cost = DVector::zeros(cols);
    for j in 0..n {
        cost[j] = c[j];
        cost[n + j] = -c[j];
    }
    tab.price(&cost);
    let objective = tab.run(first_art)?;

    let mut x = DVector::zeros(n);
    for (i, &bv) in tab.basis.iter().enumerate() {
        let value = tab.t[(i, cols)];
        if bv < n {
            x[bv] += value;
        } else if bv < 2 * n {
            x[bv - n] -= value;
        }
    }

    Ok(LpSolution { x, objective })
}

/// Maximize `cᵀx` subject to `Ax ≤ b`.
pub fn maximize(c: &DVector<f64>, a: &DMatrix<f64>, b: &DVector<f64>) -> Result<LpSolution, GeometryError> {
    let sol = solve(&(-c), a, b)?;
    Ok(LpSolution {
        objective: -sol.objective,
        x: sol.x,
    })
}
