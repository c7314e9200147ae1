//! Convex polytopes in H-representation.
//!
//! A [`Polytope`] is the set `{ x : Ax ≤ b }`. Rows are kept normalized to unit length, so
//! `b` reads as a signed distance and one absolute tolerance ([`ABS_TOL`]) is meaningful
//! for every constraint. Polytopes are immutable; every operation returns a new value.
//!
//! Empty and lower-dimensional polytopes are ordinary values:
//! - [`Polytope::is_empty`] holds when no point satisfies all constraints,
//! - [`Polytope::is_full_dim`] holds when a ball of radius larger than [`ABS_TOL`] fits inside.
//!
//! All LP work goes through [`crate::lp`].

use std::fmt;

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{ConfigError, Error, GeometryError, Result};
use crate::lp;

/// Absolute geometric tolerance.
pub const ABS_TOL: f64 = 1e-7;

/// Radius cap for Chebyshev balls of unbounded polytopes.
const MAX_RADIUS: f64 = 1e6;
/// Sample count for Monte Carlo volume estimation in three or more dimensions.
const VOLUME_SAMPLES: usize = 20_000;
const VOLUME_SEED: u64 = 0x5eed_cafe;

#[derive(Debug, Clone, PartialEq)]
pub struct Polytope {
    a: DMatrix<f64>,
    b: DVector<f64>,
}

impl Polytope {
    /// Create the polytope `{ x : Ax ≤ b }`.
    ///
    /// Fails on shape mismatch or non-finite data.
    pub fn new(a: DMatrix<f64>, b: DVector<f64>) -> Result<Self> {
        if a.nrows() != b.len() {
            return Err(Error::dimension("polytope rhs", a.nrows(), b.len()));
        }
        if a.ncols() == 0 {
            return Err(ConfigError::InvalidOption {
                reason: "polytope must have at least one dimension".to_string(),
            }
            .into());
        }
        if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidOption {
                reason: "polytope has non-finite coefficients".to_string(),
            }
            .into());
        }
        let dim = a.ncols();
        let rows = (0..a.nrows())
            .map(|i| (a.row(i).iter().copied().collect(), b[i]))
            .collect();
        Ok(Self::from_rows(dim, rows))
    }

    /// Axis-aligned box `lo ≤ x ≤ hi`.
    pub fn from_box(lo: &[f64], hi: &[f64]) -> Self {
        assert_eq!(lo.len(), hi.len(), "Box bounds must have equal length");
        assert!(!lo.is_empty(), "Box must have at least one dimension");
        let dim = lo.len();
        let mut rows = Vec::with_capacity(2 * dim);
        for k in 0..dim {
            let mut up = vec![0.0; dim];
            up[k] = 1.0;
            rows.push((up, hi[k]));
            let mut down = vec![0.0; dim];
            down[k] = -1.0;
            rows.push((down, -lo[k]));
        }
        Self::from_rows(dim, rows)
    }

    /// The canonical empty polytope of the given dimension.
    pub fn empty(dim: usize) -> Self {
        Self {
            a: DMatrix::zeros(1, dim),
            b: DVector::from_element(1, -1.0),
        }
    }

    /// Build from raw rows, normalizing each and dropping trivially true ones.
    pub(crate) fn from_rows(dim: usize, rows: Vec<(Vec<f64>, f64)>) -> Self {
        let mut kept: Vec<(Vec<f64>, f64)> = Vec::with_capacity(rows.len());
        for (a, b) in rows {
            debug_assert_eq!(a.len(), dim);
            let norm = a.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm < 1e-12 {
                if b < -ABS_TOL {
                    return Self::empty(dim);
                }
                continue;
            }
            let a: Vec<f64> = a.iter().map(|v| v / norm).collect();
            let b = b / norm;
            // Parallel duplicates: keep the tighter one.
            match kept
                .iter_mut()
                .find(|(k, _)| k.iter().zip(a.iter()).all(|(x, y)| (x - y).abs() < 1e-9))
            {
                Some(existing) => existing.1 = existing.1.min(b),
                None => kept.push((a, b)),
            }
        }
        let m = kept.len();
        let mut am = DMatrix::zeros(m, dim);
        let mut bm = DVector::zeros(m);
        for (i, (a, b)) in kept.into_iter().enumerate() {
            for (j, v) in a.into_iter().enumerate() {
                am[(i, j)] = v;
            }
            bm[i] = b;
        }
        Self { a: am, b: bm }
    }

    pub(crate) fn rows(&self) -> Vec<(Vec<f64>, f64)> {
        (0..self.a.nrows())
            .map(|i| (self.a.row(i).iter().copied().collect(), self.b[i]))
            .collect()
    }

    pub fn dim(&self) -> usize {
        self.a.ncols()
    }
    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }
    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }
    pub fn num_constraints(&self) -> usize {
        self.a.nrows()
    }

    /// Check whether `x` satisfies all constraints up to [`ABS_TOL`].
    pub fn contains(&self, x: &DVector<f64>) -> bool {
        assert_eq!(x.len(), self.dim(), "Point dimension must match polytope dimension");
        let ax = &self.a * x;
        ax.iter().zip(self.b.iter()).all(|(l, r)| *l <= r + ABS_TOL)
    }

    /// Check whether `x` lies strictly inside, at least `margin` away from every facet.
    pub fn contains_strictly(&self, x: &DVector<f64>, margin: f64) -> bool {
        let ax = &self.a * x;
        ax.iter().zip(self.b.iter()).all(|(l, r)| *l < r - margin)
    }

    /// Largest inscribed ball, as `(radius, center)`; `None` for an empty polytope.
    ///
    /// Radius is capped at a large constant for unbounded polytopes.
    pub fn chebyshev_ball(&self) -> std::result::Result<Option<(f64, DVector<f64>)>, GeometryError> {
        let n = self.dim();
        let m = self.num_constraints();
        let mut a = DMatrix::zeros(m + 2, n + 1);
        let mut b = DVector::zeros(m + 2);
        for i in 0..m {
            let row = self.a.row(i);
            for j in 0..n {
                a[(i, j)] = row[j];
            }
            a[(i, n)] = row.norm();
            b[i] = self.b[i];
        }
        a[(m, n)] = -1.0;
        a[(m + 1, n)] = 1.0;
        b[m + 1] = MAX_RADIUS;

        let mut c = DVector::zeros(n + 1);
        c[n] = 1.0;
        match lp::maximize(&c, &a, &b) {
            Ok(sol) => {
                let center = sol.x.rows(0, n).clone_owned();
                // A zero-radius ball must still sit on the polytope.
                if !self.contains(&center) {
                    debug!("chebyshev centre violates the constraints, polytope is empty");
                    return Ok(None);
                }
                Ok(Some((sol.x[n].max(0.0), center)))
            }
            Err(GeometryError::Infeasible) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// A point well inside the polytope, if there is one.
    pub fn interior_point(&self) -> Option<DVector<f64>> {
        match self.chebyshev_ball() {
            Ok(Some((r, c))) if r > ABS_TOL => Some(c),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self.chebyshev_ball() {
            Ok(ball) => ball.is_none(),
            Err(e) => {
                warn!("emptiness test failed ({}), treating polytope as empty", e);
                true
            }
        }
    }

    /// Check whether the polytope has a nonempty interior.
    pub fn is_full_dim(&self) -> bool {
        match self.chebyshev_ball() {
            Ok(Some((r, _))) => r > ABS_TOL,
            Ok(None) => false,
            Err(e) => {
                warn!("full-dimensionality test failed ({}), treating polytope as degenerate", e);
                false
            }
        }
    }

    pub fn intersect(&self, other: &Polytope) -> Polytope {
        assert_eq!(self.dim(), other.dim(), "Intersected polytopes must have equal dimension");
        let mut rows = self.rows();
        rows.extend(other.rows());
        Self::from_rows(self.dim(), rows)
    }

    /// Maximum of `dir · x` over the polytope.
    pub fn support(&self, dir: &DVector<f64>) -> std::result::Result<f64, GeometryError> {
        lp::maximize(dir, &self.a, &self.b).map(|sol| sol.objective)
    }

    /// Remove redundant constraints.
    pub fn reduce(&self) -> Polytope {
        if self.is_empty() {
            return Self::empty(self.dim());
        }
        let rows = self.rows();
        let mut keep = vec![true; rows.len()];
        for i in 0..rows.len() {
            // Row i is redundant if it cannot be violated under the other kept rows. The
            // relaxed copy of row i keeps the LP bounded.
            let mut sub: Vec<(Vec<f64>, f64)> = rows
                .iter()
                .enumerate()
                .filter(|(k, _)| *k != i && keep[*k])
                .map(|(_, r)| r.clone())
                .collect();
            sub.push((rows[i].0.clone(), rows[i].1 + 1.0));
            let (a, b) = to_matrices(self.dim(), &sub);
            let dir = DVector::from_vec(rows[i].0.clone());
            if let Ok(sol) = lp::maximize(&dir, &a, &b) {
                if sol.objective <= rows[i].1 + ABS_TOL {
                    keep[i] = false;
                }
            }
        }
        let kept = rows
            .into_iter()
            .zip(keep)
            .filter(|(_, k)| *k)
            .map(|(r, _)| r)
            .collect();
        Self::from_rows(self.dim(), kept)
    }

    /// Per-axis lower and upper bounds.
    pub fn bounding_box(&self) -> std::result::Result<(DVector<f64>, DVector<f64>), GeometryError> {
        let n = self.dim();
        let mut lo = DVector::zeros(n);
        let mut hi = DVector::zeros(n);
        for k in 0..n {
            let mut e = DVector::zeros(n);
            e[k] = 1.0;
            hi[k] = lp::maximize(&e, &self.a, &self.b)?.objective;
            lo[k] = lp::solve(&e, &self.a, &self.b)?.objective;
        }
        Ok((lo, hi))
    }

    /// Enumerate vertices by solving every `n`-subset of constraints.
    ///
    /// Only meant for low dimensions and few constraints.
    pub fn vertices(&self) -> Vec<DVector<f64>> {
        let reduced = self.reduce();
        let n = reduced.dim();
        let m = reduced.num_constraints();
        let mut out: Vec<DVector<f64>> = Vec::new();
        if m < n {
            return out;
        }
        for subset in combinations(m, n) {
            let a = DMatrix::from_fn(n, n, |i, j| reduced.a[(subset[i], j)]);
            let b = DVector::from_fn(n, |i, _| reduced.b[subset[i]]);
            if a.determinant().abs() < 1e-12 {
                continue;
            }
            if let Some(x) = a.lu().solve(&b) {
                if reduced.contains(&x) && !out.iter().any(|v| (v - &x).norm() < 1e-9) {
                    out.push(x);
                }
            }
        }
        out
    }

    /// Volume of the polytope.
    ///
    /// Exact in one and two dimensions; a seeded Monte Carlo estimate otherwise, so repeated
    /// calls give identical results.
    pub fn volume(&self) -> f64 {
        if !self.is_full_dim() {
            return 0.0;
        }
        let (lo, hi) = match self.bounding_box() {
            Ok(bb) => bb,
            Err(GeometryError::Unbounded) => return f64::INFINITY,
            Err(e) => {
                warn!("bounding box failed ({}), reporting zero volume", e);
                return 0.0;
            }
        };
        match self.dim() {
            1 => hi[0] - lo[0],
            2 => polygon_area(self.vertices()),
            n => {
                let mut rng = ChaCha8Rng::seed_from_u64(VOLUME_SEED);
                let box_volume: f64 = (0..n).map(|k| hi[k] - lo[k]).product();
                let mut inside = 0usize;
                let mut x = DVector::zeros(n);
                for _ in 0..VOLUME_SAMPLES {
                    for k in 0..n {
                        x[k] = rng.gen_range(lo[k]..=hi[k]);
                    }
                    if self.contains(&x) {
                        inside += 1;
                    }
                }
                box_volume * inside as f64 / VOLUME_SAMPLES as f64
            }
        }
    }

    /// Set difference `self \ other` as interior-disjoint full-dimensional pieces.
    pub fn diff(&self, other: &Polytope) -> Vec<Polytope> {
        assert_eq!(self.dim(), other.dim(), "Polytope dimensions must match");
        if !self.is_full_dim() {
            return Vec::new();
        }
        if !self.intersect(other).is_full_dim() {
            return vec![self.clone()];
        }
        let cut = other.reduce();
        let mut pieces = Vec::new();
        let mut rest = self.clone();
        for (a, b) in cut.rows() {
            let flipped: Vec<f64> = a.iter().map(|v| -v).collect();
            let outside = rest.intersect(&Self::from_rows(self.dim(), vec![(flipped, -b)]));
            if outside.is_full_dim() {
                pieces.push(outside.reduce());
            }
            rest = rest.intersect(&Self::from_rows(self.dim(), vec![(a, b)]));
            if !rest.is_full_dim() {
                break;
            }
        }
        pieces
    }

    /// Check `self ⊆ other`.
    pub fn is_subset(&self, other: &Polytope) -> bool {
        assert_eq!(self.dim(), other.dim(), "Polytope dimensions must match");
        if self.is_empty() {
            return true;
        }
        for (a, b) in other.rows() {
            match self.support(&DVector::from_vec(a)) {
                Ok(s) if s <= b + ABS_TOL => {}
                _ => return false,
            }
        }
        true
    }

    /// Project onto the coordinates listed in `keep` (in that order), eliminating the rest
    /// by Fourier–Motzkin elimination.
    pub fn project(&self, keep: &[usize]) -> Polytope {
        let n = self.dim();
        assert!(keep.iter().all(|&k| k < n), "Projection coordinates out of range");
        if self.is_empty() {
            return Self::empty(keep.len());
        }

        let mut current = self.reduce();
        let mut coords: Vec<usize> = (0..n).collect();
        for k in (0..n).rev() {
            if keep.contains(&k) {
                continue;
            }
            let pos = coords.iter().position(|&c| c == k).expect("coordinate is present");
            let rows = eliminate(&current.rows(), pos);
            coords.remove(pos);
            current = Self::from_rows(coords.len(), rows).reduce();
            debug!("eliminated x{}: {} constraints remain", k, current.num_constraints());
        }

        // Reorder columns to match `keep`.
        let order: Vec<usize> = keep
            .iter()
            .map(|k| coords.iter().position(|c| c == k).expect("kept coordinate is present"))
            .collect();
        let rows = current
            .rows()
            .into_iter()
            .map(|(a, b)| (order.iter().map(|&j| a[j]).collect(), b))
            .collect();
        Self::from_rows(keep.len(), rows)
    }
}

impl fmt::Display for Polytope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Polytope(dim = {}, {} constraints)", self.dim(), self.num_constraints())?;
        for i in 0..self.num_constraints() {
            let row: Vec<String> = self.a.row(i).iter().map(|v| format!("{:+.4}", v)).collect();
            writeln!(f, "  [{}] x <= {:.4}", row.join(" "), self.b[i])?;
        }
        Ok(())
    }
}

/// Fourier–Motzkin elimination of column `k`.
fn eliminate(rows: &[(Vec<f64>, f64)], k: usize) -> Vec<(Vec<f64>, f64)> {
    let drop_k = |a: &[f64]| -> Vec<f64> {
        a.iter()
            .enumerate()
            .filter(|(j, _)| *j != k)
            .map(|(_, v)| *v)
            .collect()
    };
    let mut pos = Vec::new();
    let mut neg = Vec::new();
    let mut out = Vec::new();
    for (a, b) in rows {
        if a[k] > 1e-12 {
            pos.push((a, b));
        } else if a[k] < -1e-12 {
            neg.push((a, b));
        } else {
            out.push((drop_k(a), *b));
        }
    }
    for (ap, bp) in &pos {
        for (aq, bq) in &neg {
            let sp = 1.0 / ap[k];
            let sq = -1.0 / aq[k];
            let combined: Vec<f64> = ap.iter().zip(aq.iter()).map(|(x, y)| x * sp + y * sq).collect();
            out.push((drop_k(&combined), *bp * sp + *bq * sq));
        }
    }
    out
}

pub(crate) fn to_matrices(dim: usize, rows: &[(Vec<f64>, f64)]) -> (DMatrix<f64>, DVector<f64>) {
    let a = DMatrix::from_fn(rows.len(), dim, |i, j| rows[i].0[j]);
    let b = DVector::from_fn(rows.len(), |i, _| rows[i].1);
    (a, b)
}

/// All `k`-subsets of `0..n` in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(k);
    fn go(start: usize, n: usize, k: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            go(i + 1, n, k, current, out);
            current.pop();
        }
    }
    go(0, n, k, &mut current, &mut out);
    out
}

/// Area of a convex polygon given by its (unordered) vertices.
fn polygon_area(mut vertices: Vec<DVector<f64>>) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let count = vertices.len() as f64;
    let cx = vertices.iter().map(|v| v[0]).sum::<f64>() / count;
    let cy = vertices.iter().map(|v| v[1]).sum::<f64>() / count;
    vertices.sort_by(|p, q| {
        let ap = (p[1] - cy).atan2(p[0] - cx);
        let aq = (q[1] - cy).atan2(q[0] - cx);
        ap.total_cmp(&aq)
    });
    let mut twice = 0.0;
    for i in 0..vertices.len() {
        let p = &vertices[i];
        let q = &vertices[(i + 1) % vertices.len()];
        twice += p[0] * q[1] - q[0] * p[1];
    }
    twice.abs() / 2.0
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn unit_square() -> Polytope {
        Polytope::from_box(&[0.0, 0.0], &[1.0, 1.0])
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_new_rejects_mismatch() {
        let a = DMatrix::from_row_slice(2, 1, &[1.0, -1.0]);
        let b = DVector::from_vec(vec![1.0]);
        let err = Polytope::new(a, b).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_rows_are_normalized() {
        let a = DMatrix::from_row_slice(1, 2, &[3.0, 4.0]);
        let b = DVector::from_vec(vec![10.0]);
        let p = Polytope::new(a, b).unwrap();
        assert!(close(p.a()[(0, 0)], 0.6));
        assert!(close(p.b()[0], 2.0));
    }

    #[test]
    fn test_contains() {
        let p = unit_square();
        assert!(p.contains(&DVector::from_vec(vec![0.5, 0.5])));
        assert!(p.contains(&DVector::from_vec(vec![1.0, 0.0])));
        assert!(!p.contains(&DVector::from_vec(vec![1.5, 0.5])));
    }

    #[test]
    fn test_chebyshev_ball() {
        let p = Polytope::from_box(&[0.0, 0.0], &[2.0, 4.0]);
        let (r, c) = p.chebyshev_ball().unwrap().unwrap();
        assert!(close(r, 1.0));
        assert!(close(c[0], 1.0));
    }

    #[test]
    fn test_empty_and_degenerate() {
        let empty = Polytope::from_box(&[1.0], &[0.0]);
        assert!(empty.is_empty());
        assert!(!empty.is_full_dim());

        let point = Polytope::from_box(&[1.0], &[1.0]);
        assert!(!point.is_empty());
        assert!(!point.is_full_dim());
        assert_eq!(point.volume(), 0.0);

        assert!(Polytope::empty(3).is_empty());
    }

    #[test]
    fn test_nearly_empty_box_is_empty() {
        let sliver = Polytope::from_box(&[1.0], &[0.995]);
        assert!(sliver.is_empty());
        assert_eq!(sliver.chebyshev_ball().unwrap(), None);
        // The empty set sits inside anything.
        assert!(sliver.is_subset(&Polytope::from_box(&[5.0], &[6.0])));

        let flat = Polytope::from_box(&[0.0, 2.0], &[1.0, 1.999]);
        assert!(flat.is_empty());
    }

    #[test]
    fn test_intersect() {
        let p = Polytope::from_box(&[0.0, 0.0], &[2.0, 2.0]);
        let q = Polytope::from_box(&[1.0, 1.0], &[3.0, 3.0]);
        let r = p.intersect(&q);
        assert!(close(r.volume(), 1.0));
    }

    #[test]
    fn test_reduce_drops_redundant_rows() {
        let mut rows = unit_square().rows();
        rows.push((vec![1.0, 1.0], 5.0));
        let p = Polytope::from_rows(2, rows);
        assert_eq!(p.num_constraints(), 5);
        assert_eq!(p.reduce().num_constraints(), 4);
    }

    #[test]
    fn test_volume_1d_2d() {
        assert!(close(Polytope::from_box(&[0.0], &[6.0]).volume(), 6.0));
        let triangle = Polytope::from_rows(
            2,
            vec![(vec![-1.0, 0.0], 0.0), (vec![0.0, -1.0], 0.0), (vec![1.0, 1.0], 1.0)],
        );
        assert!(close(triangle.volume(), 0.5));
    }

    #[test]
    fn test_volume_3d_is_deterministic() {
        let cube = Polytope::from_box(&[0.0, 0.0, 0.0], &[1.0, 2.0, 1.0]);
        let v1 = cube.volume();
        let v2 = cube.volume();
        assert_eq!(v1, v2);
        assert!((v1 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_diff() {
        let p = Polytope::from_box(&[0.0, 0.0], &[3.0, 3.0]);
        let q = Polytope::from_box(&[1.0, 1.0], &[2.0, 2.0]);
        let pieces = p.diff(&q);
        let total: f64 = pieces.iter().map(|x| x.volume()).sum();
        assert!(close(total, 8.0));
        for (i, a) in pieces.iter().enumerate() {
            assert!(!a.intersect(&q).is_full_dim());
            for b in &pieces[i + 1..] {
                assert!(!a.intersect(b).is_full_dim());
            }
        }
    }

    #[test]
    fn test_diff_disjoint_and_covering() {
        let p = Polytope::from_box(&[0.0], &[1.0]);
        let far = Polytope::from_box(&[5.0], &[6.0]);
        assert_eq!(p.diff(&far), vec![p.clone()]);
        let big = Polytope::from_box(&[-1.0], &[2.0]);
        assert!(p.diff(&big).is_empty());
    }

    #[test]
    fn test_subset() {
        let p = Polytope::from_box(&[0.0, 0.0], &[1.0, 1.0]);
        let q = Polytope::from_box(&[-1.0, -1.0], &[2.0, 2.0]);
        assert!(p.is_subset(&q));
        assert!(!q.is_subset(&p));
        assert!(Polytope::empty(2).is_subset(&p));
    }

    #[test]
    fn test_project() {
        // Triangle 0 ≤ y ≤ x ≤ 1 projects to 0 ≤ x ≤ 1 and 0 ≤ y ≤ 1.
        let t = Polytope::from_rows(
            2,
            vec![(vec![0.0, -1.0], 0.0), (vec![-1.0, 1.0], 0.0), (vec![1.0, 0.0], 1.0)],
        );
        let px = t.project(&[0]);
        let (lo, hi) = px.bounding_box().unwrap();
        assert!(close(lo[0], 0.0) && close(hi[0], 1.0));
        let py = t.project(&[1]);
        let (lo, hi) = py.bounding_box().unwrap();
        assert!(close(lo[0], 0.0) && close(hi[0], 1.0));
    }

    #[test]
    fn test_project_keeps_order() {
        let b = Polytope::from_box(&[0.0, 10.0, 20.0], &[1.0, 11.0, 22.0]);
        let p = b.project(&[2, 0]);
        let (lo, hi) = p.bounding_box().unwrap();
        assert!(close(lo[0], 20.0) && close(hi[0], 22.0));
        assert!(close(lo[1], 0.0) && close(hi[1], 1.0));
    }

    #[test]
    fn test_vertices() {
        let v = unit_square().vertices();
        assert_eq!(v.len(), 4);
    }
}
