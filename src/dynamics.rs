//! System dynamics.
//!
//! A single [`LtiSys`] describes
//!
//! ```text
//! x[t+1] = A x[t] + B u[t] + E d[t] + K,    u ∈ U,  d ∈ D,  x ∈ domain
//! ```
//!
//! and a [`PwaSys`] switches between several of them depending on which subdomain the state is in.

use std::fmt;

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::error::{ConfigError, Error, Result};
use crate::polytope::{Polytope, ABS_TOL};
use crate::region::{diff_union, union_volume};

/// Linear time-invariant system with bounded input and disturbance.
#[derive(Debug, Clone, PartialEq)]
pub struct LtiSys {
    a: DMatrix<f64>,
    b: DMatrix<f64>,
    e: Option<DMatrix<f64>>,
    k: DVector<f64>,
    input_set: Polytope,
    disturbance_set: Option<Polytope>,
    domain: Polytope,
}

impl LtiSys {
    /// Undisturbed system `x⁺ = Ax + Bu + K`.
    pub fn new(
        a: DMatrix<f64>,
        b: DMatrix<f64>,
        k: Option<DVector<f64>>,
        input_set: Polytope,
        domain: Polytope,
    ) -> Result<Self> {
        let n = a.nrows();
        if a.ncols() != n {
            return Err(Error::dimension("state matrix columns", n, a.ncols()));
        }
        if b.nrows() != n {
            return Err(Error::dimension("input matrix rows", n, b.nrows()));
        }
        if input_set.dim() != b.ncols() {
            return Err(Error::dimension("input set", b.ncols(), input_set.dim()));
        }
        if domain.dim() != n {
            return Err(Error::dimension("system domain", n, domain.dim()));
        }
        let k = k.unwrap_or_else(|| DVector::zeros(n));
        if k.len() != n {
            return Err(Error::dimension("affine offset", n, k.len()));
        }
        if input_set.is_empty() {
            return Err(ConfigError::InvalidOption {
                reason: "input set is empty".to_string(),
            }
            .into());
        }
        Ok(Self {
            a,
            b,
            e: None,
            k,
            input_set,
            disturbance_set: None,
            domain,
        })
    }

    /// Add the disturbance term `E d`, `d ∈ D`.
    pub fn with_disturbance(mut self, e: DMatrix<f64>, disturbance_set: Polytope) -> Result<Self> {
        if e.nrows() != self.state_dim() {
            return Err(Error::dimension("disturbance matrix rows", self.state_dim(), e.nrows()));
        }
        if disturbance_set.dim() != e.ncols() {
            return Err(Error::dimension("disturbance set", e.ncols(), disturbance_set.dim()));
        }
        if disturbance_set.is_empty() {
            return Err(ConfigError::InvalidOption {
                reason: "disturbance set is empty".to_string(),
            }
            .into());
        }
        self.e = Some(e);
        self.disturbance_set = Some(disturbance_set);
        Ok(self)
    }

    pub fn state_dim(&self) -> usize {
        self.a.nrows()
    }
    pub fn input_dim(&self) -> usize {
        self.b.ncols()
    }
    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }
    pub fn b(&self) -> &DMatrix<f64> {
        &self.b
    }
    pub fn e(&self) -> Option<&DMatrix<f64>> {
        self.e.as_ref()
    }
    pub fn k(&self) -> &DVector<f64> {
        &self.k
    }
    pub fn input_set(&self) -> &Polytope {
        &self.input_set
    }
    pub fn disturbance_set(&self) -> Option<&Polytope> {
        self.disturbance_set.as_ref()
    }
    pub fn domain(&self) -> &Polytope {
        &self.domain
    }

    /// One step of the dynamics. `d` is ignored for undisturbed systems.
    pub fn step(&self, x: &DVector<f64>, u: &DVector<f64>, d: Option<&DVector<f64>>) -> DVector<f64> {
        let mut next = &self.a * x + &self.b * u + &self.k;
        if let (Some(e), Some(d)) = (&self.e, d) {
            next += e * d;
        }
        next
    }
}

impl fmt::Display for LtiSys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LtiSys(n = {}, m = {}, disturbed = {})",
            self.state_dim(),
            self.input_dim(),
            self.e.is_some()
        )
    }
}

/// Piecewise-affine system: each subsystem is active on its own domain.
#[derive(Debug, Clone, PartialEq)]
pub struct PwaSys {
    domain: Polytope,
    subsystems: Vec<LtiSys>,
}

impl PwaSys {
    /// Create a PWA system whose subsystem domains must partition `domain`.
    pub fn new(domain: Polytope, subsystems: Vec<LtiSys>) -> Result<Self> {
        if subsystems.is_empty() {
            return Err(ConfigError::InvalidOption {
                reason: "PWA system without subsystems".to_string(),
            }
            .into());
        }
        let n = domain.dim();
        for sys in &subsystems {
            if sys.state_dim() != n {
                return Err(Error::dimension("PWA subsystem state", n, sys.state_dim()));
            }
        }
        let input_dim = subsystems[0].input_dim();
        for sys in &subsystems {
            if sys.input_dim() != input_dim {
                return Err(Error::dimension("PWA subsystem input", input_dim, sys.input_dim()));
            }
        }

        for i in 0..subsystems.len() {
            for j in i + 1..subsystems.len() {
                if subsystems[i].domain().intersect(subsystems[j].domain()).is_full_dim() {
                    return Err(ConfigError::PwaDomainOverlap { first: i, second: j }.into());
                }
            }
        }

        let subdomains: Vec<Polytope> = subsystems.iter().map(|s| s.domain().clone()).collect();
        let gap = diff_union(&[domain.clone()], &subdomains);
        if !gap.is_empty() {
            let uncovered_volume = union_volume(&gap);
            debug!("PWA subdomains leave {} uncovered pieces", gap.len());
            return Err(ConfigError::PwaDomainGap { uncovered_volume }.into());
        }

        Ok(Self { domain, subsystems })
    }

    pub fn domain(&self) -> &Polytope {
        &self.domain
    }
    pub fn subsystems(&self) -> &[LtiSys] {
        &self.subsystems
    }
    pub fn state_dim(&self) -> usize {
        self.domain.dim()
    }

    /// Index of the subsystem active at `x`.
    ///
    /// States on a shared boundary go to the first subsystem whose domain contains them.
    pub fn active(&self, x: &DVector<f64>) -> Result<usize> {
        let strict: Vec<usize> = (0..self.subsystems.len())
            .filter(|&i| self.subsystems[i].domain().contains_strictly(x, ABS_TOL))
            .collect();
        if strict.len() > 1 {
            return Err(ConfigError::PwaDomainOverlap {
                first: strict[0],
                second: strict[1],
            }
            .into());
        }
        (0..self.subsystems.len())
            .find(|&i| self.subsystems[i].domain().contains(x))
            .ok_or_else(|| ConfigError::PwaDomainGap { uncovered_volume: 0.0 }.into())
    }
}

/// Dynamics driving the abstraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamics {
    Lti(LtiSys),
    Pwa(PwaSys),
}

impl Dynamics {
    pub fn state_dim(&self) -> usize {
        match self {
            Dynamics::Lti(sys) => sys.state_dim(),
            Dynamics::Pwa(sys) => sys.state_dim(),
        }
    }

    pub fn domain(&self) -> &Polytope {
        match self {
            Dynamics::Lti(sys) => sys.domain(),
            Dynamics::Pwa(sys) => sys.domain(),
        }
    }

    /// Subsystem by index; an LTI system is its own only subsystem.
    pub fn subsystem(&self, index: usize) -> Option<&LtiSys> {
        match self {
            Dynamics::Lti(sys) => (index == 0).then_some(sys),
            Dynamics::Pwa(sys) => sys.subsystems().get(index),
        }
    }

    /// Subsystem active at a continuous state.
    pub fn active(&self, x: &DVector<f64>) -> Result<&LtiSys> {
        match self {
            Dynamics::Lti(sys) => Ok(sys),
            Dynamics::Pwa(sys) => sys.active(x).map(|i| &sys.subsystems()[i]),
        }
    }
}

impl From<LtiSys> for Dynamics {
    fn from(sys: LtiSys) -> Self {
        Dynamics::Lti(sys)
    }
}

impl From<PwaSys> for Dynamics {
    fn from(sys: PwaSys) -> Self {
        Dynamics::Pwa(sys)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn integrator(lo: f64, hi: f64) -> LtiSys {
        LtiSys::new(
            DMatrix::identity(1, 1),
            DMatrix::identity(1, 1),
            None,
            Polytope::from_box(&[-1.0], &[1.0]),
            Polytope::from_box(&[lo], &[hi]),
        )
        .unwrap()
    }

    #[test]
    fn test_step() {
        let sys = integrator(0.0, 6.0)
            .with_disturbance(DMatrix::identity(1, 1), Polytope::from_box(&[-0.1], &[0.1]))
            .unwrap();
        let x = DVector::from_vec(vec![2.0]);
        let u = DVector::from_vec(vec![0.5]);
        assert_eq!(sys.step(&x, &u, None)[0], 2.5);
        let d = DVector::from_vec(vec![0.1]);
        assert!((sys.step(&x, &u, Some(&d))[0] - 2.6).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = LtiSys::new(
            DMatrix::identity(2, 2),
            DMatrix::identity(2, 1),
            None,
            Polytope::from_box(&[-1.0], &[1.0]),
            Polytope::from_box(&[0.0], &[1.0]),
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_pwa_accepts_partition() {
        let domain = Polytope::from_box(&[0.0], &[6.0]);
        let pwa = PwaSys::new(domain, vec![integrator(0.0, 3.0), integrator(3.0, 6.0)]).unwrap();
        assert_eq!(pwa.active(&DVector::from_vec(vec![1.0])).unwrap(), 0);
        assert_eq!(pwa.active(&DVector::from_vec(vec![4.0])).unwrap(), 1);
        assert_eq!(pwa.active(&DVector::from_vec(vec![3.0])).unwrap(), 0);
        assert!(pwa.active(&DVector::from_vec(vec![7.0])).is_err());
    }

    #[test]
    fn test_pwa_rejects_gap() {
        let domain = Polytope::from_box(&[0.0], &[6.0]);
        let err = PwaSys::new(domain, vec![integrator(0.0, 2.0), integrator(3.0, 6.0)]).unwrap_err();
        match err {
            Error::Configuration(ConfigError::PwaDomainGap { uncovered_volume }) => {
                assert!((uncovered_volume - 1.0).abs() < 1e-6)
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_pwa_rejects_overlap() {
        let domain = Polytope::from_box(&[0.0], &[6.0]);
        let err = PwaSys::new(domain, vec![integrator(0.0, 4.0), integrator(3.0, 6.0)]).unwrap_err();
        assert_eq!(err, Error::Configuration(ConfigError::PwaDomainOverlap { first: 0, second: 1 }));
    }
}
