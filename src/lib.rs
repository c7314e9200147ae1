//! # rhtlp-rs: discrete abstraction and receding-horizon decomposition
//!
//! **`rhtlp-rs`** turns a continuous-state control system into a finite transition system that
//! a discrete (GR(1)) game solver can consume, and then splits a long-horizon objective into
//! short-horizon problems that can be solved online.
//!
//! ## Pipeline
//!
//! 1. Describe the state space as a [`Polytope`][crate::polytope::Polytope] domain and a set of
//!    [`Propositions`][crate::prop::Propositions], each true on a union of polytopes.
//! 2. Build the coarsest [`Partition`][crate::partition::Partition] that preserves every
//!    proposition.
//! 3. [`discretize`][crate::discretize::discretize] it under [`Dynamics`][crate::dynamics::Dynamics]
//!    (LTI or piecewise-affine). Cells are split until every edge of the resulting
//!    [`TransitionSystem`][crate::transys::TransitionSystem] is backed by a robust one-step
//!    reachability certificate.
//! 4. [`decompose`][crate::horizon::decompose] a goal into distance layers and
//!    [`validate`][crate::validate::validate] the decomposition.
//!
//! Non-convergence of the refinement and validation findings are returned as data; only
//! structural problems (dimension mismatches, PWA domains that do not partition the state
//! space, ...) are [`Error`][crate::error::Error]s.
//!
//! ## Basic Usage
//!
//! ```rust
//! use nalgebra::DMatrix;
//! use rhtlp_rs::discretize::{discretize, DiscretizeConfig};
//! use rhtlp_rs::dynamics::LtiSys;
//! use rhtlp_rs::partition::Partition;
//! use rhtlp_rs::polytope::Polytope;
//! use rhtlp_rs::prop::Propositions;
//!
//! // x[t+1] = x[t] + u[t], |u| <= 1, on [0, 6]
//! let domain = Polytope::from_box(&[0.0], &[6.0]);
//! let sys = LtiSys::new(
//!     DMatrix::identity(1, 1),
//!     DMatrix::identity(1, 1),
//!     None,
//!     Polytope::from_box(&[-1.0], &[1.0]),
//!     domain.clone(),
//! )
//! .unwrap();
//!
//! let props = Propositions::new(1)
//!     .with("right", vec![Polytope::from_box(&[3.0], &[6.0])])
//!     .unwrap();
//! let partition = Partition::from_propositions(domain, props).unwrap();
//! assert_eq!(partition.len(), 2);
//!
//! let result = discretize(partition, &sys.into(), &DiscretizeConfig::default()).unwrap();
//! assert!(result.converged);
//! ```
//!
//! ## Core Components
//!
//! - **[`polytope`]**, **[`region`]**, **[`lp`]**: convex polytopes in H-representation and the
//!   LP solver behind every geometric query.
//! - **[`partition`]**: proposition-preserving partitions, grid and PWA refinement.
//! - **[`reach`]**, **[`discretize`]**: robust predecessors and the refinement loop.
//! - **[`transys`]**, **[`spec`]**, **[`synth`]**: the abstraction, its GR(1) specification and the
//!   seam to an external game solver.
//! - **[`horizon`]**, **[`validate`]**: receding-horizon decomposition and its checks.
//! - **[`control`]**: continuous inputs realizing discrete moves.

pub mod arena;
pub mod control;
pub mod discretize;
pub mod dynamics;
pub mod error;
pub mod formula;
pub mod horizon;
pub mod lp;
pub mod partition;
pub mod polytope;
pub mod prop;
pub mod reach;
pub mod region;
pub mod spec;
pub mod synth;
pub mod transys;
pub mod validate;
