//! Error types.
//!
//! Only structural problems are errors. Non-convergence of the refinement loop and validator
//! findings are ordinary data, see [`DiscretizeResult`][crate::discretize::DiscretizeResult]
//! and [`ValidationReport`][crate::validate::ValidationReport].

use std::fmt;

use crate::arena::CellId;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal configuration problems, surfaced before any computation starts.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Two objects that must live in the same space do not.
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },
    /// A proposition whose true-set is not a union of polytopes in the ambient space.
    MalformedProposition { name: String, reason: String },
    /// The PWA subdomains leave part of the domain uncovered.
    PwaDomainGap { uncovered_volume: f64 },
    /// Two PWA subdomains overlap with positive volume.
    PwaDomainOverlap { first: usize, second: usize },
    /// The continuous domain has no interior.
    EmptyDomain,
    InvalidOption { reason: String },
    UnknownCell(CellId),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DimensionMismatch { what, expected, found } => {
                write!(f, "dimension mismatch in {}: expected {}, found {}", what, expected, found)
            }
            ConfigError::MalformedProposition { name, reason } => {
                write!(f, "malformed proposition '{}': {}", name, reason)
            }
            ConfigError::PwaDomainGap { uncovered_volume } => {
                write!(f, "PWA subdomains leave a gap of volume {:.3e}", uncovered_volume)
            }
            ConfigError::PwaDomainOverlap { first, second } => {
                write!(f, "PWA subdomains {} and {} overlap", first, second)
            }
            ConfigError::EmptyDomain => write!(f, "domain is empty"),
            ConfigError::InvalidOption { reason } => write!(f, "invalid option: {}", reason),
            ConfigError::UnknownCell(id) => write!(f, "unknown or retired cell {}", id),
        }
    }
}

/// Failures reported by the linear programming backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    Infeasible,
    Unbounded,
    IterationLimit,
    /// NaN or infinite data reached the solver.
    NonFinite,
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::Infeasible => write!(f, "LP infeasible"),
            GeometryError::Unbounded => write!(f, "LP unbounded"),
            GeometryError::IterationLimit => write!(f, "LP iteration limit reached"),
            GeometryError::NonFinite => write!(f, "non-finite LP data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Configuration(ConfigError),
    Geometry(GeometryError),
    /// A transition system was used with a partition it was not built from.
    StaleTransitionSystem { built_for: u32, current: u32 },
    /// The abstraction has no edge between the two cells.
    NoTransition { from: CellId, to: CellId },
    /// No admissible control moves the given state into the target cell.
    NoTrajectory { from: CellId, to: CellId },
}

impl Error {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    pub(crate) fn dimension(what: impl Into<String>, expected: usize, found: usize) -> Self {
        Error::Configuration(ConfigError::DimensionMismatch {
            what: what.into(),
            expected,
            found,
        })
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Configuration(e)
    }
}

impl From<GeometryError> for Error {
    fn from(e: GeometryError) -> Self {
        Error::Geometry(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(e) => write!(f, "configuration error: {}", e),
            Error::Geometry(e) => write!(f, "geometry failure: {}", e),
            Error::StaleTransitionSystem { built_for, current } => write!(
                f,
                "transition system built for partition generation {} used with generation {}",
                built_for, current
            ),
            Error::NoTransition { from, to } => write!(f, "no transition from {} to {}", from, to),
            Error::NoTrajectory { from, to } => write!(f, "no trajectory from {} to {}", from, to),
        }
    }
}

impl std::error::Error for Error {}
