//! End-to-end scenarios: partition, refinement, decomposition and validation together.

use nalgebra::{DMatrix, DVector};

use rhtlp_rs::arena::CellId;
use rhtlp_rs::discretize::{discretize, DiscretizeConfig};
use rhtlp_rs::dynamics::{Dynamics, LtiSys, PwaSys};
use rhtlp_rs::error::{ConfigError, Error};
use rhtlp_rs::formula::Formula;
use rhtlp_rs::horizon::{decompose, Condition, DecomposeConfig, GoalSpec};
use rhtlp_rs::partition::{prop_preserving_partition, pwa_partition, Partition};
use rhtlp_rs::polytope::Polytope;
use rhtlp_rs::prop::Propositions;
use rhtlp_rs::spec::GrSpec;
use rhtlp_rs::validate::validate;

fn interval(lo: f64, hi: f64) -> Polytope {
    Polytope::from_box(&[lo], &[hi])
}

fn at(x: f64) -> DVector<f64> {
    DVector::from_vec(vec![x])
}

/// `x[t+1] = x[t] + u[t]` with `u ∈ [u_lo, u_hi]`.
fn integrator(u_lo: f64, u_hi: f64, domain: Polytope) -> LtiSys {
    LtiSys::new(
        DMatrix::identity(1, 1),
        DMatrix::identity(1, 1),
        None,
        interval(u_lo, u_hi),
        domain,
    )
    .unwrap()
}

fn right_half() -> Partition {
    let props = Propositions::new(1).with("right", vec![interval(3.0, 6.0)]).unwrap();
    prop_preserving_partition(interval(0.0, 6.0), props).unwrap()
}

#[test]
fn adjacent_cells_are_connected() {
    let partition = right_half();
    assert_eq!(partition.len(), 2);

    let dynamics = Dynamics::from(integrator(-1.0, 1.0, interval(0.0, 6.0)));
    let partition = partition.refine_grid(&[1.0]).unwrap();
    let result = discretize(partition, &dynamics, &DiscretizeConfig::default()).unwrap();
    assert!(result.converged);

    let cell = |x: f64| result.partition.find_cell(&at(x)).unwrap();
    for k in 0..5 {
        let a = cell(k as f64 + 0.5);
        let b = cell(k as f64 + 1.5);
        assert!(result.ts.has_edge(a, b), "missing {} -> {}", a, b);
        assert!(result.ts.has_edge(b, a), "missing {} -> {}", b, a);
    }
    // Two cells apart is out of reach with |u| <= 1.
    assert!(!result.ts.has_edge(cell(0.5), cell(2.5)));
    assert!(!result.ts.has_edge(cell(5.5), cell(3.5)));
}

#[test]
fn pwa_gap_is_a_configuration_error() {
    let domain = interval(0.0, 6.0);
    let err = PwaSys::new(
        domain.clone(),
        vec![
            integrator(-1.0, 1.0, interval(0.0, 2.0)),
            integrator(-1.0, 1.0, interval(3.0, 6.0)),
        ],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigError::PwaDomainGap { .. })
    ));
}

#[test]
fn pwa_partition_rejects_smaller_system() {
    // The subsystems partition [0, 4] but the partition lives on [0, 6].
    let pwa = PwaSys::new(
        interval(0.0, 4.0),
        vec![
            integrator(-1.0, 1.0, interval(0.0, 2.0)),
            integrator(-1.0, 1.0, interval(2.0, 4.0)),
        ],
    )
    .unwrap();
    let err = pwa_partition(right_half(), &pwa).unwrap_err();
    match err {
        Error::Configuration(ConfigError::PwaDomainGap { uncovered_volume }) => {
            assert!((uncovered_volume - 2.0).abs() < 1e-6)
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn valid_pwa_discretizes() {
    let pwa = PwaSys::new(
        interval(0.0, 6.0),
        vec![
            integrator(-1.0, 1.0, interval(0.0, 3.0)),
            integrator(-0.5, 0.5, interval(3.0, 6.0)),
        ],
    )
    .unwrap();
    let config = DiscretizeConfig {
        max_iterations: 50,
        ..Default::default()
    };
    let result = discretize(right_half(), &pwa.into(), &config).unwrap();
    assert!(result.converged);
    assert!(result.partition.iter().all(|(_, c)| c.subsystem.is_some()));
    assert!(result.partition.covers_domain());
}

#[test]
fn unreachable_goal_reports_coverage_gap() {
    // Only rightward moves: the leftmost cell is reachable from itself alone.
    let props = Propositions::new(1).with("dock", vec![interval(0.0, 1.0)]).unwrap();
    let partition = Partition::from_propositions(interval(0.0, 6.0), props)
        .unwrap()
        .refine_grid(&[1.0])
        .unwrap();
    let dynamics = Dynamics::from(integrator(0.0, 1.0, interval(0.0, 6.0)));
    let result = discretize(partition, &dynamics, &DiscretizeConfig::default()).unwrap();
    assert!(result.converged);

    let rhp = decompose(
        &result.ts,
        &GrSpec::new(),
        &[GoalSpec::new("dock", Formula::atom("dock"))],
        Condition::Formula(Formula::True),
        Condition::Formula(Formula::True),
        &DecomposeConfig::default(),
    )
    .unwrap();
    let report = validate(&rhp);
    assert!(!report.is_sound());
    let gap = report.coverage.as_ref().unwrap();

    let dock = result.partition.find_cell(&at(0.5)).unwrap();
    let expected: Vec<CellId> = result.ts.states().iter().copied().filter(|&id| id != dock).collect();
    assert_eq!(gap.uncovered.iter().copied().collect::<Vec<_>>(), expected);
    assert_eq!(expected.len(), 5);
}

#[test]
fn zero_budget_reports_non_convergence() {
    let partition = right_half();
    let before: Vec<_> = partition
        .iter()
        .map(|(id, c)| (id, c.region.clone()))
        .collect();

    let dynamics = Dynamics::from(integrator(-1.0, 1.0, interval(0.0, 6.0)));
    let config = DiscretizeConfig {
        max_iterations: 0,
        ..Default::default()
    };
    let result = discretize(partition, &dynamics, &config).unwrap();
    assert!(!result.converged);
    assert_eq!(result.iterations, 0);

    let after: Vec<_> = result
        .partition
        .iter()
        .map(|(id, c)| (id, c.region.clone()))
        .collect();
    assert_eq!(before, after);
    // Both cells are wholly controllable into themselves; nothing else is certified.
    assert_eq!(result.ts.num_edges(), 2);
}
