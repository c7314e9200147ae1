//! Refinement benchmarks.
//!
//! Run with:
//! ```bash
//! cargo bench --bench discretize
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::{DMatrix, DVector};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use rhtlp_rs::discretize::{discretize, DiscretizeConfig};
use rhtlp_rs::dynamics::{Dynamics, LtiSys};
use rhtlp_rs::partition::Partition;
use rhtlp_rs::polytope::Polytope;
use rhtlp_rs::prop::Propositions;
use rhtlp_rs::reach::solve_feasible;
use rhtlp_rs::region::Region;

fn plane(size: f64) -> (Dynamics, Partition) {
    let domain = Polytope::from_box(&[0.0, 0.0], &[size, size]);
    let sys = LtiSys::new(
        DMatrix::identity(2, 2),
        DMatrix::identity(2, 2),
        None,
        Polytope::from_box(&[-1.0, -1.0], &[1.0, 1.0]),
        domain.clone(),
    )
    .unwrap();
    let props = Propositions::new(2)
        .with("goal", vec![Polytope::from_box(&[0.0, 0.0], &[1.0, 1.0])])
        .unwrap();
    let partition = Partition::from_propositions(domain, props)
        .unwrap()
        .refine_grid(&[1.0, 1.0])
        .unwrap();
    (sys.into(), partition)
}

// ============================================================================
// Benchmark: full discretization on growing grids
// ============================================================================

fn bench_discretize_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("discretize_grid");
    group.sample_size(10);

    for size in [2.0, 3.0, 4.0] {
        let (dynamics, partition) = plane(size);
        for parallel in [false, true] {
            let config = DiscretizeConfig {
                parallel,
                ..Default::default()
            };
            let name = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(name, size as usize), &partition, |b, partition| {
                b.iter(|| discretize(partition.clone(), &dynamics, &config).unwrap())
            });
        }
    }

    group.finish();
}

// ============================================================================
// Benchmark: single robust predecessor between random boxes
// ============================================================================

fn bench_predecessor(c: &mut Criterion) {
    let (dynamics, _) = plane(4.0);
    let Dynamics::Lti(sys) = &dynamics else { unreachable!() };
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let boxes: Vec<_> = (0..16)
        .map(|_| {
            let lo = DVector::from_fn(2, |_, _| rng.gen_range(0.0..3.0));
            Region::from_polytope(
                Polytope::from_box(&[lo[0], lo[1]], &[lo[0] + 1.0, lo[1] + 1.0]),
                Default::default(),
            )
        })
        .collect();

    c.bench_function("predecessor_random_boxes", |b| {
        b.iter(|| {
            for pair in boxes.windows(2) {
                let _ = solve_feasible(&pair[0], &pair[1], sys);
            }
        })
    });
}

criterion_group!(benches, bench_discretize_grid, bench_predecessor);
criterion_main!(benches);
