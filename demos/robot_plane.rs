use std::collections::BTreeSet;

use clap::Parser;
use nalgebra::{DMatrix, DVector};

use rhtlp_rs::control::get_input;
use rhtlp_rs::discretize::{discretize, DiscretizeConfig};
use rhtlp_rs::dynamics::{Dynamics, LtiSys};
use rhtlp_rs::formula::Formula;
use rhtlp_rs::horizon::{decompose, Condition, DecomposeConfig, GoalSpec};
use rhtlp_rs::partition::Partition;
use rhtlp_rs::polytope::Polytope;
use rhtlp_rs::prop::Propositions;
use rhtlp_rs::spec::GrSpec;
use rhtlp_rs::validate::validate;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Width of the initial grid cells.
    #[arg(long, value_name = "FLOAT", default_value = "1.0")]
    grid: f64,

    /// Disturbance bound per axis (0 disables the disturbance).
    #[arg(long, value_name = "FLOAT", default_value = "0.0")]
    disturbance: f64,

    /// Maximum number of refinement sweeps.
    #[arg(long, value_name = "INT", default_value = "20")]
    max_iterations: usize,

    /// Minimum volume of a split-off cell.
    #[arg(long, value_name = "FLOAT", default_value = "0.01")]
    min_volume: f64,

    /// Evaluate cell pairs on a single thread.
    #[arg(long)]
    sequential: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    // Robot on the plane [0,3] x [0,2], x[t+1] = x[t] + u[t] + d[t].
    let domain = Polytope::from_box(&[0.0, 0.0], &[3.0, 2.0]);
    let mut sys = LtiSys::new(
        DMatrix::identity(2, 2),
        DMatrix::identity(2, 2),
        None,
        Polytope::from_box(&[-1.0, -1.0], &[1.0, 1.0]),
        domain.clone(),
    )?;
    if args.disturbance > 0.0 {
        let w = args.disturbance;
        sys = sys.with_disturbance(DMatrix::identity(2, 2), Polytope::from_box(&[-w, -w], &[w, w]))?;
    }
    let dynamics = Dynamics::from(sys);

    let props = Propositions::new(2)
        .with("home", vec![Polytope::from_box(&[0.0, 0.0], &[1.0, 1.0])])?
        .with("lot", vec![Polytope::from_box(&[2.0, 1.0], &[3.0, 2.0])])?;
    let partition = Partition::from_propositions(domain, props)?.refine_grid(&[args.grid, args.grid])?;
    println!("Initial partition: {} cells", partition.len());

    let config = DiscretizeConfig {
        max_iterations: args.max_iterations,
        min_cell_volume: args.min_volume,
        parallel: !args.sequential,
    };
    let time_discretize = std::time::Instant::now();
    let result = discretize(partition, &dynamics, &config)?;
    println!("Discretization: {} in {:.3}s", result, time_discretize.elapsed().as_secs_f64());
    if !result.converged {
        println!("Refinement did not converge, edges are only partially certified");
    }
    println!("{}", result.ts);

    let goals = [
        GoalSpec::new("home", Formula::atom("home")),
        GoalSpec::new("lot", Formula::atom("lot")),
    ];
    let rhp = decompose(
        &result.ts,
        &GrSpec::new(),
        &goals,
        Condition::Set(vec![result.partition.domain().clone()]),
        Condition::Formula(Formula::atom("home")),
        &DecomposeConfig {
            excluded: BTreeSet::new(),
            safe: None,
        },
    )?;
    for poset in rhp.posets() {
        let sizes: Vec<usize> = poset.layers.iter().map(|l| l.len()).collect();
        println!("Goal '{}': layer sizes {:?}", poset.name, sizes);
    }
    println!("{} short-horizon problems", rhp.problems().len());

    let report = validate(&rhp);
    println!("Validation: {}", report);

    // Drive one step from the centre of the upper-left corner towards the lot.
    let x0 = DVector::from_vec(vec![0.5, 1.5]);
    if let Some(start) = result.partition.find_cell(&x0) {
        let lot_layers = &rhp.posets()[1];
        if let Some(j) = lot_layers.layer_of(start).filter(|&j| j > 0) {
            let target_layer = &lot_layers.layers[lot_layers.successor[j]];
            if let Some(end) = result.ts.successors(start).find(|t| target_layer.contains(t)) {
                let u = get_input(&x0, &dynamics, &result.partition, &result.ts, start, end)?;
                println!("u({}) = {} moves {} -> {}", x0.transpose(), u.transpose(), start, end);
            }
        }
    }

    println!("Total time: {:.3}s", time_total.elapsed().as_secs_f64());
    Ok(())
}
