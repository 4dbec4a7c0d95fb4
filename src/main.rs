use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::info;

use cflp::models::facility_location::{FacilityLocationSolver, Parameters, PlanOutcome, Sets};
use cflp::parse;
use cflp::solution::Report;
use cflp::solver::{MicrolpSolver, TimeLimit};

/// Decide which distribution centers to open and how to route supply to the
/// demand points at minimum combined opening and transport cost.
#[derive(Parser)]
#[clap(version)]
struct Args {
    /// Path to the JSON instance file
    path: PathBuf,
    /// Wall-clock budget per commodity, in seconds
    #[clap(long)]
    time_limit: Option<u64>,
    /// Print each commodity's formulation in LP format before solving
    #[clap(long)]
    dump_model: bool,
}

pub fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(&args) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let problems = parse::load_instances(&args.path)?;
    info!(
        "loaded {} commodity instance(s) from {}",
        problems.len(),
        args.path.display()
    );

    if args.dump_model {
        for problem in &problems {
            let sets = Sets::new(problem);
            let parameters = Parameters::new(problem);
            let (formulation, _) =
                FacilityLocationSolver::build(&sets, &parameters, problem.name());
            println!("{}", formulation);
        }
    }

    // commodities are fully independent instances: no shared state, so each
    // one gets its own worker thread
    let time_limit = args.time_limit;
    let handles: Vec<_> = problems
        .into_iter()
        .map(|problem| {
            std::thread::spawn(move || {
                let outcome = match time_limit {
                    Some(secs) => FacilityLocationSolver::solve(
                        &problem,
                        &TimeLimit::new(MicrolpSolver, Duration::from_secs(secs)),
                    ),
                    None => FacilityLocationSolver::solve(&problem, &MicrolpSolver),
                };
                (problem, outcome)
            })
        })
        .collect();

    let mut combined = 0.0;
    let mut all_optimal = true;

    for handle in handles {
        let (problem, outcome) = handle.join().map_err(|_| "solver worker panicked")?;
        match outcome? {
            PlanOutcome::Optimal(solution) => {
                combined += solution.total_cost();
                println!("{}", Report::new(&problem, &solution));
                println!();
            }
            outcome => {
                all_optimal = false;
                println!("{}: {}", problem.name(), outcome.status());
                println!();
            }
        }
    }

    if all_optimal {
        println!("combined total cost: {:.2}", combined);
    }

    Ok(())
}
