use derive_more::Display;
use itertools::iproduct;
use log::{debug, info};

use super::sets_and_parameters::{Parameters, Sets};
use crate::models::utils::{AddVars, LpSum};
use crate::models::{Formulation, Sense, Var};
use crate::problem::Problem;
use crate::solution::{Solution, SolutionError};
use crate::solver::{MilpSolver, SolveOutcome, SolverError};

pub struct FacilityLocationSolver {}

/// The decision variables of the facility location model
pub struct Variables {
    /// 1 if facility i is put to use, 0 otherwise
    pub y: Vec<Var>,
    /// Quantity shipped from facility i to demand point j
    pub x: Vec<Vec<Var>>,
}

/// The terminal result of planning a single instance.
#[derive(Debug)]
pub enum PlanOutcome {
    /// A provably cost-optimal plan
    Optimal(Solution),
    /// No plan can satisfy every demand within the available capacity
    Infeasible,
    /// Reported by the backend against expectation; surfaced, never hidden
    Unbounded,
    /// The backend ran out of its time budget
    TimedOut,
}

impl PlanOutcome {
    /// A short human-readable tag for the outcome
    pub fn status(&self) -> &'static str {
        match self {
            PlanOutcome::Optimal(_) => "optimal",
            PlanOutcome::Infeasible => "infeasible",
            PlanOutcome::Unbounded => "unbounded",
            PlanOutcome::TimedOut => "timed out",
        }
    }
}

/// A fatal failure while planning one instance. Other instances are
/// unaffected; each carries the name of the instance it concerns.
#[derive(Debug, Display)]
pub enum PlanError {
    /// The backend failed (crash, malformed result, resource limits)
    #[display(fmt = "solving {} failed: {}", instance, source)]
    Solver {
        instance: String,
        source: SolverError,
    },
    /// The solver claimed optimality but its plan does not reconcile
    #[display(fmt = "extracting the plan for {} failed: {}", instance, source)]
    Extraction {
        instance: String,
        source: SolutionError,
    },
}

impl std::error::Error for PlanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanError::Solver { source, .. } => Some(source),
            PlanError::Extraction { source, .. } => Some(source),
        }
    }
}

#[allow(non_snake_case)]
impl FacilityLocationSolver {
    /// builds the facility location model
    pub fn build(sets: &Sets, parameters: &Parameters, name: &str) -> (Formulation, Variables) {
        let facilities = sets.I.len();
        let demand_points = sets.J.len();

        let mut model = Formulation::new(name);

        //*************CREATE VARIABLES*************//

        // 1 if facility i is put to use, 0 otherwise. Installed facilities
        // are not free decisions: their variable is pinned to one.
        let y: Vec<Var> = facilities.vars_with(|i| {
            if parameters.installed[i] {
                model.fixed_binary(format!("y_{}", i), true)
            } else {
                model.binary(format!("y_{}", i))
            }
        });

        // quantity shipped from facility i to demand point j
        let x: Vec<Vec<Var>> = (facilities, demand_points).cont(&mut model, "x");

        //*************OBJECTIVE*************//

        // opening cost of the facilities put to use, plus the transport
        // cost of the full shipping plan
        let opening = sets.I.iter().map(|i| (y[*i], parameters.f[*i])).lp_sum();
        let transport = iproduct!(&sets.I, &sets.J)
            .map(|(i, j)| (x[*i][*j], parameters.C[*i][*j]))
            .lp_sum();
        model.set_objective(opening + transport);

        // ******************** ADD CONSTRAINTS ********************

        // flow leaves a facility only if it is open, and within its capacity.
        // This is also the only upper bound on the individual x variables.
        for i in &sets.I {
            let lhs = sets
                .J
                .iter()
                .map(|j| (x[*i][*j], 1.0))
                .chain(std::iter::once((y[*i], -parameters.a[*i])))
                .lp_sum();
            model.subject_to(format!("capacity_{}", i), lhs, Sense::Le, 0.0);
        }

        // every demand point receives exactly its required quantity, no
        // partial and no over-fulfillment
        for j in &sets.J {
            let lhs = sets.I.iter().map(|i| (x[*i][*j], 1.0)).lp_sum();
            model.subject_to(format!("demand_{}", j), lhs, Sense::Eq, parameters.b[*j]);
        }

        (model, Variables { y, x })
    }

    /// Builds the formulation for `problem`, hands it to `backend`, and
    /// extracts and validates the resulting plan. The pipeline is strictly
    /// sequential; the only long-running step is the blocking backend call.
    pub fn solve<S: MilpSolver>(problem: &Problem, backend: &S) -> Result<PlanOutcome, PlanError> {
        let sets = Sets::new(problem);
        let parameters = Parameters::new(problem);
        let (formulation, variables) = Self::build(&sets, &parameters, problem.name());

        info!(
            "solving {}: {} facilities, {} demand points, total demand {} against total capacity {}",
            problem.name(),
            sets.I.len(),
            sets.J.len(),
            problem.total_demand(),
            problem.total_capacity()
        );
        debug!("{}", formulation);

        let outcome = backend
            .solve(&formulation)
            .map_err(|source| PlanError::Solver {
                instance: problem.name().to_string(),
                source,
            })?;

        match outcome {
            SolveOutcome::Optimal(assignment) => {
                // a backend that claims optimality must assign every variable
                if assignment.len() != formulation.num_variables() {
                    return Err(PlanError::Solver {
                        instance: problem.name().to_string(),
                        source: SolverError::AssignmentSizeMismatch {
                            expected: formulation.num_variables(),
                            actual: assignment.len(),
                        },
                    });
                }

                let solution = Solution::extract(problem, &variables, &assignment).map_err(
                    |source| PlanError::Extraction {
                        instance: problem.name().to_string(),
                        source,
                    },
                )?;

                info!(
                    "{} solved to optimality at total cost {}",
                    problem.name(),
                    solution.total_cost()
                );
                Ok(PlanOutcome::Optimal(solution))
            }
            SolveOutcome::Infeasible => Ok(PlanOutcome::Infeasible),
            SolveOutcome::Unbounded => Ok(PlanOutcome::Unbounded),
            SolveOutcome::TimedOut => Ok(PlanOutcome::TimedOut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VarKind;
    use crate::problem::{DemandPoint, Facility};

    fn problem() -> Problem {
        Problem::new(
            "fuel",
            vec![
                Facility::installed("CD1", 50.0),
                Facility::candidate("CD2", 500_000.0, 75.0),
            ],
            vec![DemandPoint::new("CC1", 16.0), DemandPoint::new("CC2", 20.0)],
            vec![vec![60.0, 65.0], vec![45.0, 54.0]],
        )
        .unwrap()
    }

    #[test]
    fn builds_one_variable_per_decision() {
        let problem = problem();
        let sets = Sets::new(&problem);
        let parameters = Parameters::new(&problem);
        let (model, variables) = FacilityLocationSolver::build(&sets, &parameters, problem.name());

        // one binary per facility, one continuous per route
        assert_eq!(model.num_variables(), 2 + 2 * 2);
        assert_eq!(variables.y.len(), 2);
        assert_eq!(variables.x.len(), 2);

        let defs = model.variables();
        assert!(defs[variables.y[0].index()].is_pinned());
        assert!(!defs[variables.y[1].index()].is_pinned());
        assert!(variables
            .x
            .iter()
            .flatten()
            .all(|&v| defs[v.index()].kind() == VarKind::Continuous));
    }

    #[test]
    fn objective_carries_opening_and_transport_costs() {
        let problem = problem();
        let sets = Sets::new(&problem);
        let parameters = Parameters::new(&problem);
        let (model, variables) = FacilityLocationSolver::build(&sets, &parameters, problem.name());

        let defs = model.variables();
        assert_eq!(defs[variables.y[0].index()].objective(), 0.0);
        assert_eq!(defs[variables.y[1].index()].objective(), 500_000.0);
        assert_eq!(defs[variables.x[1][0].index()].objective(), 45.0);
    }

    #[test]
    fn one_constraint_per_facility_and_demand_point() {
        let problem = problem();
        let sets = Sets::new(&problem);
        let parameters = Parameters::new(&problem);
        let (model, variables) = FacilityLocationSolver::build(&sets, &parameters, problem.name());

        assert_eq!(model.num_constraints(), 2 + 2);

        // capacity linking: x_0_0 + x_0_1 - 50 y_0 <= 0
        let capacity = &model.constraints()[0];
        assert_eq!(capacity.name(), "capacity_0");
        assert_eq!(capacity.sense(), Sense::Le);
        assert_eq!(capacity.rhs(), 0.0);
        assert_eq!(
            capacity.lhs().terms(),
            &[
                (variables.x[0][0], 1.0),
                (variables.x[0][1], 1.0),
                (variables.y[0], -50.0),
            ]
        );

        // demand satisfaction is an equality: x_0_1 + x_1_1 = 20
        let demand = &model.constraints()[3];
        assert_eq!(demand.name(), "demand_1");
        assert_eq!(demand.sense(), Sense::Eq);
        assert_eq!(demand.rhs(), 20.0);
        assert_eq!(
            demand.lhs().terms(),
            &[(variables.x[0][1], 1.0), (variables.x[1][1], 1.0)]
        );
    }

    #[test]
    fn capacity_shortfall_still_builds() {
        // total capacity 3 < total demand 36: the builder does not pre-check
        // feasibility, the solver is the one to give the verdict
        let problem = Problem::new(
            "fuel",
            vec![Facility::installed("CD1", 3.0)],
            vec![DemandPoint::new("CC1", 36.0)],
            vec![vec![1.0]],
        )
        .unwrap();

        let sets = Sets::new(&problem);
        let parameters = Parameters::new(&problem);
        let (model, _) = FacilityLocationSolver::build(&sets, &parameters, problem.name());
        assert_eq!(model.num_variables(), 2);
        assert_eq!(model.num_constraints(), 2);
    }
}
