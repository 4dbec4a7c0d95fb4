use ::microlp as milp;
use itertools::Itertools;
use log::debug;

use crate::models::{Formulation, Sense, VarKind};
use crate::solver::{Assignment, MilpSolver, SolveOutcome, SolverError};

/// Exact MILP backend built on the pure-Rust `microlp` simplex and
/// branch-and-bound implementation. Binary variables are handed to the
/// backend as integer variables with their formulation bounds, so pinned
/// binaries stay pinned.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicrolpSolver;

impl MilpSolver for MicrolpSolver {
    fn solve(&self, formulation: &Formulation) -> Result<SolveOutcome, SolverError> {
        let mut problem = milp::Problem::new(milp::OptimizationDirection::Minimize);

        let vars: Vec<milp::Variable> = formulation
            .variables()
            .iter()
            .map(|def| match def.kind() {
                VarKind::Binary => problem
                    .add_integer_var(def.objective(), (def.lower() as i32, def.upper() as i32)),
                VarKind::Continuous => {
                    problem.add_var(def.objective(), (def.lower(), def.upper()))
                }
            })
            .collect();

        for constraint in formulation.constraints() {
            // microlp rejects a variable occurring twice in one row, so
            // repeated terms are merged and the row is ordered by variable
            // index to keep the translation deterministic.
            let lhs: Vec<(milp::Variable, f64)> = constraint
                .lhs()
                .terms()
                .iter()
                .map(|&(var, coeff)| (vars[var.index()], coeff))
                .into_group_map()
                .into_iter()
                .map(|(var, coeffs)| (var, coeffs.into_iter().sum()))
                .sorted_by_key(|&(var, _)| var)
                .collect();

            let op = match constraint.sense() {
                Sense::Le => milp::ComparisonOp::Le,
                Sense::Eq => milp::ComparisonOp::Eq,
                Sense::Ge => milp::ComparisonOp::Ge,
            };

            problem.add_constraint(&lhs, op, constraint.rhs());
        }

        debug!(
            "handing formulation {} to microlp: {} variables, {} constraints",
            formulation.name(),
            formulation.num_variables(),
            formulation.num_constraints()
        );

        match problem.solve() {
            Ok(solution) => {
                let objective = solution.objective();
                let values = vars.iter().map(|&var| solution[var]).collect();
                Ok(SolveOutcome::Optimal(Assignment::new(values, objective)))
            }
            Err(milp::Error::Infeasible) => Ok(SolveOutcome::Infeasible),
            Err(milp::Error::Unbounded) => Ok(SolveOutcome::Unbounded),
            Err(milp::Error::InternalError(message)) => Err(SolverError::Backend(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinearExpr;

    #[test]
    fn solves_a_small_lp() {
        // minimize 2a + 3b subject to a + b >= 4
        let mut model = Formulation::new("lp");
        let a = model.continuous("a");
        let b = model.continuous("b");
        model.set_objective([(a, 2.0), (b, 3.0)].into_iter().collect::<LinearExpr>());
        let lhs: LinearExpr = [(a, 1.0), (b, 1.0)].into_iter().collect();
        model.subject_to("cover", lhs, crate::models::Sense::Ge, 4.0);

        match MicrolpSolver.solve(&model).unwrap() {
            SolveOutcome::Optimal(assignment) => {
                assert!((assignment.objective() - 8.0).abs() < 1e-6);
                assert!((assignment[a] - 4.0).abs() < 1e-6);
                assert!(assignment[b].abs() < 1e-6);
            }
            other => panic!("expected optimal, got {}", other.status()),
        }
    }

    #[test]
    fn branches_on_binaries() {
        // Two switches, each unlocking 10 units of a resource of which 12
        // are needed. Opening the cheap one alone cannot cover it.
        let mut model = Formulation::new("milp");
        let y0 = model.binary("y_0");
        let y1 = model.binary("y_1");
        let x = model.continuous("x");
        model.set_objective(
            [(y0, 5.0), (y1, 100.0), (x, 0.0)]
                .into_iter()
                .collect::<LinearExpr>(),
        );
        let unlock: LinearExpr = [(x, 1.0), (y0, -10.0), (y1, -10.0)].into_iter().collect();
        model.subject_to("unlock", unlock, crate::models::Sense::Le, 0.0);
        let need: LinearExpr = [(x, 1.0)].into_iter().collect();
        model.subject_to("need", need, crate::models::Sense::Eq, 12.0);

        match MicrolpSolver.solve(&model).unwrap() {
            SolveOutcome::Optimal(assignment) => {
                assert!((assignment.objective() - 105.0).abs() < 1e-6);
                assert!((assignment[y0] - 1.0).abs() < 1e-6);
                assert!((assignment[y1] - 1.0).abs() < 1e-6);
            }
            other => panic!("expected optimal, got {}", other.status()),
        }
    }

    #[test]
    fn reports_infeasible() {
        let mut model = Formulation::new("infeasible");
        let x = model.continuous("x");
        let lhs: LinearExpr = [(x, 1.0)].into_iter().collect();
        model.subject_to("impossible", lhs, crate::models::Sense::Le, -1.0);

        assert!(matches!(
            MicrolpSolver.solve(&model).unwrap(),
            SolveOutcome::Infeasible
        ));
    }

    #[test]
    fn reports_unbounded() {
        let mut model = Formulation::new("unbounded");
        let x = model.continuous("x");
        model.set_objective([(x, -1.0)].into_iter().collect::<LinearExpr>());
        let lhs: LinearExpr = [(x, 1.0)].into_iter().collect();
        model.subject_to("floor", lhs, crate::models::Sense::Ge, 1.0);

        assert!(matches!(
            MicrolpSolver.solve(&model).unwrap(),
            SolveOutcome::Unbounded
        ));
    }

    #[test]
    fn respects_pinned_binaries() {
        // Pinning the expensive switch on must carry its cost even though
        // a free optimum would leave it off.
        let mut model = Formulation::new("pinned");
        let y = model.fixed_binary("y", true);
        model.set_objective([(y, 42.0)].into_iter().collect::<LinearExpr>());
        let lhs: LinearExpr = [(y, 1.0)].into_iter().collect();
        model.subject_to("cap", lhs, crate::models::Sense::Le, 1.0);

        match MicrolpSolver.solve(&model).unwrap() {
            SolveOutcome::Optimal(assignment) => {
                assert!((assignment[y] - 1.0).abs() < 1e-6);
                assert!((assignment.objective() - 42.0).abs() < 1e-6);
            }
            other => panic!("expected optimal, got {}", other.status()),
        }
    }
}
