pub mod microlp;
pub mod timeout;

pub use self::microlp::MicrolpSolver;
pub use self::timeout::TimeLimit;

use crate::models::{Formulation, Var};
use derive_more::Display;
use std::ops::Index;

/// The variable assignment of an optimal solution, indexed by [`Var`].
#[derive(Debug, Clone)]
pub struct Assignment {
    values: Vec<f64>,
    objective: f64,
}

impl Assignment {
    pub fn new(values: Vec<f64>, objective: f64) -> Self {
        Self { values, objective }
    }

    /// The objective value reported by the backend
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// The number of variable values in the assignment
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Index<Var> for Assignment {
    type Output = f64;

    fn index(&self, var: Var) -> &f64 {
        &self.values[var.index()]
    }
}

/// The terminal verdict of handing a formulation to a MILP backend. Each of
/// these is a first-class outcome reported to the caller, not an error.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    /// A provably optimal integer solution was found
    Optimal(Assignment),
    /// No assignment satisfies all constraints
    Infeasible,
    /// The objective can be decreased without bound. Not expected for models
    /// whose variables are bounded below and capacity-constrained above, but
    /// surfaced rather than swallowed when a backend reports it.
    Unbounded,
    /// The caller-supplied time budget ran out before the backend finished.
    /// The instance is left unsolved and may be retried with a larger budget.
    TimedOut,
}

impl SolveOutcome {
    /// A short human-readable tag for the outcome
    pub fn status(&self) -> &'static str {
        match self {
            SolveOutcome::Optimal(_) => "optimal",
            SolveOutcome::Infeasible => "infeasible",
            SolveOutcome::Unbounded => "unbounded",
            SolveOutcome::TimedOut => "timed out",
        }
    }
}

/// A failure of the solving backend itself, as opposed to a verdict about
/// the instance. Fatal for the instance being solved, but independent
/// instances are unaffected.
#[derive(Debug, Display)]
pub enum SolverError {
    /// The backend crashed or gave up with an internal error
    #[display(fmt = "solver backend failed: {}", _0)]
    Backend(String),
    /// The backend returned an assignment of the wrong size
    #[display(
        fmt = "backend returned {} variable values, formulation has {}",
        actual,
        expected
    )]
    AssignmentSizeMismatch { expected: usize, actual: usize },
    /// The worker thread running the solve died before reporting back
    #[display(fmt = "solver worker thread died before reporting a result")]
    WorkerDied,
}

impl std::error::Error for SolverError {}

/// A MILP backend: accepts a formulation with linear and binary constraints,
/// returns an optimal assignment or a terminal infeasible/unbounded verdict.
/// The result must be provably optimal, not a heuristic approximation; ties
/// between equally good integer solutions may be broken arbitrarily.
pub trait MilpSolver {
    fn solve(&self, formulation: &Formulation) -> Result<SolveOutcome, SolverError>;
}
