use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use log::warn;

use crate::models::Formulation;
use crate::solver::{MilpSolver, SolveOutcome, SolverError};

/// Wraps a backend so that the otherwise opaque, potentially long-running
/// solve call is given a wall-clock budget. The solve runs on its own worker
/// thread; if the budget runs out first, the outcome is
/// [`SolveOutcome::TimedOut`] and the instance remains unsolved.
///
/// A worker that misses the deadline is left to finish in the background and
/// its result is discarded, since a thread in the middle of a pivot cannot be
/// interrupted safely.
#[derive(Debug, Clone)]
pub struct TimeLimit<S> {
    inner: S,
    budget: Duration,
}

impl<S> TimeLimit<S> {
    pub fn new(inner: S, budget: Duration) -> Self {
        Self { inner, budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}

impl<S> MilpSolver for TimeLimit<S>
where
    S: MilpSolver + Clone + Send + 'static,
{
    fn solve(&self, formulation: &Formulation) -> Result<SolveOutcome, SolverError> {
        let (tx, rx) = mpsc::channel();
        let solver = self.inner.clone();
        let formulation = formulation.clone();
        let name = formulation.name().to_string();

        thread::spawn(move || {
            // The receiver is gone if the deadline already passed.
            let _ = tx.send(solver.solve(&formulation));
        });

        match rx.recv_timeout(self.budget) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    "solve of {} exceeded its budget of {:?}",
                    name, self.budget
                );
                Ok(SolveOutcome::TimedOut)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(SolverError::WorkerDied),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::MicrolpSolver;

    /// Backend stub that sleeps through its budget.
    #[derive(Debug, Clone)]
    struct Sleepy(Duration);

    impl MilpSolver for Sleepy {
        fn solve(&self, _: &Formulation) -> Result<SolveOutcome, SolverError> {
            thread::sleep(self.0);
            Ok(SolveOutcome::Infeasible)
        }
    }

    #[test]
    fn expires_when_the_backend_is_too_slow() {
        let solver = TimeLimit::new(Sleepy(Duration::from_secs(5)), Duration::from_millis(10));
        let model = Formulation::new("slow");
        assert!(matches!(
            solver.solve(&model).unwrap(),
            SolveOutcome::TimedOut
        ));
    }

    #[test]
    fn passes_results_through_within_the_budget() {
        let solver = TimeLimit::new(MicrolpSolver, Duration::from_secs(60));
        let mut model = Formulation::new("fast");
        let x = model.continuous("x");
        let lhs: crate::models::LinearExpr = [(x, 1.0)].into_iter().collect();
        model.subject_to("floor", lhs, crate::models::Sense::Ge, 1.0);

        assert!(matches!(
            solver.solve(&model).unwrap(),
            SolveOutcome::Optimal(_)
        ));
    }
}
