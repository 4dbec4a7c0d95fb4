pub mod models;
pub mod parse;
pub mod problem;
pub mod solution;
pub mod solver;

pub use models::facility_location::{FacilityLocationSolver, PlanError, PlanOutcome};
pub use problem::{DemandPoint, Facility, Problem};
pub use solution::{Report, Solution};
pub use solver::{MicrolpSolver, MilpSolver, SolveOutcome, TimeLimit};
