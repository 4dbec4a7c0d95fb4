pub mod model;
pub mod sets_and_parameters;

pub use model::{FacilityLocationSolver, PlanError, PlanOutcome, Variables};
pub use sets_and_parameters::{Parameters, Sets};
