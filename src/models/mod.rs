pub mod facility_location;
pub mod formulation;
pub mod utils;

pub use formulation::{Constraint, Formulation, LinearExpr, Sense, Var, VarDef, VarKind};
