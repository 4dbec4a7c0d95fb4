use crate::models::{Formulation, LinearExpr, Var};
use crate::solver::Assignment;

/// Bulk creation of indexed variable families, so a model can ask for e.g.
/// a `facilities x demand_points` grid of continuous variables in one call.
pub trait AddVars {
    type Out;

    /// Create a variable per index with a closure
    fn vars_with<F: FnMut(Self) -> Var>(&self, func: F) -> Self::Out
    where
        Self: Sized;

    /// Continuous non-negative variables
    fn cont(&self, model: &mut Formulation, base_name: &str) -> Self::Out;

    /// Binary variables
    fn binary(&self, model: &mut Formulation, base_name: &str) -> Self::Out;
}

impl AddVars for usize {
    type Out = Vec<Var>;

    fn vars_with<F: FnMut(Self) -> Var>(&self, mut func: F) -> Self::Out {
        let mut vec = Vec::with_capacity(*self);
        for i in 0..*self {
            vec.push(func(i));
        }

        vec
    }

    fn cont(&self, model: &mut Formulation, base_name: &str) -> Self::Out {
        let mut vec = Vec::with_capacity(*self);
        for i in 0..*self {
            vec.push(model.continuous(format!("{}_{}", base_name, i)));
        }

        vec
    }

    fn binary(&self, model: &mut Formulation, base_name: &str) -> Self::Out {
        let mut vec = Vec::with_capacity(*self);
        for i in 0..*self {
            vec.push(model.binary(format!("{}_{}", base_name, i)));
        }

        vec
    }
}

impl AddVars for (usize, usize) {
    type Out = Vec<<usize as AddVars>::Out>;

    fn vars_with<F: FnMut(Self) -> Var>(&self, mut func: F) -> Self::Out {
        let mut out = Vec::with_capacity(self.0);
        for i in 0..self.0 {
            out.push(self.1.vars_with(|j| func((i, j))));
        }

        out
    }

    fn cont(&self, model: &mut Formulation, base_name: &str) -> Self::Out {
        let mut out = Vec::with_capacity(self.0);
        for i in 0..self.0 {
            out.push(self.1.cont(model, &format!("{}_{}", base_name, i)));
        }

        out
    }

    fn binary(&self, model: &mut Formulation, base_name: &str) -> Self::Out {
        let mut out = Vec::with_capacity(self.0);
        for i in 0..self.0 {
            out.push(self.1.binary(model, &format!("{}_{}", base_name, i)));
        }

        out
    }
}

/// Sum an iterator of weighted variables into a linear expression.
pub trait LpSum {
    fn lp_sum(self) -> LinearExpr;
}

impl<I> LpSum for I
where
    I: IntoIterator<Item = (Var, f64)>,
{
    fn lp_sum(self) -> LinearExpr {
        self.into_iter().collect()
    }
}

/// Trait that converts formulation variables to their realized f64 values
pub trait ConvertVars {
    type Out;
    fn convert(&self, assignment: &Assignment) -> Self::Out;
}

impl ConvertVars for Var {
    type Out = f64;

    fn convert(&self, assignment: &Assignment) -> Self::Out {
        assignment[*self]
    }
}

impl<T: ConvertVars> ConvertVars for Vec<T> {
    type Out = Vec<T::Out>;

    fn convert(&self, assignment: &Assignment) -> Self::Out {
        let mut out = Vec::with_capacity(self.len());
        for e in self {
            out.push(e.convert(assignment));
        }

        out
    }
}
