use std::fmt;
use std::ops::Add;

/// A reference to a decision variable in a [`Formulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(usize);

impl Var {
    /// Sequence number of the variable within its formulation
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The kind of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Continuous within its bounds
    Continuous,
    /// Restricted to {0, 1}, possibly pinned to one of them through its bounds
    Binary,
}

/// A decision variable together with its bounds and objective coefficient.
#[derive(Debug, Clone)]
pub struct VarDef {
    name: String,
    kind: VarKind,
    lower: f64,
    upper: f64,
    objective: f64,
}

impl VarDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VarKind {
        self.kind
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// The coefficient of this variable in the minimization objective
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Whether the bounds leave only a single feasible value
    pub fn is_pinned(&self) -> bool {
        self.lower == self.upper
    }
}

/// A linear combination of decision variables.
#[derive(Debug, Clone, Default)]
pub struct LinearExpr {
    terms: Vec<(Var, f64)>,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, var: Var, coeff: f64) {
        self.terms.push((var, coeff));
    }

    pub fn terms(&self) -> &[(Var, f64)] {
        &self.terms
    }
}

impl FromIterator<(Var, f64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (Var, f64)>>(iter: I) -> Self {
        Self {
            terms: iter.into_iter().collect(),
        }
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self.terms.extend(rhs.terms);
        self
    }
}

/// The relation between the left- and right-hand sides of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// lhs ≤ rhs
    Le,
    /// lhs = rhs
    Eq,
    /// lhs ≥ rhs
    Ge,
}

/// A single linear constraint `lhs <sense> rhs`.
#[derive(Debug, Clone)]
pub struct Constraint {
    name: String,
    lhs: LinearExpr,
    sense: Sense,
    rhs: f64,
}

impl Constraint {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lhs(&self) -> &LinearExpr {
        &self.lhs
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn rhs(&self) -> f64 {
        self.rhs
    }
}

/// A MILP formulation in explicit form: a minimization objective over a set
/// of binary and continuous variables, subject to linear constraints. The
/// formulation is plain data, so any backend implementing
/// [`MilpSolver`](crate::solver::MilpSolver) can be handed one.
#[derive(Debug, Clone)]
pub struct Formulation {
    name: String,
    variables: Vec<VarDef>,
    constraints: Vec<Constraint>,
}

impl Formulation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn add_var(&mut self, name: String, kind: VarKind, lower: f64, upper: f64) -> Var {
        let var = Var(self.variables.len());
        self.variables.push(VarDef {
            name,
            kind,
            lower,
            upper,
            objective: 0.0,
        });
        var
    }

    /// A free binary variable
    pub fn binary(&mut self, name: impl Into<String>) -> Var {
        self.add_var(name.into(), VarKind::Binary, 0.0, 1.0)
    }

    /// A binary variable pinned to a fixed value through its bounds
    pub fn fixed_binary(&mut self, name: impl Into<String>, value: bool) -> Var {
        let value = if value { 1.0 } else { 0.0 };
        self.add_var(name.into(), VarKind::Binary, value, value)
    }

    /// A continuous non-negative variable
    pub fn continuous(&mut self, name: impl Into<String>) -> Var {
        self.add_var(name.into(), VarKind::Continuous, 0.0, f64::INFINITY)
    }

    /// Set the minimization objective. Coefficients of variables that occur
    /// several times in `expr` accumulate; variables not mentioned get a zero
    /// coefficient. Replaces any previously set objective.
    pub fn set_objective(&mut self, expr: LinearExpr) {
        for def in &mut self.variables {
            def.objective = 0.0;
        }

        for (var, coeff) in expr.terms {
            self.variables[var.index()].objective += coeff;
        }
    }

    /// Add the constraint `lhs <sense> rhs` to the formulation
    pub fn subject_to(&mut self, name: impl Into<String>, lhs: LinearExpr, sense: Sense, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            lhs,
            sense,
            rhs,
        });
    }

    pub fn variables(&self) -> &[VarDef] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
}

fn write_term(f: &mut fmt::Formatter, first: &mut bool, coeff: f64, name: &str) -> fmt::Result {
    if coeff < 0.0 {
        write!(f, " -")?;
    } else if !*first {
        write!(f, " +")?;
    }
    *first = false;

    let magnitude = coeff.abs();
    if magnitude == 1.0 {
        write!(f, " {}", name)
    } else {
        write!(f, " {} {}", magnitude, name)
    }
}

/// Renders the formulation as LP-format text, suitable for dumping the model
/// to a log or a file for inspection with external tooling.
impl fmt::Display for Formulation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "\\ {}", self.name)?;

        writeln!(f, "Minimize")?;
        write!(f, " obj:")?;
        let mut first = true;
        for def in &self.variables {
            if def.objective != 0.0 {
                write_term(f, &mut first, def.objective, &def.name)?;
            }
        }
        if first {
            write!(f, " 0")?;
        }
        writeln!(f)?;

        writeln!(f, "Subject To")?;
        for constraint in &self.constraints {
            write!(f, " {}:", constraint.name)?;
            let mut first = true;
            for &(var, coeff) in constraint.lhs.terms() {
                write_term(f, &mut first, coeff, &self.variables[var.index()].name)?;
            }
            let sense = match constraint.sense {
                Sense::Le => "<=",
                Sense::Eq => "=",
                Sense::Ge => ">=",
            };
            writeln!(f, " {} {}", sense, constraint.rhs)?;
        }

        if self.variables.iter().any(VarDef::is_pinned) {
            writeln!(f, "Bounds")?;
            for def in self.variables.iter().filter(|def| def.is_pinned()) {
                writeln!(f, " {} = {}", def.name, def.lower)?;
            }
        }

        if self.variables.iter().any(|def| def.kind == VarKind::Binary) {
            writeln!(f, "Binaries")?;
            for def in self.variables.iter().filter(|def| def.kind == VarKind::Binary) {
                write!(f, " {}", def.name)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "End")
    }
}
