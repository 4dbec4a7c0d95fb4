use std::fmt;

use derive_more::Display;
use float_ord::FloatOrd;
use log::error;

use crate::models::facility_location::Variables;
use crate::models::utils::ConvertVars;
use crate::problem::{Cost, DemandIndex, FacilityIndex, Problem, Quantity};
use crate::solver::Assignment;

/// Absolute tolerance when reconciling flows against capacities and demands
pub const EPSILON: f64 = 1e-6;

/// Relative tolerance when reconciling the cost breakdown with the objective
/// value reported by the backend
const OBJECTIVE_TOLERANCE: f64 = 1e-6;

/// A violation found while validating a claimed optimum. This is not a user
/// facing condition: it means the builder/solver contract was broken, and
/// processing of the instance must abort. When several routes or facilities
/// are in violation, the worst one is the one reported.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum SolutionError {
    /// The pinned opening variable of an installed facility was ignored
    #[display(fmt = "installed facility {:?} is closed in the returned plan", id)]
    InstalledFacilityClosed { id: String },
    /// An open facility ships more than its capacity
    #[display(
        fmt = "facility {:?} ships {} but has capacity {}",
        id,
        shipped,
        capacity
    )]
    CapacityViolated {
        id: String,
        shipped: Quantity,
        capacity: Quantity,
    },
    /// A facility that was never opened ships a non-zero quantity
    #[display(fmt = "facility {:?} is closed but ships {}", id, shipped)]
    ClosedFacilityShips { id: String, shipped: Quantity },
    /// A demand point does not receive exactly its required quantity
    #[display(
        fmt = "demand point {:?} requires {} but receives {}",
        id,
        required,
        received
    )]
    DemandImbalance {
        id: String,
        required: Quantity,
        received: Quantity,
    },
    /// The recomputed cost breakdown disagrees with the backend's objective
    #[display(
        fmt = "cost breakdown {} does not match the reported objective {}",
        total,
        objective
    )]
    ObjectiveMismatch { total: Cost, objective: Cost },
}

impl std::error::Error for SolutionError {}

/// The realized plan for one instance: which facilities operate, and how
/// much each one ships to each demand point.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Facilities put to use, installed ones included. Ordered by index.
    opened: Vec<FacilityIndex>,
    /// Quantity shipped per (facility, demand point) route, zeros included
    flows: Vec<Vec<Quantity>>,
    /// Opening cost of the opened facilities. Installed ones contribute zero.
    opening_cost: Cost,
    /// Cost of the full transport plan
    transport_cost: Cost,
}

impl Solution {
    /// Read the realized plan out of a claimed optimum and validate it
    /// against the instance. A violation means the solver/builder contract
    /// was broken and is fatal for this instance.
    pub fn extract(
        problem: &Problem,
        variables: &Variables,
        assignment: &Assignment,
    ) -> Result<Solution, SolutionError> {
        let y = variables.y.convert(assignment);
        let flows = variables.x.convert(assignment);

        let opened: Vec<FacilityIndex> = y
            .iter()
            .enumerate()
            .filter(|(_, value)| **value > 0.5)
            .map(|(i, _)| i)
            .collect();

        let opening_cost = opened
            .iter()
            .map(|&i| problem.facilities()[i].opening_cost())
            .sum();

        let transport_cost = flows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .map(move |(j, flow)| (i, j, *flow))
            })
            .map(|(i, j, flow)| problem.transport_cost(i, j) * flow)
            .sum();

        let solution = Solution {
            opened,
            flows,
            opening_cost,
            transport_cost,
        };

        if let Err(violation) = solution.validate(problem, assignment.objective()) {
            error!(
                "rejecting claimed optimum for {}: {}",
                problem.name(),
                violation
            );
            return Err(violation);
        }

        Ok(solution)
    }

    fn validate(&self, problem: &Problem, objective: f64) -> Result<(), SolutionError> {
        let facilities = problem.facilities();

        if let Some(facility) = facilities
            .iter()
            .enumerate()
            .find(|(i, f)| f.is_installed() && !self.is_opened(*i))
        {
            return Err(SolutionError::InstalledFacilityClosed {
                id: facility.1.id().to_string(),
            });
        }

        // worst capacity excess among the opened facilities
        let excess = (0..facilities.len())
            .filter(|&i| self.is_opened(i))
            .map(|i| (i, self.shipped(i) - facilities[i].capacity()))
            .max_by_key(|&(_, excess)| FloatOrd(excess));
        if let Some((i, excess)) = excess {
            if excess > EPSILON {
                return Err(SolutionError::CapacityViolated {
                    id: facilities[i].id().to_string(),
                    shipped: self.shipped(i),
                    capacity: facilities[i].capacity(),
                });
            }
        }

        // closed facilities must not ship anything at all
        let leaked = (0..facilities.len())
            .filter(|&i| !self.is_opened(i))
            .map(|i| (i, self.shipped(i)))
            .max_by_key(|&(_, shipped)| FloatOrd(shipped));
        if let Some((i, shipped)) = leaked {
            if shipped > EPSILON {
                return Err(SolutionError::ClosedFacilityShips {
                    id: facilities[i].id().to_string(),
                    shipped,
                });
            }
        }

        // every demand point must receive exactly its required quantity
        let imbalance = problem
            .demand_points()
            .iter()
            .enumerate()
            .map(|(j, d)| (j, d, (self.received(j) - d.demand()).abs()))
            .max_by_key(|&(_, _, gap)| FloatOrd(gap));
        if let Some((j, demand_point, gap)) = imbalance {
            if gap > EPSILON {
                return Err(SolutionError::DemandImbalance {
                    id: demand_point.id().to_string(),
                    required: demand_point.demand(),
                    received: self.received(j),
                });
            }
        }

        let total = self.total_cost();
        if (total - objective).abs() > OBJECTIVE_TOLERANCE * objective.abs().max(1.0) {
            return Err(SolutionError::ObjectiveMismatch { total, objective });
        }

        Ok(())
    }

    /// The facilities put to use, installed ones included. Ordered by index.
    pub fn opened(&self) -> &[FacilityIndex] {
        &self.opened
    }

    pub fn is_opened(&self, facility: FacilityIndex) -> bool {
        self.opened.binary_search(&facility).is_ok()
    }

    /// The full flow matrix, zero entries included
    pub fn flows(&self) -> &[Vec<Quantity>] {
        &self.flows
    }

    /// The quantity shipped from a facility to a demand point
    pub fn flow(&self, facility: FacilityIndex, demand_point: DemandIndex) -> Quantity {
        self.flows[facility][demand_point]
    }

    /// The total quantity leaving a facility
    pub fn shipped(&self, facility: FacilityIndex) -> Quantity {
        self.flows[facility].iter().sum()
    }

    /// The total quantity arriving at a demand point
    pub fn received(&self, demand_point: DemandIndex) -> Quantity {
        self.flows.iter().map(|row| row[demand_point]).sum()
    }

    /// Opening cost of the opened facilities. Installed ones contribute zero.
    pub fn opening_cost(&self) -> Cost {
        self.opening_cost
    }

    /// Cost of the full transport plan
    pub fn transport_cost(&self) -> Cost {
        self.transport_cost
    }

    pub fn total_cost(&self) -> Cost {
        self.opening_cost + self.transport_cost
    }
}

/// A formatted transport plan report, the output counterpart of the tabular
/// input data.
pub struct Report<'a> {
    problem: &'a Problem,
    solution: &'a Solution,
}

impl<'a> Report<'a> {
    pub fn new(problem: &'a Problem, solution: &'a Solution) -> Self {
        Self { problem, solution }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let problem = self.problem;
        let solution = self.solution;

        let width = problem
            .facilities()
            .iter()
            .map(|facility| facility.id().len())
            .max()
            .unwrap_or(0)
            .max(6);

        writeln!(
            f,
            "{}: optimal, total cost {:.2}",
            problem.name(),
            solution.total_cost()
        )?;

        writeln!(f, "  facilities:")?;
        for (i, facility) in problem.facilities().iter().enumerate() {
            let state = match (facility.is_installed(), solution.is_opened(i)) {
                (true, _) => "installed".to_string(),
                (false, true) => format!("opened for {:.2}", facility.opening_cost()),
                (false, false) => "closed".to_string(),
            };

            write!(f, "    {:<width$}  {:<20}", facility.id(), state)?;
            if solution.is_opened(i) {
                write!(
                    f,
                    "  ships {:>8.1} of {:>8.1}",
                    solution.shipped(i),
                    facility.capacity()
                )?;
            }
            writeln!(f)?;
        }

        writeln!(f, "  transport plan:")?;
        write!(f, "    {:<width$}", "")?;
        for demand_point in problem.demand_points() {
            write!(f, " {:>8}", demand_point.id())?;
        }
        writeln!(f)?;

        for (i, facility) in problem.facilities().iter().enumerate() {
            write!(f, "    {:<width$}", facility.id())?;
            for j in 0..problem.demand_points().len() {
                write!(f, " {:>8.1}", solution.flow(i, j))?;
            }
            writeln!(f)?;
        }

        write!(f, "    {:<width$}", "")?;
        for j in 0..problem.demand_points().len() {
            write!(f, " {:>8.1}", solution.received(j))?;
        }
        writeln!(f)?;

        writeln!(f, "  opening cost:   {:>14.2}", solution.opening_cost())?;
        writeln!(f, "  transport cost: {:>14.2}", solution.transport_cost())?;
        write!(f, "  total cost:     {:>14.2}", solution.total_cost())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::facility_location::{FacilityLocationSolver, Parameters, Sets};
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

    fn variables(problem: &Problem) -> Variables {
        let sets = Sets::new(problem);
        let parameters = Parameters::new(problem);
        FacilityLocationSolver::build(&sets, &parameters, problem.name()).1
    }

    /// Assignment in variable creation order: y_0, y_1, x_0_0, x_0_1,
    /// x_1_0, x_1_1.
    fn assignment(y: [f64; 2], x: [f64; 4], objective: f64) -> Assignment {
        let values = y.into_iter().chain(x).collect();
        Assignment::new(values, objective)
    }

    #[test]
    fn extracts_a_consistent_plan() {
        let problem = problem();
        let variables = variables(&problem);
        // serve everything from the installed CD1: 16 * 60 + 20 * 65
        let assignment = assignment([1.0, 0.0], [16.0, 20.0, 0.0, 0.0], 2260.0);

        let solution = Solution::extract(&problem, &variables, &assignment).unwrap();
        assert_eq!(solution.opened(), &[0]);
        assert!(solution.is_opened(0));
        assert!(!solution.is_opened(1));
        assert_eq!(solution.flow(0, 1), 20.0);
        assert_eq!(solution.shipped(0), 36.0);
        assert_eq!(solution.shipped(1), 0.0);
        assert_eq!(solution.received(1), 20.0);
        assert_eq!(solution.opening_cost(), 0.0);
        assert_eq!(solution.transport_cost(), 2260.0);
        assert_eq!(solution.total_cost(), 2260.0);
    }

    #[test]
    fn opening_costs_count_only_for_opened_optional_facilities() {
        let problem = problem();
        let variables = variables(&problem);
        // both open, CD2 takes CC2: 16 * 60 + 20 * 54 + 500000
        let assignment = assignment([1.0, 1.0], [16.0, 0.0, 0.0, 20.0], 502_040.0);

        let solution = Solution::extract(&problem, &variables, &assignment).unwrap();
        assert_eq!(solution.opened(), &[0, 1]);
        assert_eq!(solution.opening_cost(), 500_000.0);
        assert_eq!(solution.transport_cost(), 2040.0);
    }

    #[test]
    fn rejects_demand_imbalance() {
        let problem = problem();
        let variables = variables(&problem);
        let assignment = assignment([1.0, 0.0], [16.0, 19.0, 0.0, 0.0], 2195.0);

        assert_eq!(
            Solution::extract(&problem, &variables, &assignment),
            Err(SolutionError::DemandImbalance {
                id: "CC2".into(),
                required: 20.0,
                received: 19.0,
            })
        );
    }

    #[test]
    fn rejects_flow_from_closed_facility() {
        let problem = problem();
        let variables = variables(&problem);
        let assignment = assignment([1.0, 0.0], [16.0, 0.0, 0.0, 20.0], 2040.0);

        assert_eq!(
            Solution::extract(&problem, &variables, &assignment),
            Err(SolutionError::ClosedFacilityShips {
                id: "CD2".into(),
                shipped: 20.0,
            })
        );
    }

    #[test]
    fn rejects_capacity_violation() {
        let problem = problem();
        let variables = variables(&problem);
        let assignment = assignment([1.0, 0.0], [30.0, 26.0, 0.0, 0.0], 3490.0);

        assert_eq!(
            Solution::extract(&problem, &variables, &assignment),
            Err(SolutionError::CapacityViolated {
                id: "CD1".into(),
                shipped: 56.0,
                capacity: 50.0,
            })
        );
    }

    #[test]
    fn rejects_ignored_installed_facility() {
        let problem = problem();
        let variables = variables(&problem);
        let assignment = assignment([0.0, 1.0], [0.0, 0.0, 16.0, 20.0], 501_800.0);

        assert_eq!(
            Solution::extract(&problem, &variables, &assignment),
            Err(SolutionError::InstalledFacilityClosed { id: "CD1".into() })
        );
    }

    #[test]
    fn rejects_objective_that_does_not_reconcile() {
        let problem = problem();
        let variables = variables(&problem);
        let assignment = assignment([1.0, 0.0], [16.0, 20.0, 0.0, 0.0], 9999.0);

        assert_eq!(
            Solution::extract(&problem, &variables, &assignment),
            Err(SolutionError::ObjectiveMismatch {
                total: 2260.0,
                objective: 9999.0,
            })
        );
    }

    #[test]
    fn tiny_numeric_noise_is_tolerated() {
        let problem = problem();
        let variables = variables(&problem);
        let noise = 1e-9;
        let assignment = assignment([1.0, 0.0], [16.0 + noise, 20.0 - noise, 0.0, 0.0], 2260.0);

        assert!(Solution::extract(&problem, &variables, &assignment).is_ok());
    }

    #[test]
    fn report_lays_out_the_flow_table() {
        let problem = problem();
        let variables = variables(&problem);
        let assignment = assignment([1.0, 0.0], [16.0, 20.0, 0.0, 0.0], 2260.0);
        let solution = Solution::extract(&problem, &variables, &assignment).unwrap();

        let report = Report::new(&problem, &solution).to_string();
        assert!(report.contains("fuel: optimal, total cost 2260.00"));
        assert!(report.contains("CC1"));
        assert!(report.contains("16.0"));
        assert!(report.contains("closed"));
        assert!(report.contains("total cost:"));
    }
}
