use crate::problem::{Cost, DemandIndex, FacilityIndex, Problem, Quantity};

/// sets for the facility location model
#[derive(Debug)]
#[allow(non_snake_case)]
pub struct Sets {
    /// Set of candidate facilities
    pub I: Vec<FacilityIndex>,
    /// Set of demand points
    pub J: Vec<DemandIndex>,
}

/// parameters for the facility location model
#[derive(Debug)]
#[allow(non_snake_case)]
pub struct Parameters {
    /// Fixed cost of opening facility i. Zero for installed facilities.
    pub f: Vec<Cost>,
    /// Unit cost of transporting from facility i to demand point j
    pub C: Vec<Vec<Cost>>,
    /// Supply capacity of facility i
    pub a: Vec<Quantity>,
    /// Required quantity at demand point j
    pub b: Vec<Quantity>,
    /// Facilities that are already installed. Their opening decision is not
    /// free, the corresponding y_i is pinned to one.
    pub installed: Vec<bool>,
}

impl Sets {
    pub fn new(problem: &Problem) -> Sets {
        Sets {
            I: (0..problem.facilities().len()).collect(),
            J: (0..problem.demand_points().len()).collect(),
        }
    }
}

impl Parameters {
    pub fn new(problem: &Problem) -> Parameters {
        let facilities = problem.facilities();
        let demand_points = problem.demand_points();

        Parameters {
            f: facilities.iter().map(|f| f.opening_cost()).collect(),
            C: (0..facilities.len())
                .map(|i| {
                    (0..demand_points.len())
                        .map(|j| problem.transport_cost(i, j))
                        .collect()
                })
                .collect(),
            a: facilities.iter().map(|f| f.capacity()).collect(),
            b: demand_points.iter().map(|d| d.demand()).collect(),
            installed: facilities.iter().map(|f| f.is_installed()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{DemandPoint, Facility};

    #[test]
    fn derived_from_problem() {
        let problem = Problem::new(
            "fuel",
            vec![
                Facility::installed("CD1", 50.0),
                Facility::candidate("CD2", 500_000.0, 75.0),
            ],
            vec![DemandPoint::new("CC1", 16.0), DemandPoint::new("CC2", 20.0)],
            vec![vec![60.0, 65.0], vec![45.0, 54.0]],
        )
        .unwrap();

        let sets = Sets::new(&problem);
        let parameters = Parameters::new(&problem);

        assert_eq!(sets.I, vec![0, 1]);
        assert_eq!(sets.J, vec![0, 1]);
        assert_eq!(parameters.f, vec![0.0, 500_000.0]);
        assert_eq!(parameters.a, vec![50.0, 75.0]);
        assert_eq!(parameters.b, vec![16.0, 20.0]);
        assert_eq!(parameters.C[1], vec![45.0, 54.0]);
        assert_eq!(parameters.installed, vec![true, false]);
    }
}
