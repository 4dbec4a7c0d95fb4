use derive_more::Display;

/// The type used for supply and demand quantities
pub type Quantity = f64;
/// The type used for cost.
pub type Cost = f64;

pub type FacilityIndex = usize;
pub type DemandIndex = usize;

/// A candidate distribution center. Either already installed, or optional
/// with a fixed opening cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    /// Human-readable identifier, e.g. "CD2"
    id: String,
    /// Whether the facility is already installed
    installed: bool,
    /// The fixed cost of opening this facility. Zero for installed ones.
    opening_cost: Cost,
    /// The maximum total quantity this facility can ship
    capacity: Quantity,
}

impl Facility {
    pub fn new(
        id: impl Into<String>,
        installed: bool,
        opening_cost: Cost,
        capacity: Quantity,
    ) -> Self {
        Self {
            id: id.into(),
            installed,
            opening_cost,
            capacity,
        }
    }

    /// An already installed facility. Its opening cost is sunk, and thus zero.
    pub fn installed(id: impl Into<String>, capacity: Quantity) -> Self {
        Self::new(id, true, 0.0, capacity)
    }

    /// A facility that may be opened at a fixed cost.
    pub fn candidate(id: impl Into<String>, opening_cost: Cost, capacity: Quantity) -> Self {
        Self::new(id, false, opening_cost, capacity)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the facility is already installed
    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// The fixed cost of opening this facility
    pub fn opening_cost(&self) -> Cost {
        self.opening_cost
    }

    /// The maximum total quantity this facility can ship
    pub fn capacity(&self) -> Quantity {
        self.capacity
    }
}

/// A demand point that must receive exactly its required quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandPoint {
    /// Human-readable identifier, e.g. "CC3"
    id: String,
    /// The quantity that must be delivered to this point
    demand: Quantity,
}

impl DemandPoint {
    pub fn new(id: impl Into<String>, demand: Quantity) -> Self {
        Self {
            id: id.into(),
            demand,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The quantity that must be delivered to this point
    pub fn demand(&self) -> Quantity {
        self.demand
    }
}

/// A single-commodity instance of the capacitated facility location problem.
/// Instances are value types with no shared state, and may be solved
/// independently of each other.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// The name of the commodity this instance concerns
    name: String,
    /// The candidate facilities. Assumed to be ordered by index
    facilities: Vec<Facility>,
    /// The demand points. Assumed to be ordered by index
    demand_points: Vec<DemandPoint>,
    /// Unit transport cost from facility `i` to demand point `j`.
    /// The route set is the full cross product.
    transport_costs: Vec<Vec<Cost>>,
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum ProblemConstructionError {
    /// There must be at least one facility
    #[display(fmt = "the instance has no facilities")]
    NoFacilities,
    /// There must be at least one demand point
    #[display(fmt = "the instance has no demand points")]
    NoDemandPoints,
    /// Two facilities share the same identifier
    #[display(fmt = "duplicate facility id {:?}", _0)]
    DuplicateFacilityId(String),
    /// Two demand points share the same identifier
    #[display(fmt = "duplicate demand point id {:?}", _0)]
    DuplicateDemandPointId(String),
    /// Opening costs must be non-negative
    #[display(fmt = "facility {:?} has negative opening cost {}", id, cost)]
    NegativeOpeningCost { id: String, cost: Cost },
    /// An installed facility's opening cost is sunk and must be zero
    #[display(fmt = "installed facility {:?} has non-zero opening cost {}", id, cost)]
    InstalledWithOpeningCost { id: String, cost: Cost },
    /// Capacities must be non-negative
    #[display(fmt = "facility {:?} has negative capacity {}", id, capacity)]
    NegativeCapacity { id: String, capacity: Quantity },
    /// Demands must be strictly positive
    #[display(fmt = "demand point {:?} has non-positive demand {}", id, demand)]
    NonPositiveDemand { id: String, demand: Quantity },
    /// The size of the transport cost matrix is not as expected
    #[display(
        fmt = "transport cost matrix has size {:?}, expected {:?}",
        actual,
        expected
    )]
    CostMatrixSizeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// Unit transport costs must be non-negative
    #[display(
        fmt = "negative transport cost {} from facility {:?} to demand point {:?}",
        cost,
        facility,
        demand_point
    )]
    NegativeTransportCost {
        facility: String,
        demand_point: String,
        cost: Cost,
    },
}

impl std::error::Error for ProblemConstructionError {}

impl Problem {
    /// Construct a validated instance. All malformed data is rejected here,
    /// before any formulation is built. Note that an instance whose total
    /// capacity cannot cover total demand is *not* rejected: infeasibility
    /// is the solver's verdict, not a construction error.
    pub fn new(
        name: impl Into<String>,
        facilities: Vec<Facility>,
        demand_points: Vec<DemandPoint>,
        transport_costs: Vec<Vec<Cost>>,
    ) -> Result<Problem, ProblemConstructionError> {
        use ProblemConstructionError::*;

        if facilities.is_empty() {
            return Err(NoFacilities);
        }

        if demand_points.is_empty() {
            return Err(NoDemandPoints);
        }

        for (i, facility) in facilities.iter().enumerate() {
            if facilities[..i].iter().any(|other| other.id == facility.id) {
                return Err(DuplicateFacilityId(facility.id.clone()));
            }

            if facility.opening_cost < 0.0 {
                return Err(NegativeOpeningCost {
                    id: facility.id.clone(),
                    cost: facility.opening_cost,
                });
            }

            if facility.installed && facility.opening_cost != 0.0 {
                return Err(InstalledWithOpeningCost {
                    id: facility.id.clone(),
                    cost: facility.opening_cost,
                });
            }

            if facility.capacity < 0.0 {
                return Err(NegativeCapacity {
                    id: facility.id.clone(),
                    capacity: facility.capacity,
                });
            }
        }

        for (j, demand_point) in demand_points.iter().enumerate() {
            if demand_points[..j]
                .iter()
                .any(|other| other.id == demand_point.id)
            {
                return Err(DuplicateDemandPointId(demand_point.id.clone()));
            }

            if demand_point.demand <= 0.0 {
                return Err(NonPositiveDemand {
                    id: demand_point.id.clone(),
                    demand: demand_point.demand,
                });
            }
        }

        let expected = (facilities.len(), demand_points.len());
        let rows = transport_costs.len();

        if rows != expected.0 {
            let columns = transport_costs.first().map(|row| row.len()).unwrap_or(0);
            return Err(CostMatrixSizeMismatch {
                expected,
                actual: (rows, columns),
            });
        }

        if let Some(row) = transport_costs.iter().find(|row| row.len() != expected.1) {
            return Err(CostMatrixSizeMismatch {
                expected,
                actual: (rows, row.len()),
            });
        }

        for (i, row) in transport_costs.iter().enumerate() {
            for (j, &cost) in row.iter().enumerate() {
                if cost < 0.0 {
                    return Err(NegativeTransportCost {
                        facility: facilities[i].id.clone(),
                        demand_point: demand_points[j].id.clone(),
                        cost,
                    });
                }
            }
        }

        Ok(Problem {
            name: name.into(),
            facilities,
            demand_points,
            transport_costs,
        })
    }

    /// The name of the commodity this instance concerns
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The candidate facilities. Ordered by index (continuous, starting at 0)
    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    /// The demand points. Ordered by index (continuous, starting at 0)
    pub fn demand_points(&self) -> &[DemandPoint] {
        &self.demand_points
    }

    /// The unit transport cost from a facility to a demand point
    pub fn transport_cost(&self, facility: FacilityIndex, demand_point: DemandIndex) -> Cost {
        self.transport_costs[facility][demand_point]
    }

    /// The combined capacity of all facilities, installed and optional
    pub fn total_capacity(&self) -> Quantity {
        self.facilities.iter().map(|f| f.capacity).sum()
    }

    /// The combined demand of all demand points
    pub fn total_demand(&self) -> Quantity {
        self.demand_points.iter().map(|d| d.demand).sum()
    }
}
