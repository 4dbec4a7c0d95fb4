use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use derive_more::Display;
use log::debug;
use serde::Deserialize;

use crate::problem::{DemandPoint, Facility, Problem, ProblemConstructionError};

/// Raw facility row of the instance file
#[derive(Debug, Clone, Deserialize)]
pub struct FacilityRecord {
    pub id: String,
    #[serde(default)]
    pub installed: bool,
    #[serde(default)]
    pub opening_cost: f64,
    pub capacity: f64,
}

/// Raw demand point row of the instance file
#[derive(Debug, Clone, Deserialize)]
pub struct DemandPointRecord {
    pub id: String,
    pub demand: f64,
}

/// One entry of the unit transport cost matrix
#[derive(Debug, Clone, Deserialize)]
pub struct RouteRecord {
    pub facility: String,
    pub demand_point: String,
    pub unit_cost: f64,
}

/// One commodity. Commodities are solved as fully independent instances.
#[derive(Debug, Clone, Deserialize)]
pub struct CommodityRecord {
    pub name: String,
    pub facilities: Vec<FacilityRecord>,
    pub demand_points: Vec<DemandPointRecord>,
    pub routes: Vec<RouteRecord>,
}

#[derive(Debug, Deserialize)]
pub struct InstanceFile {
    pub commodities: Vec<CommodityRecord>,
}

/// A malformed instance file. Detected before any formulation is built and
/// reported to the caller, never silently defaulted.
#[derive(Debug, Display)]
pub enum LoadError {
    #[display(fmt = "could not read instance file: {}", _0)]
    Io(std::io::Error),
    #[display(fmt = "malformed instance file: {}", _0)]
    Json(serde_json::Error),
    #[display(
        fmt = "commodity {}: route references unknown facility {:?}",
        commodity,
        id
    )]
    UnknownFacility { commodity: String, id: String },
    #[display(
        fmt = "commodity {}: route references unknown demand point {:?}",
        commodity,
        id
    )]
    UnknownDemandPoint { commodity: String, id: String },
    #[display(
        fmt = "commodity {}: duplicate route from {:?} to {:?}",
        commodity,
        facility,
        demand_point
    )]
    DuplicateRoute {
        commodity: String,
        facility: String,
        demand_point: String,
    },
    #[display(
        fmt = "commodity {}: no route from {:?} to {:?}",
        commodity,
        facility,
        demand_point
    )]
    MissingRoute {
        commodity: String,
        facility: String,
        demand_point: String,
    },
    #[display(fmt = "commodity {}: {}", commodity, source)]
    Construction {
        commodity: String,
        source: ProblemConstructionError,
    },
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(source) => Some(source),
            LoadError::Json(source) => Some(source),
            LoadError::Construction { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(source: std::io::Error) -> Self {
        LoadError::Io(source)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(source: serde_json::Error) -> Self {
        LoadError::Json(source)
    }
}

/// Load every commodity instance from a JSON file
pub fn load_instances(path: impl AsRef<Path>) -> Result<Vec<Problem>, LoadError> {
    let file = File::open(path)?;
    read_instances(BufReader::new(file))
}

/// Load every commodity instance from a reader yielding JSON
pub fn read_instances(reader: impl Read) -> Result<Vec<Problem>, LoadError> {
    let file: InstanceFile = serde_json::from_reader(reader)?;
    file.commodities.into_iter().map(build).collect()
}

/// Assemble the dense cost matrix from the route entries and hand everything
/// to [`Problem::new`] for validation. The route set must cover the full
/// facility x demand point cross product exactly once.
fn build(record: CommodityRecord) -> Result<Problem, LoadError> {
    let commodity = record.name.clone();
    let n = record.facilities.len();
    let m = record.demand_points.len();

    let mut costs = vec![vec![0.0; m]; n];
    let mut seen = vec![vec![false; m]; n];

    {
        let facility_index: HashMap<&str, usize> = record
            .facilities
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id.as_str(), i))
            .collect();
        let demand_index: HashMap<&str, usize> = record
            .demand_points
            .iter()
            .enumerate()
            .map(|(j, d)| (d.id.as_str(), j))
            .collect();

        for route in &record.routes {
            let i = *facility_index.get(route.facility.as_str()).ok_or_else(|| {
                LoadError::UnknownFacility {
                    commodity: commodity.clone(),
                    id: route.facility.clone(),
                }
            })?;
            let j = *demand_index.get(route.demand_point.as_str()).ok_or_else(|| {
                LoadError::UnknownDemandPoint {
                    commodity: commodity.clone(),
                    id: route.demand_point.clone(),
                }
            })?;

            if seen[i][j] {
                return Err(LoadError::DuplicateRoute {
                    commodity,
                    facility: route.facility.clone(),
                    demand_point: route.demand_point.clone(),
                });
            }

            seen[i][j] = true;
            costs[i][j] = route.unit_cost;
        }
    }

    for (i, row) in seen.iter().enumerate() {
        if let Some(j) = row.iter().position(|&covered| !covered) {
            return Err(LoadError::MissingRoute {
                commodity,
                facility: record.facilities[i].id.clone(),
                demand_point: record.demand_points[j].id.clone(),
            });
        }
    }

    debug!(
        "loaded commodity {}: {} facilities, {} demand points",
        commodity, n, m
    );

    let facilities = record
        .facilities
        .into_iter()
        .map(|f| Facility::new(f.id, f.installed, f.opening_cost, f.capacity))
        .collect();
    let demand_points = record
        .demand_points
        .into_iter()
        .map(|d| DemandPoint::new(d.id, d.demand))
        .collect();

    Problem::new(record.name, facilities, demand_points, costs).map_err(|source| {
        LoadError::Construction {
            commodity,
            source,
        }
    })
}
