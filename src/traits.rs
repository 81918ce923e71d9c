//! Seams between the dispatch core and its collaborators.
//!
//! Data sources and travel providers are passed into the orchestrator as
//! explicit handles; concrete apps implement these for their own transports.

use thiserror::Error;

use crate::geometry::Point;
use crate::models::{HazardZone, Target, Vehicle};
use crate::polyline::Polyline;

/// Travel-cost estimates in minutes, row per origin, column per destination.
pub type CostMatrix = Vec<Vec<f64>>;

/// Produces a travel-cost matrix between origins and destinations.
///
/// `None` signals that the provider is unavailable (timeout, bad status,
/// malformed body). Callers must substitute geodesic distance; unavailability
/// is never fatal to a run.
pub trait CostMatrixProvider {
    fn cost_matrix(&self, origins: &[Point], destinations: &[Point]) -> Option<CostMatrix>;
}

/// A drivable path returned by a routing provider.
#[derive(Debug, Clone, PartialEq)]
pub struct DrivenPath {
    pub geometry: Polyline,
    pub distance_km: f64,
    pub duration_min: f64,
}

/// Produces a drivable path through an ordered list of stops.
///
/// `None` signals provider failure; callers fall back to straight-line
/// segments with geodesic leg distances.
pub trait RoutePathProvider {
    fn route_path(&self, stops: &[Point]) -> Option<DrivenPath>;
}

/// Failure fetching from one collaborator. Isolated per source: a failing
/// source contributes zero records to the run, it does not abort gathering.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed payload: {0}")]
    Decode(String),
}

/// Hazard-zone records, either pre-filtered to active or raw with windows.
pub trait HazardSource {
    fn fetch_hazards(&self) -> Result<Vec<HazardZone>, SourceError>;
}

/// Evacuee records from one or more registries.
pub trait TargetSource {
    fn fetch_targets(&self) -> Result<Vec<Target>, SourceError>;
}

/// Fleet state from the vehicle provider.
pub trait VehicleSource {
    fn fetch_vehicles(&self) -> Result<Vec<Vehicle>, SourceError>;
}
