//! Route building: stop sequencing and path retrieval per vehicle.

use serde::Serialize;
use tracing::debug;

use crate::geometry::Point;
use crate::haversine::haversine_km;
use crate::models::{Target, Vehicle};
use crate::polyline::Polyline;
use crate::traits::RoutePathProvider;

/// One vehicle's planned route for this run.
#[derive(Debug, Clone, Serialize)]
pub struct RouteRecord {
    pub vehicle_id: String,
    pub vehicle_type: String,
    pub license_plate: String,
    /// Service area the vehicle was partitioned into, when any.
    pub area: Option<String>,
    /// Seats taken by this plan.
    pub capacity_used: u32,
    pub distance_km: f64,
    /// Absent when the routing provider was down and legs degraded to
    /// straight lines; no duration is estimated by other means.
    pub duration_min: Option<f64>,
    pub geometry: Polyline,
}

/// One pickup along a vehicle's route.
#[derive(Debug, Clone, Serialize)]
pub struct StopRecord {
    pub vehicle_id: String,
    /// 1-based position in the visiting order.
    pub sequence: u32,
    pub target_id: String,
    pub target_name: String,
    pub location: Point,
}

/// Orders picks by repeated nearest-neighbor selection from the vehicle's
/// current position. Ties break first-found.
pub fn order_stops(start: Point, picks: &[Target]) -> Vec<Target> {
    let mut remaining: Vec<Target> = picks.to_vec();
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut position = start;

    while !remaining.is_empty() {
        let mut nearest = 0;
        let mut nearest_km = haversine_km(position, remaining[0].location);
        for (index, candidate) in remaining.iter().enumerate().skip(1) {
            let km = haversine_km(position, candidate.location);
            if km < nearest_km {
                nearest = index;
                nearest_km = km;
            }
        }
        let next = remaining.remove(nearest);
        position = next.location;
        ordered.push(next);
    }

    ordered
}

/// Builds the route and stop records for one vehicle's finalized picks.
///
/// Asks the routing provider for a drivable path through start + stops; on
/// failure the path degrades to straight-line segments with geodesic leg
/// distances and no duration.
pub fn build_route(
    vehicle: &Vehicle,
    picks: &[Target],
    area: Option<&str>,
    provider: &(impl RoutePathProvider + ?Sized),
) -> (RouteRecord, Vec<StopRecord>) {
    let ordered = order_stops(vehicle.location, picks);

    let mut waypoints = Vec::with_capacity(ordered.len() + 1);
    waypoints.push(vehicle.location);
    waypoints.extend(ordered.iter().map(|target| target.location));

    let (geometry, distance_km, duration_min) = match provider.route_path(&waypoints) {
        Some(path) => (path.geometry, path.distance_km, Some(path.duration_min)),
        None => {
            debug!(vehicle_id = %vehicle.id, "using straight-line path");
            let fallback = Polyline::new(waypoints);
            let distance_km = fallback.length_km();
            (fallback, distance_km, None)
        }
    };

    let stops = ordered
        .iter()
        .enumerate()
        .map(|(index, target)| StopRecord {
            vehicle_id: vehicle.id.clone(),
            sequence: index as u32 + 1,
            target_id: target.id.clone(),
            target_name: target.name.clone(),
            location: target.location,
        })
        .collect();

    let record = RouteRecord {
        vehicle_id: vehicle.id.clone(),
        vehicle_type: vehicle.vehicle_type.clone(),
        license_plate: vehicle.license_plate.clone(),
        area: area.map(str::to_string),
        capacity_used: ordered.len() as u32,
        distance_km,
        duration_min,
        geometry,
    };

    (record, stops)
}
