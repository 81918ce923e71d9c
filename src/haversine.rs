//! Great-circle distance and the geodesic fallback cost provider.
//!
//! Estimates travel time from straight-line distance and an assumed speed.
//! Less accurate than a road-network provider (ignores roads) but always
//! available, so the dispatch pipeline can degrade to it.

use crate::geometry::Point;
use crate::traits::{CostMatrix, CostMatrixProvider};

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(from: Point, to: Point) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Haversine-based cost matrix provider.
///
/// Converts geodesic distance into travel minutes at an assumed speed.
/// Never fails, which makes it the fallback of last resort.
#[derive(Debug, Clone)]
pub struct HaversineCost {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineCost {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineCost {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    fn km_to_minutes(&self, km: f64) -> f64 {
        km / self.speed_kmh * 60.0
    }
}

impl CostMatrixProvider for HaversineCost {
    fn cost_matrix(&self, origins: &[Point], destinations: &[Point]) -> Option<CostMatrix> {
        let matrix = origins
            .iter()
            .map(|from| {
                destinations
                    .iter()
                    .map(|to| self.km_to_minutes(haversine_km(*from, *to)))
                    .collect()
            })
            .collect();

        Some(matrix)
    }
}
