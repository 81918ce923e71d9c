//! OSRM HTTP adapter for cost matrices and drivable paths.

use serde::Deserialize;
use tracing::warn;

use crate::geometry::Point;
use crate::polyline::Polyline;
use crate::traits::{CostMatrix, CostMatrixProvider, DrivenPath, RoutePathProvider};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn coord_path(points: impl Iterator<Item = Point>) -> String {
        points
            .map(|point| format!("{:.6},{:.6}", point.lon, point.lat))
            .collect::<Vec<_>>()
            .join(";")
    }

    fn index_list(range: std::ops::Range<usize>) -> String {
        range
            .map(|index| index.to_string())
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl CostMatrixProvider for OsrmClient {
    /// One batched `table` query for the full origins × destinations
    /// cross-product. Durations come back in seconds and are reported in
    /// minutes.
    fn cost_matrix(&self, origins: &[Point], destinations: &[Point]) -> Option<CostMatrix> {
        if origins.is_empty() || destinations.is_empty() {
            return Some(Vec::new());
        }

        let coords = Self::coord_path(origins.iter().chain(destinations.iter()).copied());
        let url = format!(
            "{}/table/v1/{}/{}?annotations=duration&sources={}&destinations={}",
            self.config.base_url,
            self.config.profile,
            coords,
            Self::index_list(0..origins.len()),
            Self::index_list(origins.len()..origins.len() + destinations.len()),
        );

        let response = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmTableResponse>());

        match response {
            Ok(body) => {
                let durations = body.durations?;
                if durations.len() != origins.len() {
                    warn!(
                        rows = durations.len(),
                        origins = origins.len(),
                        "OSRM table shape mismatch, degrading to geodesic cost"
                    );
                    return None;
                }
                Some(
                    durations
                        .into_iter()
                        .map(|row| row.into_iter().map(|secs| secs / 60.0).collect())
                        .collect(),
                )
            }
            Err(err) => {
                warn!(error = %err, "OSRM table request failed, degrading to geodesic cost");
                None
            }
        }
    }
}

impl RoutePathProvider for OsrmClient {
    /// One `route` query through the ordered stops, geometry as GeoJSON.
    fn route_path(&self, stops: &[Point]) -> Option<DrivenPath> {
        if stops.len() < 2 {
            return None;
        }

        let coords = Self::coord_path(stops.iter().copied());
        let url = format!(
            "{}/route/v1/{}/{}?overview=full&geometries=geojson",
            self.config.base_url, self.config.profile, coords
        );

        let response = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmRouteResponse>());

        match response {
            Ok(body) => {
                let route = body.routes.into_iter().next()?;
                Some(DrivenPath {
                    geometry: Polyline::new(route.geometry.coordinates),
                    distance_km: route.distance / 1000.0,
                    duration_min: route.duration / 60.0,
                })
            }
            Err(err) => {
                warn!(error = %err, "OSRM route request failed, degrading to straight-line path");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    durations: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    /// Meters.
    distance: f64,
    /// Seconds.
    duration: f64,
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<Point>,
}
