//! Polyline representation for route geometries.
//!
//! Stores decoded coordinate sequences directly for internal processing.
//! Encoding to a compact wire format, when a frontend wants one, happens at
//! API boundaries, not inside the dispatch core.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::haversine::haversine_km;

/// A route geometry as a decoded coordinate sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Point>,
}

impl Polyline {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Sum of geodesic leg lengths in kilometers.
    ///
    /// Used for the straight-line fallback, where no provider supplies a
    /// measured road distance.
    pub fn length_km(&self) -> f64 {
        self.points
            .windows(2)
            .map(|leg| haversine_km(leg[0], leg[1]))
            .sum()
    }
}
