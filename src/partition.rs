//! Service-area partitioning for vehicles and eligible targets.
//!
//! Partitioning exists purely to bound the size of per-run matching
//! problems. Membership is recomputed fresh each run and never persisted.

use std::collections::HashMap;

use crate::geometry::Point;
use crate::haversine::haversine_km;
use crate::models::{Target, Vehicle};

/// A named region with a center point and a fetch radius in kilometers.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceArea {
    pub name: String,
    pub center: Point,
    pub radius_km: f64,
}

impl ServiceArea {
    pub fn new(name: impl Into<String>, center: Point, radius_km: f64) -> Self {
        Self {
            name: name.into(),
            center,
            radius_km,
        }
    }

    /// The default deployment's city centers and radii.
    pub fn greek_cities() -> Vec<ServiceArea> {
        vec![
            ServiceArea::new("Athens", Point::new(23.7348, 37.9755), 40.0),
            ServiceArea::new("Thessaloniki", Point::new(22.9444, 40.6401), 30.0),
            ServiceArea::new("Patras", Point::new(21.7346, 38.2466), 12.0),
            ServiceArea::new("Heraklion", Point::new(25.1442, 35.3387), 20.0),
            ServiceArea::new("Larissa", Point::new(22.4194, 39.6390), 20.0),
            ServiceArea::new("Volos", Point::new(22.9426, 39.3681), 20.0),
            ServiceArea::new("Kavala", Point::new(24.4019, 40.9396), 20.0),
            ServiceArea::new("Kalamata", Point::new(22.1142, 37.0392), 20.0),
        ]
    }
}

/// Nearest center within its radius, or `None` when no area covers the
/// point. Ties break toward the first area in list order.
pub fn assign_area<'a>(point: Point, areas: &'a [ServiceArea]) -> Option<&'a ServiceArea> {
    let mut best: Option<(&ServiceArea, f64)> = None;

    for area in areas {
        let distance = haversine_km(point, area.center);
        if distance > area.radius_km {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((area, distance)),
        }
    }

    best.map(|(area, _)| area)
}

/// One service area's share of a planning run. Vehicle and target pools of
/// different partitions are disjoint by construction.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub vehicles: Vec<Vehicle>,
    pub targets: Vec<Target>,
}

/// Groups vehicles and targets by nearest service area. Entities outside
/// every area are excluded from per-partition matching for this run.
pub fn group_by_area(
    vehicles: &[Vehicle],
    targets: &[Target],
    areas: &[ServiceArea],
) -> HashMap<String, Partition> {
    let mut partitions: HashMap<String, Partition> = HashMap::new();

    for vehicle in vehicles {
        if let Some(area) = assign_area(vehicle.location, areas) {
            partitions
                .entry(area.name.clone())
                .or_default()
                .vehicles
                .push(vehicle.clone());
        }
    }
    for target in targets {
        if let Some(area) = assign_area(target.location, areas) {
            partitions
                .entry(area.name.clone())
                .or_default()
                .targets
                .push(target.clone());
        }
    }

    partitions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn areas() -> Vec<ServiceArea> {
        vec![
            ServiceArea::new("west", Point::new(0.0, 0.0), 100.0),
            ServiceArea::new("east", Point::new(1.0, 0.0), 100.0),
        ]
    }

    #[test]
    fn test_nearest_center_wins() {
        let near_east = Point::new(0.9, 0.0);
        assert_eq!(assign_area(near_east, &areas()).unwrap().name, "east");
    }

    #[test]
    fn test_outside_all_radii_unassigned() {
        let far = Point::new(30.0, 30.0);
        assert!(assign_area(far, &areas()).is_none());
    }

    #[test]
    fn test_tie_breaks_to_first_listed() {
        // Equidistant from both centers.
        let midpoint = Point::new(0.5, 0.0);
        assert_eq!(assign_area(midpoint, &areas()).unwrap().name, "west");
    }

    #[test]
    fn test_radius_is_per_area() {
        let areas = vec![
            ServiceArea::new("tight", Point::new(0.0, 0.0), 1.0),
            ServiceArea::new("wide", Point::new(0.5, 0.0), 200.0),
        ];
        // ~50 km from "tight" (outside its 1 km radius), inside "wide".
        let point = Point::new(0.0, 0.45);
        assert_eq!(assign_area(point, &areas).unwrap().name, "wide");
    }
}
