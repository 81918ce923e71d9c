//! Remote optimizer adapter tests
//!
//! Request building and the identifier resolution chain over optimizer
//! responses: by-index, by-label, positional last resort.

use evac_dispatch::geometry::Point;
use evac_dispatch::models::{Target, Vehicle};
use evac_dispatch::optimizer::{build_request, fold_response, SolveResponse};
use evac_dispatch::solver::{reconcile, verify};

// ============================================================================
// Test Fixtures
// ============================================================================

fn vehicle(id: &str, lon: f64, lat: f64, seats: u32) -> Vehicle {
    Vehicle {
        id: id.to_string(),
        vehicle_type: "rescue_vehicle".to_string(),
        license_plate: "PAT-4242".to_string(),
        location: Point::new(lon, lat),
        total_seats: seats,
        occupied_seats: 0,
    }
}

fn target(id: &str, lon: f64, lat: f64) -> Target {
    Target {
        id: id.to_string(),
        name: format!("evacuee {id}"),
        location: Point::new(lon, lat),
        needs: String::new(),
        contact: None,
    }
}

fn response(json: &str) -> SolveResponse {
    serde_json::from_str(json).expect("parse optimizer response")
}

fn pick_ids<'a>(
    assignment: &'a evac_dispatch::solver::Assignment,
    vehicle_id: &str,
) -> Vec<&'a str> {
    assignment
        .picks(vehicle_id)
        .iter()
        .map(|t| t.id.as_str())
        .collect()
}

// ============================================================================
// Request Building
// ============================================================================

#[test]
fn test_request_uses_indices_and_labels() {
    let vehicles = vec![vehicle("veh-a", 21.73, 38.24, 3)];
    let targets = vec![target("tgt-1", 21.74, 38.25), target("tgt-2", 21.75, 38.26)];

    let request = build_request(&vehicles, &targets);

    assert_eq!(request.vehicles.len(), 1);
    assert_eq!(request.vehicles[0].id, 0);
    assert_eq!(request.vehicles[0].description, "veh-a");
    assert_eq!(request.vehicles[0].capacity, [3]);
    assert_eq!(request.vehicles[0].start, [21.73, 38.24]);

    assert_eq!(request.shipments.len(), 2);
    assert_eq!(request.shipments[1].id, 1);
    assert_eq!(request.shipments[1].description, "tgt-2");
    assert_eq!(request.shipments[1].amount, [1]);
}

#[test]
fn test_occupied_seats_reduce_requested_capacity() {
    let mut half_full = vehicle("veh-a", 21.73, 38.24, 5);
    half_full.occupied_seats = 3;

    let request = build_request(&[half_full], &[target("tgt-1", 21.74, 38.25)]);

    assert_eq!(request.vehicles[0].capacity, [2]);
}

// ============================================================================
// Response Resolution
// ============================================================================

#[test]
fn test_resolves_by_numeric_index() {
    let vehicles = vec![vehicle("veh-a", 0.0, 0.0, 2), vehicle("veh-b", 1.0, 0.0, 2)];
    let targets = vec![target("tgt-1", 0.1, 0.0), target("tgt-2", 0.2, 0.0)];

    let parsed = response(
        r#"{"routes":[
            {"vehicle":1,"steps":[
                {"type":"start"},
                {"type":"job","id":0},
                {"type":"job","id":1},
                {"type":"end"}
            ]}
        ]}"#,
    );

    let assignment = fold_response(&parsed, &vehicles, &targets).expect("routes present");
    assert_eq!(pick_ids(&assignment, "veh-b"), vec!["tgt-1", "tgt-2"]);
    assert!(assignment.picks("veh-a").is_empty());
}

#[test]
fn test_resolves_by_label() {
    let vehicles = vec![vehicle("veh-a", 0.0, 0.0, 2)];
    let targets = vec![target("tgt-1", 0.1, 0.0), target("tgt-2", 0.2, 0.0)];

    let parsed = response(
        r#"{"routes":[
            {"description":"veh-a","steps":[
                {"type":"job","description":"tgt-2"},
                {"type":"job","description":"tgt-1"}
            ]}
        ]}"#,
    );

    let assignment = fold_response(&parsed, &vehicles, &targets).expect("routes present");
    assert_eq!(pick_ids(&assignment, "veh-a"), vec!["tgt-2", "tgt-1"]);
}

#[test]
fn test_resolves_by_position_when_unlabeled() {
    // No ids, no labels anywhere: positional order against the request
    // arrays is the documented last resort.
    let vehicles = vec![vehicle("veh-a", 0.0, 0.0, 2), vehicle("veh-b", 1.0, 0.0, 2)];
    let targets = vec![target("tgt-1", 0.1, 0.0), target("tgt-2", 0.2, 0.0)];

    let parsed = response(
        r#"{"routes":[
            {"steps":[{"type":"job"}]},
            {"steps":[{"type":"job"},{"type":"job"}]}
        ]}"#,
    );

    let assignment = fold_response(&parsed, &vehicles, &targets).expect("routes present");
    // Route position maps to the request vehicle array; visit position
    // within each route maps to the shipment array. veh-b's first visit
    // resolves to tgt-1 again, which is already taken, so only its second
    // visit lands.
    assert_eq!(pick_ids(&assignment, "veh-a"), vec!["tgt-1"]);
    assert_eq!(pick_ids(&assignment, "veh-b"), vec!["tgt-2"]);
}

#[test]
fn test_unknown_label_stays_unresolved() {
    // Scenario: route references a shipment label that was never in the
    // request. The step is dropped and reconciliation re-places the target.
    let vehicles = vec![vehicle("veh-a", 0.0, 0.0, 2)];
    let targets = vec![target("tgt-1", 0.1, 0.0)];

    let parsed = response(
        r#"{"routes":[
            {"description":"veh-a","steps":[
                {"type":"job","description":"no-such-shipment"}
            ]}
        ]}"#,
    );

    let mut assignment = fold_response(&parsed, &vehicles, &targets).expect("routes present");
    assert_eq!(assignment.total_assigned(), 0, "unknown label must not be guessed");

    reconcile(&mut assignment, &targets, &vehicles);
    assert_eq!(
        pick_ids(&assignment, "veh-a"),
        vec!["tgt-1"],
        "safety net places the dropped target"
    );
    assert!(verify(&assignment, &vehicles).is_ok());
}

#[test]
fn test_out_of_range_index_falls_back_to_label() {
    let vehicles = vec![vehicle("veh-a", 0.0, 0.0, 1)];
    let targets = vec![target("tgt-1", 0.1, 0.0)];

    let parsed = response(
        r#"{"routes":[
            {"vehicle":99,"description":"veh-a","steps":[
                {"type":"job","id":42,"description":"tgt-1"}
            ]}
        ]}"#,
    );

    let assignment = fold_response(&parsed, &vehicles, &targets).expect("routes present");
    assert_eq!(pick_ids(&assignment, "veh-a"), vec!["tgt-1"]);
}

#[test]
fn test_empty_routes_mean_no_result() {
    let vehicles = vec![vehicle("veh-a", 0.0, 0.0, 1)];
    let targets = vec![target("tgt-1", 0.1, 0.0)];

    assert!(fold_response(&response(r#"{"routes":[]}"#), &vehicles, &targets).is_none());
    assert!(fold_response(&response(r#"{}"#), &vehicles, &targets).is_none());
}

#[test]
fn test_overfilled_route_defers_excess_to_reconciliation() {
    // Optimizer packed three picks into a two-seat vehicle. Capacity is
    // enforced while folding; the excess target lands on another vehicle
    // via the safety net.
    let vehicles = vec![vehicle("small", 0.0, 0.0, 2), vehicle("spare", 0.3, 0.0, 2)];
    let targets = vec![
        target("tgt-1", 0.1, 0.0),
        target("tgt-2", 0.2, 0.0),
        target("tgt-3", 0.3, 0.0),
    ];

    let parsed = response(
        r#"{"routes":[
            {"vehicle":0,"steps":[
                {"type":"job","id":0},
                {"type":"job","id":1},
                {"type":"job","id":2}
            ]}
        ]}"#,
    );

    let mut assignment = fold_response(&parsed, &vehicles, &targets).expect("routes present");
    assert_eq!(assignment.picks("small").len(), 2);

    reconcile(&mut assignment, &targets, &vehicles);
    assert_eq!(pick_ids(&assignment, "spare"), vec!["tgt-3"]);
    assert!(verify(&assignment, &vehicles).is_ok());
}

#[test]
fn test_duplicate_reference_keeps_first() {
    let vehicles = vec![vehicle("veh-a", 0.0, 0.0, 2), vehicle("veh-b", 1.0, 0.0, 2)];
    let targets = vec![target("tgt-1", 0.1, 0.0)];

    let parsed = response(
        r#"{"routes":[
            {"vehicle":0,"steps":[{"type":"job","id":0}]},
            {"vehicle":1,"steps":[{"type":"job","id":0}]}
        ]}"#,
    );

    let assignment = fold_response(&parsed, &vehicles, &targets).expect("routes present");
    assert_eq!(pick_ids(&assignment, "veh-a"), vec!["tgt-1"]);
    assert!(assignment.picks("veh-b").is_empty());
    assert!(verify(&assignment, &vehicles).is_ok());
}
