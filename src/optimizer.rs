//! Remote constrained-optimizer adapter.
//!
//! Builds a capacity-constrained vehicle-routing request from the global
//! vehicle and target sets (one unit-demand shipment per target), submits it
//! to an external optimizer and folds its per-vehicle visit sequences back
//! into an [`Assignment`].
//!
//! Third-party optimizers are loose about identifiers: a route or step may
//! reference an entity by numeric index, by the label we supplied, or not at
//! all. Resolution is an ordered chain: by-index, then by-label, then
//! by-position when the entry carries no identifying field. Entries that name
//! something unknown stay unresolved; the reconciliation safety net picks the
//! affected targets up.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{Target, Vehicle};
use crate::solver::Assignment;

/// External solver capable of producing a full assignment. Returning `None`
/// (unreachable, empty result) sends the run down the per-partition local
/// solver path instead.
pub trait AssignmentOptimizer {
    fn optimize(&self, vehicles: &[Vehicle], targets: &[Target]) -> Option<Assignment>;
}

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptimizerClient {
    config: OptimizerConfig,
    client: reqwest::blocking::Client,
}

impl OptimizerClient {
    pub fn new(config: OptimizerConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn submit(&self, request: &SolveRequest) -> Option<SolveResponse> {
        let url = format!("{}/solve", self.config.base_url);
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<SolveResponse>());

        match response {
            Ok(body) => Some(body),
            Err(err) => {
                warn!(error = %err, "optimizer request failed, falling back to local solver");
                None
            }
        }
    }
}

impl AssignmentOptimizer for OptimizerClient {
    fn optimize(&self, vehicles: &[Vehicle], targets: &[Target]) -> Option<Assignment> {
        if vehicles.is_empty() || targets.is_empty() {
            return None;
        }
        let request = build_request(vehicles, targets);
        let response = self.submit(&request)?;
        fold_response(&response, vehicles, targets)
    }
}

// --- request schema -------------------------------------------------------

/// Numeric ids are array indices; descriptions carry our own string ids so
/// the optimizer can echo either back.
pub fn build_request(vehicles: &[Vehicle], targets: &[Target]) -> SolveRequest {
    SolveRequest {
        vehicles: vehicles
            .iter()
            .enumerate()
            .map(|(index, vehicle)| RequestVehicle {
                id: index,
                description: vehicle.id.clone(),
                start: vehicle.location.into(),
                capacity: [vehicle.available_seats()],
            })
            .collect(),
        shipments: targets
            .iter()
            .enumerate()
            .map(|(index, target)| RequestShipment {
                id: index,
                description: target.id.clone(),
                location: target.location.into(),
                amount: [1],
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SolveRequest {
    pub vehicles: Vec<RequestVehicle>,
    pub shipments: Vec<RequestShipment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestVehicle {
    pub id: usize,
    pub description: String,
    /// `[lon, lat]`.
    pub start: [f64; 2],
    pub capacity: [u32; 1],
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestShipment {
    pub id: usize,
    pub description: String,
    /// `[lon, lat]`.
    pub location: [f64; 2],
    pub amount: [u32; 1],
}

// --- response schema ------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SolveResponse {
    #[serde(default)]
    pub routes: Vec<SolvedRoute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolvedRoute {
    /// Vehicle reference: numeric index or string label, depending on the
    /// optimizer's mood.
    #[serde(default)]
    pub vehicle: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<SolvedStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolvedStep {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SolvedStep {
    fn is_visit(&self) -> bool {
        !matches!(self.kind.as_deref(), Some("start") | Some("end"))
    }
}

// --- resolution -----------------------------------------------------------

fn resolve_vehicle<'a>(
    route: &SolvedRoute,
    position: usize,
    vehicles: &'a [Vehicle],
) -> Option<&'a Vehicle> {
    resolve_entry(
        route.vehicle.as_ref(),
        route.description.as_deref(),
        position,
        vehicles,
        |vehicle| vehicle.id.as_str(),
    )
}

fn resolve_target<'a>(
    step: &SolvedStep,
    visit_position: usize,
    targets: &'a [Target],
) -> Option<&'a Target> {
    resolve_entry(
        step.id.as_ref(),
        step.description.as_deref(),
        visit_position,
        targets,
        |target| target.id.as_str(),
    )
}

/// The documented strategy chain: by-index, by-label, then by-position.
/// The positional fallback applies only to entries carrying no identifying
/// field at all; anything else stays unresolved rather than guessed.
fn resolve_entry<'a, T>(
    id: Option<&serde_json::Value>,
    label: Option<&str>,
    position: usize,
    entries: &'a [T],
    entry_label: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    if let Some(index) = id.and_then(serde_json::Value::as_u64) {
        if let Some(entry) = entries.get(index as usize) {
            return Some(entry);
        }
    }

    let label = label.or_else(|| id.and_then(serde_json::Value::as_str));
    if let Some(label) = label {
        if let Some(entry) = entries.iter().find(|entry| entry_label(entry) == label) {
            return Some(entry);
        }
        // A label was supplied but matches nothing: unresolved, not guessed.
        return None;
    }

    if id.is_none() {
        return entries.get(position);
    }

    None
}

/// Folds the optimizer's visit sequences into an assignment over the request
/// vehicle set. `None` when the response carries no routes at all.
///
/// Seat capacity is enforced while folding: an over-packed route loses its
/// excess picks here and reconciliation re-places them elsewhere.
pub fn fold_response(
    response: &SolveResponse,
    vehicles: &[Vehicle],
    targets: &[Target],
) -> Option<Assignment> {
    if response.routes.is_empty() {
        return None;
    }

    let mut assignment = Assignment::new(vehicles);

    for (position, route) in response.routes.iter().enumerate() {
        let Some(vehicle) = resolve_vehicle(route, position, vehicles) else {
            warn!(position, "optimizer route references no known vehicle");
            continue;
        };

        let mut visit_position = 0;
        for step in &route.steps {
            if !step.is_visit() {
                continue;
            }
            let resolved = resolve_target(step, visit_position, targets);
            visit_position += 1;

            let Some(target) = resolved else {
                warn!(
                    vehicle_id = %vehicle.id,
                    step = ?step.id,
                    label = ?step.description,
                    "optimizer step references no known target"
                );
                continue;
            };
            if assignment.is_assigned(&target.id) {
                warn!(target_id = %target.id, "optimizer assigned target twice, keeping first");
                continue;
            }
            if !assignment.assign(&vehicle.id, target.clone()) {
                warn!(
                    vehicle_id = %vehicle.id,
                    target_id = %target.id,
                    "optimizer overfilled vehicle, pick deferred to reconciliation"
                );
            }
        }
    }

    Some(assignment)
}
