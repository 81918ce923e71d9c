//! Dispatch orchestration: one stateless planning run over a snapshot.
//!
//! Gathers inputs from the data collaborators, filters targets against
//! active hazard geometry, partitions, solves (remote optimizer when one is
//! supplied and answers, per-partition greedy otherwise), reconciles,
//! builds routes and assembles the result. Operational failures degrade;
//! only invariant violations fail the run.

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::geometry::Point;
use crate::models::{unix_now, HazardZone, Target, Vehicle};
use crate::optimizer::AssignmentOptimizer;
use crate::partition::{assign_area, group_by_area, ServiceArea};
use crate::routes::{build_route, RouteRecord, StopRecord};
use crate::solver::{reconcile, solve_greedy, verify, Assignment, SolverInvariant};
use crate::traits::{
    CostMatrixProvider, HazardSource, RoutePathProvider, SourceError, TargetSource, VehicleSource,
};

/// Per-run configuration. All collaborators are explicit handles; nothing
/// here is ambient or shared across runs.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub service_areas: Vec<ServiceArea>,
    /// Override for the activity-window clock, mainly for tests.
    pub now: Option<i64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            service_areas: ServiceArea::greek_cities(),
            now: None,
        }
    }
}

/// Why a run came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    NoCapacity,
    NoCapacityInSelected,
}

/// Run metadata returned alongside the route and stop records.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSummary {
    /// Vehicles considered after the optional id filter.
    pub vehicles: usize,
    pub eligible_targets: usize,
    pub active_hazards: usize,
    pub assigned: usize,
    pub unassigned: usize,
    pub unassigned_target_ids: Vec<String>,
    pub reason: Option<ReasonCode>,
}

/// The result of one planning run.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub routes: Vec<RouteRecord>,
    pub stops: Vec<StopRecord>,
    pub summary: DispatchSummary,
}

/// The only fatal failures: bookkeeping that would emit unsafe evacuation
/// output. Everything operational degrades instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Invariant(#[from] SolverInvariant),
    #[error("{assigned} assigned + {unassigned} unassigned != {eligible} eligible targets")]
    TargetAccounting {
        assigned: usize,
        unassigned: usize,
        eligible: usize,
    },
}

/// Plans one dispatch run over fresh snapshots from the given sources.
///
/// `vehicle_filter` restricts the run to a subset of vehicle ids. The
/// operation always returns a structured outcome for operational conditions
/// (empty data, unreachable providers); `Err` is reserved for invariant
/// violations.
#[allow(clippy::too_many_arguments)]
pub fn plan_dispatch<H, T, V, C, R>(
    hazard_source: &H,
    target_source: &T,
    vehicle_source: &V,
    cost_provider: &C,
    route_provider: &R,
    optimizer: Option<&dyn AssignmentOptimizer>,
    config: &DispatchConfig,
    vehicle_filter: Option<&[String]>,
) -> Result<DispatchOutcome, DispatchError>
where
    H: HazardSource + Sync,
    T: TargetSource + Sync,
    V: VehicleSource + Sync,
    C: CostMatrixProvider + Sync,
    R: RoutePathProvider + Sync,
{
    let now = config.now.unwrap_or_else(unix_now);

    // Fan-out/fan-in: the three fetches run independently and a failing
    // source contributes zero records rather than aborting the others.
    let (hazard_records, (target_records, vehicle_records)) = rayon::join(
        || fetch_or_empty("hazards", hazard_source.fetch_hazards()),
        || {
            rayon::join(
                || fetch_or_empty("targets", target_source.fetch_targets()),
                || fetch_or_empty("vehicles", vehicle_source.fetch_vehicles()),
            )
        },
    );

    let active: Vec<HazardZone> = hazard_records
        .into_iter()
        .filter(|zone| {
            if zone.geometry.is_empty() {
                warn!(hazard_id = %zone.id, "skipping hazard with unusable geometry");
                return false;
            }
            zone.is_active_at(now)
        })
        .collect();

    let selected: Vec<Vehicle> = match vehicle_filter {
        Some(ids) => vehicle_records
            .into_iter()
            .filter(|vehicle| ids.contains(&vehicle.id))
            .collect(),
        None => vehicle_records,
    };

    if active.is_empty() {
        info!("no active hazards, nothing to plan");
        return Ok(empty_outcome(selected.len(), 0, 0, Vec::new(), None));
    }

    let eligible: Vec<Target> = target_records
        .into_iter()
        .filter(|target| active.iter().any(|zone| zone.geometry.contains(target.location)))
        .collect();

    if eligible.is_empty() {
        info!(active_hazards = active.len(), "no targets inside active hazards");
        return Ok(empty_outcome(selected.len(), 0, active.len(), Vec::new(), None));
    }

    let capable: Vec<Vehicle> = selected
        .iter()
        .filter(|vehicle| vehicle.available_seats() > 0)
        .cloned()
        .collect();

    if capable.is_empty() {
        let reason = if vehicle_filter.is_some() {
            ReasonCode::NoCapacityInSelected
        } else {
            ReasonCode::NoCapacity
        };
        warn!(eligible = eligible.len(), ?reason, "no vehicle capacity for this run");
        let unassigned_ids = eligible.iter().map(|target| target.id.clone()).collect();
        return Ok(empty_outcome(
            selected.len(),
            eligible.len(),
            active.len(),
            unassigned_ids,
            Some(reason),
        ));
    }

    // Exactly one solver path per run: the remote optimizer when it yields
    // routes, otherwise per-partition greedy. Never both.
    let assignment = match optimizer.and_then(|opt| opt.optimize(&capable, &eligible)) {
        Some(mut remote) => {
            reconcile(&mut remote, &eligible, &capable);
            remote
        }
        None => solve_per_partition(&capable, &eligible, cost_provider, &config.service_areas),
    };

    verify(&assignment, &capable)?;

    let unassigned_target_ids: Vec<String> = eligible
        .iter()
        .filter(|target| !assignment.is_assigned(&target.id))
        .map(|target| target.id.clone())
        .collect();

    let assigned = assignment.total_assigned();
    if assigned + unassigned_target_ids.len() != eligible.len() {
        return Err(DispatchError::TargetAccounting {
            assigned,
            unassigned: unassigned_target_ids.len(),
            eligible: eligible.len(),
        });
    }

    // Picks are finalized; per-vehicle route building is independent.
    let picks = assignment.into_picks();
    let built: Vec<(RouteRecord, Vec<StopRecord>)> = capable
        .par_iter()
        .filter_map(|vehicle| {
            let vehicle_picks = picks.get(&vehicle.id)?;
            if vehicle_picks.is_empty() {
                return None;
            }
            let area = assign_area(vehicle.location, &config.service_areas);
            Some(build_route(
                vehicle,
                vehicle_picks,
                area.map(|a| a.name.as_str()),
                route_provider,
            ))
        })
        .collect();

    let mut routes = Vec::with_capacity(built.len());
    let mut stops = Vec::new();
    for (route, route_stops) in built {
        routes.push(route);
        stops.extend(route_stops);
    }

    info!(
        vehicles = selected.len(),
        eligible = eligible.len(),
        assigned,
        unassigned = unassigned_target_ids.len(),
        routes = routes.len(),
        "dispatch run complete"
    );

    Ok(DispatchOutcome {
        routes,
        stops,
        summary: DispatchSummary {
            vehicles: selected.len(),
            eligible_targets: eligible.len(),
            active_hazards: active.len(),
            assigned,
            unassigned: unassigned_target_ids.len(),
            unassigned_target_ids,
            reason: None,
        },
    })
}

/// Per-partition greedy solving. Partitions are disjoint by construction,
/// so they solve in parallel with no shared state; vehicles and targets
/// outside every service area sit this run out.
fn solve_per_partition<C>(
    vehicles: &[Vehicle],
    targets: &[Target],
    cost_provider: &C,
    areas: &[ServiceArea],
) -> Assignment
where
    C: CostMatrixProvider + Sync,
{
    let partitions = group_by_area(vehicles, targets, areas);

    let solved: Vec<Assignment> = partitions
        .into_par_iter()
        .map(|(area_name, pool)| {
            let origins: Vec<Point> = pool.vehicles.iter().map(|v| v.location).collect();
            let destinations: Vec<Point> = pool.targets.iter().map(|t| t.location).collect();
            let matrix = cost_provider.cost_matrix(&origins, &destinations);
            if matrix.is_none() {
                warn!(area = %area_name, "cost provider unavailable, using geodesic distance");
            }
            solve_greedy(&pool.vehicles, &pool.targets, matrix.as_ref())
        })
        .collect();

    let mut merged = Assignment::new(vehicles);
    for part in solved {
        merged.merge(part);
    }
    merged
}

fn fetch_or_empty<Record>(source: &str, fetched: Result<Vec<Record>, SourceError>) -> Vec<Record> {
    match fetched {
        Ok(records) => records,
        Err(err) => {
            warn!(source, error = %err, "source fetch failed, treating as zero records");
            Vec::new()
        }
    }
}

fn empty_outcome(
    vehicles: usize,
    eligible_targets: usize,
    active_hazards: usize,
    unassigned_target_ids: Vec<String>,
    reason: Option<ReasonCode>,
) -> DispatchOutcome {
    DispatchOutcome {
        routes: Vec::new(),
        stops: Vec::new(),
        summary: DispatchSummary {
            vehicles,
            eligible_targets,
            active_hazards,
            assigned: 0,
            unassigned: unassigned_target_ids.len(),
            unassigned_target_ids,
            reason,
        },
    }
}
