//! Capacity-constrained assignment of targets to vehicles.
//!
//! The local solver is deliberately greedy: partitioning keeps vehicle and
//! target counts small, and a globally cheapest-pair scan is predictable
//! under degraded cost inputs. Swapping in a min-cost bipartite matching is
//! possible without touching the surrounding contracts.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::haversine::haversine_km;
use crate::models::{Target, Vehicle};
use crate::traits::CostMatrix;

/// Vehicle picks built up during one planning run, with running seat
/// counters. Ephemeral: built and discarded within a single run.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    picks: HashMap<String, Vec<Target>>,
    seats_left: HashMap<String, u32>,
}

impl Assignment {
    /// Seeds seat counters from the vehicles' currently available seats.
    pub fn new(vehicles: &[Vehicle]) -> Self {
        let mut assignment = Self::default();
        for vehicle in vehicles {
            assignment
                .seats_left
                .entry(vehicle.id.clone())
                .or_insert_with(|| vehicle.available_seats());
        }
        assignment
    }

    pub fn seats_left(&self, vehicle_id: &str) -> u32 {
        self.seats_left.get(vehicle_id).copied().unwrap_or(0)
    }

    pub fn picks(&self, vehicle_id: &str) -> &[Target] {
        self.picks.get(vehicle_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Appends a pick and decrements the vehicle's seat counter. Returns
    /// false without assigning when no seat is left.
    pub fn assign(&mut self, vehicle_id: &str, target: Target) -> bool {
        let Some(seats) = self.seats_left.get_mut(vehicle_id) else {
            return false;
        };
        if *seats == 0 {
            return false;
        }
        *seats -= 1;
        self.picks
            .entry(vehicle_id.to_string())
            .or_default()
            .push(target);
        true
    }

    pub fn is_assigned(&self, target_id: &str) -> bool {
        self.picks
            .values()
            .any(|picks| picks.iter().any(|target| target.id == target_id))
    }

    pub fn total_assigned(&self) -> usize {
        self.picks.values().map(Vec::len).sum()
    }

    /// Folds another assignment in (disjoint partitions merge this way).
    pub fn merge(&mut self, other: Assignment) {
        for (vehicle_id, picks) in other.picks {
            self.picks.entry(vehicle_id).or_default().extend(picks);
        }
        for (vehicle_id, seats) in other.seats_left {
            self.seats_left.insert(vehicle_id, seats);
        }
    }

    pub fn into_picks(self) -> HashMap<String, Vec<Target>> {
        self.picks
    }
}

fn pair_cost(
    matrix: Option<&CostMatrix>,
    vehicle_index: usize,
    target_index: usize,
    vehicle: &Vehicle,
    target: &Target,
) -> f64 {
    matrix
        .and_then(|m| m.get(vehicle_index))
        .and_then(|row| row.get(target_index))
        .copied()
        .unwrap_or_else(|| haversine_km(vehicle.location, target.location))
}

/// Iterative greedy matching under seat capacity.
///
/// Each iteration scans every (vehicle with capacity, unassigned target)
/// pair, assigns the single cheapest one, and repeats until capacity or
/// targets run out. Costs come from the matrix when present, geodesic
/// distance otherwise. Ties break first-found in vehicle-major scan order.
pub fn solve_greedy(
    vehicles: &[Vehicle],
    targets: &[Target],
    matrix: Option<&CostMatrix>,
) -> Assignment {
    let mut assignment = Assignment::new(vehicles);
    let mut taken = vec![false; targets.len()];
    let mut remaining = targets.len();

    while remaining > 0 {
        let mut best: Option<(usize, usize, f64)> = None;

        for (vehicle_index, vehicle) in vehicles.iter().enumerate() {
            if assignment.seats_left(&vehicle.id) == 0 {
                continue;
            }
            for (target_index, target) in targets.iter().enumerate() {
                if taken[target_index] {
                    continue;
                }
                let cost = pair_cost(matrix, vehicle_index, target_index, vehicle, target);
                if best.is_none_or(|(_, _, best_cost)| cost < best_cost) {
                    best = Some((vehicle_index, target_index, cost));
                }
            }
        }

        let Some((vehicle_index, target_index, _)) = best else {
            break;
        };
        assignment.assign(&vehicles[vehicle_index].id, targets[target_index].clone());
        taken[target_index] = true;
        remaining -= 1;
    }

    assignment
}

/// Safety net after an external solver: every eligible target missing from
/// the assignment is attached to the nearest vehicle with spare capacity.
///
/// Runs strictly after all remote picks are finalized, so seat counters are
/// settled before any reconciled target lands. Targets that fit nowhere are
/// reported in run metadata, not raised; the caller surfaces them.
pub fn reconcile(assignment: &mut Assignment, eligible: &[Target], vehicles: &[Vehicle]) {
    for target in eligible {
        if assignment.is_assigned(&target.id) {
            continue;
        }

        let nearest = vehicles
            .iter()
            .filter(|vehicle| assignment.seats_left(&vehicle.id) > 0)
            .map(|vehicle| (vehicle, haversine_km(vehicle.location, target.location)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match nearest {
            Some((vehicle, distance_km)) => {
                debug!(
                    target_id = %target.id,
                    vehicle_id = %vehicle.id,
                    distance_km,
                    "reconciled target dropped by external solver"
                );
                assignment.assign(&vehicle.id, target.clone());
            }
            None => {
                warn!(target_id = %target.id, "no spare capacity for unassigned target");
            }
        }
    }
}

/// Capacity and uniqueness invariants. A violation is a programming error
/// producing unsafe evacuation output, so it fails the run.
pub fn verify(assignment: &Assignment, vehicles: &[Vehicle]) -> Result<(), SolverInvariant> {
    for vehicle in vehicles {
        let assigned = assignment.picks(&vehicle.id).len();
        if assigned > vehicle.available_seats() as usize {
            return Err(SolverInvariant::CapacityExceeded {
                vehicle_id: vehicle.id.clone(),
                assigned,
                seats: vehicle.available_seats(),
            });
        }
    }

    let mut seen: HashMap<&str, &str> = HashMap::new();
    for (vehicle_id, picks) in &assignment.picks {
        for target in picks {
            if seen.insert(target.id.as_str(), vehicle_id.as_str()).is_some() {
                return Err(SolverInvariant::DuplicateAssignment {
                    target_id: target.id.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Invariant violations detected over a finished assignment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolverInvariant {
    #[error("vehicle {vehicle_id} holds {assigned} picks but only {seats} seats were available")]
    CapacityExceeded {
        vehicle_id: String,
        assigned: usize,
        seats: u32,
    },
    #[error("target {target_id} assigned to more than one vehicle")]
    DuplicateAssignment { target_id: String },
}
