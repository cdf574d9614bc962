//! Heading selection at intersections
//!
//! Ordinary traffic wanders: it picks uniformly among the open ways out of
//! a junction. Responding emergency vehicles head for their destination
//! and ignore closures.

use log::debug;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::BTreeSet;

use super::topology::Topology;
use super::types::{Heading, IntersectionId, MotionState, SegmentId};
use super::vehicle::Vehicle;

/// Outcome of routing one vehicle at its target intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Leave along this heading
    Proceed(Heading),
    /// Every way out is occupied; wait at the centre
    Hold,
}

/// Chooses headings for vehicles that reached their target this tick
#[derive(Debug, Clone, Copy)]
pub struct Router {
    lane_tolerance: f64,
    follow_buffer: f64,
}

impl Router {
    pub fn new(lane_tolerance: f64, follow_buffer: f64) -> Self {
        Self {
            lane_tolerance,
            follow_buffer,
        }
    }

    /// Route every vehicle that has reached the centre of its target.
    ///
    /// Vehicles are handled in id order against live positions, so a
    /// vehicle that turned earlier in the pass occupies its landing spot
    /// for the ones after it.
    pub fn route<R: Rng>(
        &self,
        vehicles: &mut [Vehicle],
        topology: &Topology,
        closed: &BTreeSet<SegmentId>,
        rng: &mut R,
    ) {
        for index in 0..vehicles.len() {
            let vehicle = &vehicles[index];
            if vehicle.disabled {
                continue;
            }
            let Some(target) = vehicle.target else {
                continue;
            };
            if vehicle.position.along_to(&topology.center(target), vehicle.heading) > 0.0 {
                continue;
            }

            if vehicle.destination() == Some(target) {
                debug!("{} reached its destination {}, back on patrol", vehicle.id, target);
                vehicles[index].end_response();
            }

            let decision = self.decide(&vehicles[index], target, vehicles, topology, closed, rng);
            let vehicle = &mut vehicles[index];
            match decision {
                RouteDecision::Proceed(heading) => {
                    if heading != vehicle.heading {
                        vehicle.position = topology.approach_position(target, heading, 0.0);
                        debug!("{} turns {} -> {} at {}", vehicle.id, vehicle.heading, heading, target);
                    }
                    vehicle.heading = heading;
                    vehicle.target = None;
                }
                RouteDecision::Hold => {
                    vehicle.position = topology.approach_position(target, vehicle.heading, 0.0);
                    vehicle.speed = 0.0;
                    vehicle.motion = MotionState::Stopped;
                    debug!("{} waits at {} for a clear exit", vehicle.id, target);
                }
            }
        }
    }

    /// Pick the way out of `target` for `vehicle`.
    pub fn decide<R: Rng>(
        &self,
        vehicle: &Vehicle,
        target: IntersectionId,
        vehicles: &[Vehicle],
        topology: &Topology,
        closed: &BTreeSet<SegmentId>,
        rng: &mut R,
    ) -> RouteDecision {
        if let Some(destination) = vehicle.destination() {
            return self.decide_response(vehicle, target, destination, vehicles, topology);
        }

        let heading = vehicle.heading;
        let open_road = |candidate: Heading| match topology.neighbor(target, candidate) {
            Some(next) => !closed.contains(&SegmentId::new(target, next)),
            // Carrying straight on past the boundary is the exit road.
            None => candidate == heading,
        };

        let mut options: Vec<Heading> = [heading, heading.left(), heading.right()]
            .into_iter()
            .filter(|candidate| open_road(*candidate))
            .collect();
        if options.is_empty() {
            options.push(heading.reverse());
        }

        let free: Vec<Heading> = options
            .into_iter()
            .filter(|candidate| *candidate == heading || !self.landing_occupied(vehicle, target, *candidate, vehicles, topology))
            .collect();

        match free.choose(rng) {
            Some(choice) => RouteDecision::Proceed(*choice),
            None => RouteDecision::Hold,
        }
    }

    /// Closest in-grid heading to `destination` by Manhattan distance.
    /// Ties favour straight, then left, right and reverse.
    fn decide_response(
        &self,
        vehicle: &Vehicle,
        target: IntersectionId,
        destination: IntersectionId,
        vehicles: &[Vehicle],
        topology: &Topology,
    ) -> RouteDecision {
        let heading = vehicle.heading;
        let mut ranked: Vec<(u32, Heading)> = [heading, heading.left(), heading.right(), heading.reverse()]
            .into_iter()
            .filter_map(|candidate| {
                topology
                    .neighbor(target, candidate)
                    .map(|next| (topology.manhattan(next, destination), candidate))
            })
            .collect();
        // Stable sort keeps the preference order among equal distances.
        ranked.sort_by_key(|(distance, _)| *distance);

        ranked
            .into_iter()
            .map(|(_, candidate)| candidate)
            .find(|candidate| *candidate == heading || !self.landing_occupied(vehicle, target, *candidate, vehicles, topology))
            .map_or(RouteDecision::Hold, RouteDecision::Proceed)
    }

    /// Whether another vehicle already sits where `vehicle` would land after
    /// turning onto `heading` at `at`.
    fn landing_occupied(
        &self,
        vehicle: &Vehicle,
        at: IntersectionId,
        heading: Heading,
        vehicles: &[Vehicle],
        topology: &Topology,
    ) -> bool {
        let landing = topology.approach_position(at, heading, 0.0);
        vehicles.iter().any(|other| {
            other.id != vehicle.id
                && other.heading == heading
                && (other.position.lateral(heading) - landing.lateral(heading)).abs() < self.lane_tolerance
                && landing.along_to(&other.position, heading).abs()
                    < 0.5 * (vehicle.length + other.length) + self.follow_buffer
        })
    }
}
