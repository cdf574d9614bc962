//! Motion and collision resolution
//!
//! Every decision in a tick is taken against the same pre-tick frame of
//! vehicle positions, so the result never depends on the order in which
//! vehicles are visited.

use log::trace;
use ordered_float::OrderedFloat;

use super::config::SimConfig;
use super::congestion::QueueMap;
use super::intersection::Intersection;
use super::topology::Topology;
use super::types::{LightColor, MotionState, POSITION_EPSILON};
use super::vehicle::Vehicle;

/// Why a vehicle was held this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    /// Waiting at the centre of a junction for a free landing spot
    AwaitingTurn,
    /// Inside its decision distance of a stop line that is not green
    Signal,
    /// Too close to the vehicle ahead in its lane
    Leader,
    /// Giving way to a responding emergency vehicle
    Yield,
}

/// Decides and integrates vehicle motion for one tick
#[derive(Debug, Clone, Copy)]
pub struct MotionResolver {
    stop_line_margin: f64,
    lane_tolerance: f64,
    follow_buffer: f64,
    follow_headway: f64,
    yield_radius: f64,
}

impl MotionResolver {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            stop_line_margin: config.stop_line_margin,
            lane_tolerance: config.lane_tolerance,
            follow_buffer: config.follow_buffer,
            follow_headway: config.follow_headway,
            yield_radius: config.yield_radius,
        }
    }

    /// Move every vehicle one tick and return the approach queues this
    /// produced.
    ///
    /// `intersections` must be indexed by intersection id and already hold
    /// this tick's signal state.
    pub fn resolve(
        &self,
        vehicles: &mut [Vehicle],
        intersections: &[Intersection],
        topology: &Topology,
    ) -> QueueMap {
        let frame: Vec<Vehicle> = vehicles.to_vec();
        let mut queue_map = QueueMap::new();

        for vehicle in vehicles.iter_mut() {
            if vehicle.disabled {
                vehicle.speed = 0.0;
                vehicle.motion = MotionState::Stopped;
                continue;
            }

            if vehicle.target.is_none() {
                vehicle.target = topology.next_intersection(&vehicle.position, vehicle.heading);
            }

            let hold = self.hold_reason(vehicle, &frame, intersections, topology);
            match hold {
                Some(reason) => {
                    vehicle.speed = (vehicle.speed - vehicle.deceleration).clamp(0.0, vehicle.speed_cap());
                    vehicle.motion = MotionState::Stopped;
                    trace!("{} held ({:?}) at speed {:.2}", vehicle.id, reason, vehicle.speed);

                    if vehicle.speed <= 0.0 && matches!(reason, HoldReason::Signal | HoldReason::Leader) {
                        if let Some(target) = vehicle.target {
                            let light = intersections[target.index()].light.for_heading(vehicle.heading);
                            if light != LightColor::Green {
                                queue_map.record(target, vehicle.heading);
                            }
                        }
                    }
                }
                None => {
                    let cap = vehicle.speed_cap();
                    vehicle.speed = (vehicle.speed + vehicle.acceleration).min(cap);
                    vehicle.motion = if vehicle.speed >= cap - POSITION_EPSILON {
                        MotionState::Moving
                    } else {
                        MotionState::Accelerating
                    };
                    vehicle.position = vehicle.position.advanced(vehicle.heading, vehicle.speed);
                }
            }
        }

        queue_map
    }

    /// The first rule that stops `vehicle` this tick, if any.
    ///
    /// Yielding to a responder takes precedence over every other rule.
    pub fn hold_reason(
        &self,
        vehicle: &Vehicle,
        frame: &[Vehicle],
        intersections: &[Intersection],
        topology: &Topology,
    ) -> Option<HoldReason> {
        if self.must_yield(vehicle, frame) {
            return Some(HoldReason::Yield);
        }

        if let Some(target) = vehicle.target {
            let center = topology.center(target);
            if vehicle.position.along_to(&center, vehicle.heading) <= 0.0 {
                return Some(HoldReason::AwaitingTurn);
            }

            if !vehicle.is_responding() {
                let distance = topology.distance_to_stop_line(target, &vehicle.position, vehicle.heading);
                let light = intersections[target.index()].light.for_heading(vehicle.heading);
                if distance > self.stop_line_margin
                    && distance <= vehicle.decision_distance()
                    && light != LightColor::Green
                {
                    return Some(HoldReason::Signal);
                }
            }
        }

        let leader = frame
            .iter()
            .filter_map(|other| vehicle.gap_to(other, self.lane_tolerance).map(|gap| (gap, other)))
            .min_by_key(|(gap, _)| OrderedFloat(*gap));
        if let Some((gap, leader)) = leader {
            if gap < vehicle.safe_following_distance(leader, self.follow_buffer, self.follow_headway) {
                return Some(HoldReason::Leader);
            }
        }

        None
    }

    /// Ordinary traffic near a responding emergency vehicle gives way, unless
    /// it is the vehicle blocking the responder's own lane.
    fn must_yield(&self, vehicle: &Vehicle, frame: &[Vehicle]) -> bool {
        if vehicle.is_emergency() {
            return false;
        }
        frame.iter().any(|responder| {
            responder.is_responding()
                && responder.id != vehicle.id
                && responder.position.distance(&vehicle.position) <= self.yield_radius
                && responder.gap_to(vehicle, self.lane_tolerance).is_none()
        })
    }
}
