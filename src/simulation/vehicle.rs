//! Vehicle agents
//!
//! A vehicle carries its own class parameters so that a snapshot fully
//! describes it without consulting the config it was spawned under.

use serde::{Deserialize, Serialize};

use super::config::ClassSpec;
use super::types::{
    Heading, IntersectionId, Mission, MotionState, Position, VehicleClass, VehicleId,
    POSITION_EPSILON,
};

/// A vehicle in the traffic simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub position: Position,
    pub heading: Heading,
    pub speed: f64,
    pub motion: MotionState,
    pub class: VehicleClass,
    pub length: f64,
    pub width: f64,
    pub max_speed: f64,
    pub response_speed: f64,
    pub acceleration: f64,
    pub deceleration: f64,
    /// The intersection the vehicle is approaching
    pub target: Option<IntersectionId>,
    /// Only emergency vehicles carry a mission
    pub mission: Option<Mission>,
    /// Broken down: a permanent obstacle until cleared
    pub disabled: bool,
}

impl Vehicle {
    pub fn new(
        id: VehicleId,
        class: VehicleClass,
        spec: ClassSpec,
        position: Position,
        heading: Heading,
        speed: f64,
    ) -> Self {
        let mission = match class {
            VehicleClass::Emergency => Some(Mission::Patrol),
            _ => None,
        };
        Self {
            id,
            position,
            heading,
            speed: speed.clamp(0.0, spec.max_speed),
            motion: MotionState::Accelerating,
            class,
            length: spec.length,
            width: spec.width,
            max_speed: spec.max_speed,
            response_speed: spec.response_speed,
            acceleration: spec.acceleration,
            deceleration: spec.deceleration,
            target: None,
            mission,
            disabled: false,
        }
    }

    pub fn is_emergency(&self) -> bool {
        self.class == VehicleClass::Emergency
    }

    /// Whether this is an emergency vehicle on an active response.
    pub fn is_responding(&self) -> bool {
        matches!(self.mission, Some(Mission::Response { .. }))
    }

    pub fn destination(&self) -> Option<IntersectionId> {
        match self.mission {
            Some(Mission::Response { destination }) => Some(destination),
            _ => None,
        }
    }

    /// Go back on patrol, shedding any speed above the class limit.
    pub fn end_response(&mut self) {
        self.mission = Some(Mission::Patrol);
        self.speed = self.speed.min(self.max_speed);
    }

    /// Current speed limit for this vehicle.
    pub fn speed_cap(&self) -> f64 {
        if self.is_responding() {
            self.response_speed
        } else {
            self.max_speed
        }
    }

    /// Distance within which the vehicle must start stopping for a line:
    /// its braking distance at the current speed plus its own length.
    pub fn decision_distance(&self) -> f64 {
        self.speed * self.speed / (2.0 * self.deceleration) + self.length
    }

    /// Whether `other` travels in the same lane as this vehicle.
    pub fn shares_lane(&self, other: &Vehicle, lane_tolerance: f64) -> bool {
        other.heading == self.heading
            && (other.position.lateral(self.heading) - self.position.lateral(self.heading)).abs()
                < lane_tolerance
    }

    /// Longitudinal gap to `other` if it is in the same lane and strictly
    /// ahead of this vehicle.
    pub fn gap_to(&self, other: &Vehicle, lane_tolerance: f64) -> Option<f64> {
        if other.id == self.id || !self.shares_lane(other, lane_tolerance) {
            return None;
        }
        let gap = self.position.along_to(&other.position, self.heading);
        (gap > POSITION_EPSILON).then_some(gap)
    }

    /// Centre-to-centre distance this vehicle keeps behind `leader`.
    pub fn safe_following_distance(&self, leader: &Vehicle, buffer: f64, headway: f64) -> f64 {
        0.5 * (self.length + leader.length) + buffer + headway * self.speed
    }

    /// Break the vehicle down in place.
    pub fn disable(&mut self) {
        self.disabled = true;
        self.speed = 0.0;
        self.motion = MotionState::Stopped;
    }
}
