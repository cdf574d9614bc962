//! Standalone traffic simulation module
//!
//! This module contains the whole tick-driven kernel: the intersection
//! grid, signal controllers, vehicle agents, routing and congestion
//! tallies. It runs without any rendering layer and can be driven from the
//! console or from tests.

mod cities;
mod commands;
mod config;
mod congestion;
mod intersection;
mod motion;
mod routing;
mod snapshot;
mod spawner;
mod topology;
mod types;
mod vehicle;
mod world;

// Re-export public types for external use
pub use cities::{city_preset, junction_label, CityPreset, CITY_PRESETS};
pub use commands::{Command, SignalDurationChange};
pub use config::{ClassSpec, SimConfig, MAX_GRID_SIZE};
pub use congestion::{mean_speed, CongestionReport, QueueEntry, QueueKey, QueueMap};
pub use intersection::Intersection;
pub use motion::{HoldReason, MotionResolver};
pub use routing::{RouteDecision, Router};
pub use snapshot::Snapshot;
pub use spawner::Spawner;
pub use topology::Topology;
pub use types::{
    Heading, IntersectionId, LightColor, LightPhase, Mission, MotionState, Position, SegmentId,
    SignalOverride, VehicleClass, VehicleId, OVERRIDE_TIMER, POSITION_EPSILON,
};
pub use vehicle::Vehicle;
pub use world::SimWorld;
