//! External commands accepted by the kernel
//!
//! Commands are queued and applied together at the start of the next tick,
//! so a tick never observes a half-applied change.

use serde::{Deserialize, Serialize};

use super::types::{IntersectionId, SegmentId, SignalOverride, VehicleId};

/// A requested green length for one intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDurationChange {
    pub intersection: IntersectionId,
    pub green_duration: u32,
}

/// A mutation requested by a host between ticks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Advisory timing changes; each duration is clamped into the configured bounds
    SetGreenDurations(Vec<SignalDurationChange>),
    SetRoadClosed { segment: SegmentId, closed: bool },
    ClearAllClosures,
    /// Force a phase, or release the override with `None`
    ForceOverride {
        intersection: IntersectionId,
        signal_override: Option<SignalOverride>,
    },
    /// Break a vehicle down in place
    DisableVehicle(VehicleId),
    /// Tow a broken-down vehicle away
    ClearObstacle(VehicleId),
    DispatchEmergency {
        vehicle: VehicleId,
        destination: IntersectionId,
    },
    /// Rebuild the grid; missing labels fall back to "Sector x-y"
    ResetTopology { grid_size: u32, labels: Vec<String> },
    /// Break down every vehicle within `radius` of an intersection centre
    DisableVehiclesNear {
        intersection: IntersectionId,
        radius: f64,
    },
}
