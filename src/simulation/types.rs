//! Core types for the traffic simulation
//!
//! These are plain data types shared by every part of the kernel. They all
//! derive serde traits so that a [`Snapshot`](super::Snapshot) can carry them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A wrapper type for intersection IDs
///
/// IDs are row-major grid indices: `y * grid_size + x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntersectionId(pub u32);

impl IntersectionId {
    pub fn from_coords(x: u32, y: u32, grid_size: u32) -> Self {
        Self(y * grid_size + x)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INT-{}", self.0)
    }
}

/// A wrapper type for vehicle IDs
///
/// Issued monotonically by the world and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub u64);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VEH-{}", self.0)
    }
}

/// Identity of a road segment: the sorted pair of intersections it joins
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId {
    pub a: IntersectionId,
    pub b: IntersectionId,
}

impl SegmentId {
    /// Build a segment id from two endpoints in either order.
    ///
    /// This does not check adjacency; the topology decides whether the
    /// segment actually exists.
    pub fn new(first: IntersectionId, second: IntersectionId) -> Self {
        if first <= second {
            Self { a: first, b: second }
        } else {
            Self { a: second, b: first }
        }
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.a, self.b)
    }
}

/// A 2D position in world units (x grows east, y grows south)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Move `distance` units along `heading`.
    pub fn advanced(&self, heading: Heading, distance: f64) -> Position {
        let (dx, dy) = heading.unit();
        Position {
            x: self.x + dx * distance,
            y: self.y + dy * distance,
        }
    }

    /// Signed distance from this position to `target` measured along
    /// `heading`. Positive means the target is still ahead.
    pub fn along_to(&self, target: &Position, heading: Heading) -> f64 {
        let (dx, dy) = heading.unit();
        (target.x - self.x) * dx + (target.y - self.y) * dy
    }

    /// The coordinate perpendicular to travel along `heading`.
    pub fn lateral(&self, heading: Heading) -> f64 {
        if heading.is_vertical() {
            self.x
        } else {
            self.y
        }
    }
}

/// One of the four cardinal travel directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Heading {
    North,
    South,
    East,
    West,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::North, Heading::South, Heading::East, Heading::West];

    /// Unit step in world coordinates.
    pub fn unit(self) -> (f64, f64) {
        match self {
            Heading::North => (0.0, -1.0),
            Heading::South => (0.0, 1.0),
            Heading::East => (1.0, 0.0),
            Heading::West => (-1.0, 0.0),
        }
    }

    /// Unit step in grid coordinates.
    pub fn grid_step(self) -> (i64, i64) {
        match self {
            Heading::North => (0, -1),
            Heading::South => (0, 1),
            Heading::East => (1, 0),
            Heading::West => (-1, 0),
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Heading::North | Heading::South)
    }

    pub fn reverse(self) -> Heading {
        match self {
            Heading::North => Heading::South,
            Heading::South => Heading::North,
            Heading::East => Heading::West,
            Heading::West => Heading::East,
        }
    }

    /// The heading after a left turn, from the driver's point of view.
    pub fn left(self) -> Heading {
        match self {
            Heading::North => Heading::West,
            Heading::West => Heading::South,
            Heading::South => Heading::East,
            Heading::East => Heading::North,
        }
    }

    /// The heading after a right turn, from the driver's point of view.
    pub fn right(self) -> Heading {
        self.left().reverse()
    }

    /// Sign of the lane offset from the road centreline for left-hand
    /// traffic, in the lateral coordinate.
    pub fn keep_left_sign(self) -> f64 {
        match self {
            // Southbound drives on the east side, northbound on the west.
            Heading::South => 1.0,
            Heading::North => -1.0,
            // Eastbound drives on the north side, westbound on the south.
            Heading::East => -1.0,
            Heading::West => 1.0,
        }
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Heading::North => "N",
            Heading::South => "S",
            Heading::East => "E",
            Heading::West => "W",
        };
        f.write_str(c)
    }
}

/// Colour of one axis of a traffic light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightColor {
    Green,
    Yellow,
    Red,
}

/// The pair of light colours shown to the north/south and east/west axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightPhase {
    pub ns: LightColor,
    pub ew: LightColor,
}

impl LightPhase {
    pub const NS_GREEN: LightPhase = LightPhase {
        ns: LightColor::Green,
        ew: LightColor::Red,
    };
    pub const NS_YELLOW: LightPhase = LightPhase {
        ns: LightColor::Yellow,
        ew: LightColor::Red,
    };
    pub const EW_GREEN: LightPhase = LightPhase {
        ns: LightColor::Red,
        ew: LightColor::Green,
    };
    pub const EW_YELLOW: LightPhase = LightPhase {
        ns: LightColor::Red,
        ew: LightColor::Yellow,
    };
    pub const ALL_RED: LightPhase = LightPhase {
        ns: LightColor::Red,
        ew: LightColor::Red,
    };

    /// The colour shown to traffic travelling along `heading`.
    pub fn for_heading(&self, heading: Heading) -> LightColor {
        if heading.is_vertical() {
            self.ns
        } else {
            self.ew
        }
    }

    /// At most one axis may show a non-red colour.
    pub fn is_exclusive(&self) -> bool {
        self.ns == LightColor::Red || self.ew == LightColor::Red
    }
}

/// A phase forced onto an intersection by an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalOverride {
    NsGreen,
    EwGreen,
    AllRed,
}

impl SignalOverride {
    pub fn phase(self) -> LightPhase {
        match self {
            SignalOverride::NsGreen => LightPhase::NS_GREEN,
            SignalOverride::EwGreen => LightPhase::EW_GREEN,
            SignalOverride::AllRed => LightPhase::ALL_RED,
        }
    }
}

/// Coarse motion state reported for each vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionState {
    Accelerating,
    Moving,
    Stopped,
}

/// Type of vehicle in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VehicleClass {
    /// Ordinary car
    Car,
    /// Auto-rickshaw
    ThreeWheeler,
    Bus,
    /// Ambulance / police; may be dispatched on a response mission
    Emergency,
}

/// Behavioural mode of an emergency vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mission {
    Patrol,
    Response { destination: IntersectionId },
}

/// Timer value pinned on an intersection while an override holds it
pub const OVERRIDE_TIMER: u32 = u32::MAX;

/// Tolerance used when comparing positions along a lane
pub const POSITION_EPSILON: f64 = 1e-6;
