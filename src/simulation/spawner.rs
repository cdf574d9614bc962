//! Vehicle spawning at the grid boundary

use log::debug;
use rand::Rng;

use super::config::{ClassSpec, SimConfig};
use super::topology::Topology;
use super::types::{Heading, Position, VehicleClass, VehicleId};
use super::vehicle::Vehicle;

/// How many car lengths outside the grid new vehicles appear
const SPAWN_DISTANCE_FACTOR: f64 = 3.0;

/// Half-size of the clear box around a spawn point, in vehicle lengths
const SAFETY_BOX_FACTOR: f64 = 2.5;

/// Fraction of its top speed a new vehicle enters with
const ENTRY_SPEED_FACTOR: f64 = 0.5;

/// Feeds new traffic in from the four edges of the grid
#[derive(Debug, Clone)]
pub struct Spawner {
    spawn_interval: u64,
    max_vehicles: usize,
    max_emergency_vehicles: usize,
    emergency_spawn_chance: f64,
    /// Distance outside the grid edge where vehicles appear
    entry_offset: f64,
    extent: f64,
    /// Car, three-wheeler, bus, emergency
    class_specs: [ClassSpec; 4],
}

impl Spawner {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            spawn_interval: config.spawn_interval,
            max_vehicles: config.max_vehicles,
            max_emergency_vehicles: config.max_emergency_vehicles,
            emergency_spawn_chance: config.emergency_spawn_chance,
            entry_offset: SPAWN_DISTANCE_FACTOR * config.car_size,
            extent: config.extent(),
            class_specs: [
                config.class_spec(VehicleClass::Car),
                config.class_spec(VehicleClass::ThreeWheeler),
                config.class_spec(VehicleClass::Bus),
                config.class_spec(VehicleClass::Emergency),
            ],
        }
    }

    fn class_spec(&self, class: VehicleClass) -> ClassSpec {
        match class {
            VehicleClass::Car => self.class_specs[0],
            VehicleClass::ThreeWheeler => self.class_specs[1],
            VehicleClass::Bus => self.class_specs[2],
            VehicleClass::Emergency => self.class_specs[3],
        }
    }

    /// Whether a spawn attempt is due at `tick` with `active` vehicles alive.
    pub fn should_spawn(&self, tick: u64, active: usize) -> bool {
        self.spawn_interval > 0 && tick % self.spawn_interval == 0 && active < self.max_vehicles
    }

    /// Try to place one vehicle with id `id` just outside the grid.
    ///
    /// Returns `None` when the spawn point is not clear.
    pub fn try_spawn<R: Rng>(
        &self,
        id: VehicleId,
        existing: &[Vehicle],
        topology: &Topology,
        rng: &mut R,
    ) -> Option<Vehicle> {
        let heading = Heading::ALL[rng.random_range(0..Heading::ALL.len())];
        let lane = rng.random_range(0..topology.grid_size());
        let position = self.entry_position(topology, heading, lane);

        let emergencies = existing.iter().filter(|v| v.is_emergency()).count();
        let class = self.pick_class(rng.random(), emergencies);
        let spec = self.class_spec(class);

        let reach = SAFETY_BOX_FACTOR * spec.length;
        let blocked = existing.iter().any(|other| {
            (other.position.x - position.x).abs() < reach && (other.position.y - position.y).abs() < reach
        });
        if blocked {
            debug!("Spawn of {:?} heading {} skipped, entry lane {} is busy", class, heading, lane);
            return None;
        }

        Some(Vehicle::new(
            id,
            class,
            spec,
            position,
            heading,
            spec.max_speed * ENTRY_SPEED_FACTOR,
        ))
    }

    /// Map one uniform draw onto a vehicle class.
    pub fn pick_class(&self, draw: f64, active_emergencies: usize) -> VehicleClass {
        if draw < self.emergency_spawn_chance && active_emergencies < self.max_emergency_vehicles {
            VehicleClass::Emergency
        } else if draw > 0.92 {
            VehicleClass::Bus
        } else if draw > 0.65 {
            VehicleClass::ThreeWheeler
        } else {
            VehicleClass::Car
        }
    }

    /// Point outside the grid where traffic travelling along `heading`
    /// enters road `lane`.
    pub fn entry_position(&self, topology: &Topology, heading: Heading, lane: u32) -> Position {
        let outside = self.entry_offset;
        let extent = self.extent;
        let lateral = topology.lane_center(lane, heading);
        match heading {
            Heading::South => Position::new(lateral, -outside),
            Heading::North => Position::new(lateral, extent + outside),
            Heading::East => Position::new(-outside, lateral),
            Heading::West => Position::new(extent + outside, lateral),
        }
    }
}
