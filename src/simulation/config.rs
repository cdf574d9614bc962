//! Tunable constants for a simulation run
//!
//! Defaults describe a 3x3 grid with frame-based timings and pixel-scale
//! distances.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::types::VehicleClass;

/// Largest grid the kernel accepts.
pub const MAX_GRID_SIZE: u32 = 32;

/// Configuration for a [`SimWorld`](super::SimWorld)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of intersections along each side of the grid
    pub grid_size: u32,
    /// Distance between neighbouring intersection centres
    pub block_size: f64,
    /// Full width of a two-lane road
    pub road_width: f64,
    /// Length of an ordinary car; other classes scale from it
    pub car_size: f64,
    /// Top speed of an ordinary car, in units per tick
    pub max_speed: f64,
    /// Speed gained per tick when not held
    pub acceleration: f64,
    /// Speed shed per tick when held
    pub deceleration: f64,
    /// Initial green phase length in ticks
    pub green_duration: u32,
    /// Yellow phase length in ticks
    pub yellow_duration: u32,
    /// Lower bound applied to externally requested green durations
    pub min_green_duration: u32,
    /// Upper bound applied to externally requested green durations
    pub max_green_duration: u32,
    /// Draw initial signal timers from the RNG instead of starting in lockstep
    pub stagger_signals: bool,
    /// Ticks between spawn attempts; 0 disables the spawner
    pub spawn_interval: u64,
    /// Spawner stops when this many vehicles are active
    pub max_vehicles: usize,
    /// Most emergency vehicles the spawner keeps active at once
    pub max_emergency_vehicles: usize,
    /// Chance that a spawn attempt produces an emergency vehicle
    pub emergency_spawn_chance: f64,
    /// Ticks between published congestion reports
    pub report_interval: u64,
    /// How far outside the grid a vehicle may travel before removal
    pub despawn_margin: f64,
    /// A vehicle this close to (or past) its stop line may clear the junction
    pub stop_line_margin: f64,
    /// Lateral tolerance for two vehicles to share a lane
    pub lane_tolerance: f64,
    /// Fixed gap kept between consecutive vehicles
    pub follow_buffer: f64,
    /// Extra following gap per unit of follower speed
    pub follow_headway: f64,
    /// Non-emergency traffic within this radius of a responding vehicle yields
    pub yield_radius: f64,
    /// Speed cap multiplier for emergency vehicles on a response
    pub response_speed_factor: f64,
    /// Seed for the random source; a random seed is drawn when absent
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_size: 3,
            block_size: 240.0,
            road_width: 70.0,
            car_size: 14.0,
            max_speed: 4.0,
            acceleration: 0.15,
            deceleration: 0.25,
            green_duration: 150,
            yellow_duration: 60,
            min_green_duration: 60,
            max_green_duration: 300,
            stagger_signals: false,
            spawn_interval: 25,
            max_vehicles: 120,
            max_emergency_vehicles: 2,
            emergency_spawn_chance: 0.03,
            report_interval: 30,
            despawn_margin: 100.0,
            stop_line_margin: 2.0,
            lane_tolerance: 8.0,
            follow_buffer: 8.0,
            follow_headway: 5.0,
            yield_radius: 120.0,
            response_speed_factor: 1.5,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: SimConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the kernel cannot run.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=MAX_GRID_SIZE).contains(&self.grid_size),
            "grid_size must be between 1 and {}, got {}",
            MAX_GRID_SIZE,
            self.grid_size
        );
        ensure!(self.block_size > 0.0, "block_size must be positive");
        ensure!(
            self.road_width > 0.0 && self.road_width < self.block_size,
            "road_width must be positive and narrower than a block"
        );
        ensure!(self.car_size > 0.0, "car_size must be positive");
        ensure!(self.max_speed > 0.0, "max_speed must be positive");
        ensure!(self.acceleration > 0.0, "acceleration must be positive");
        ensure!(self.deceleration > 0.0, "deceleration must be positive");
        ensure!(self.green_duration > 0, "green_duration must be at least one tick");
        ensure!(self.yellow_duration > 0, "yellow_duration must be at least one tick");
        ensure!(
            self.min_green_duration > 0 && self.min_green_duration <= self.max_green_duration,
            "green duration bounds must satisfy 0 < min <= max"
        );
        ensure!(self.report_interval > 0, "report_interval must be at least one tick");
        ensure!(
            (0.0..=1.0).contains(&self.emergency_spawn_chance),
            "emergency_spawn_chance must be a probability"
        );
        ensure!(
            self.response_speed_factor >= 1.0,
            "response_speed_factor must not slow responding vehicles down"
        );
        Ok(())
    }

    /// Offset of a lane centre from its road centreline.
    pub fn lane_offset(&self) -> f64 {
        self.road_width / 4.0
    }

    /// Distance from an intersection centre back to its stop lines.
    pub fn stop_line_offset(&self) -> f64 {
        self.road_width * 0.6
    }

    /// Total side length of the grid in world units.
    pub fn extent(&self) -> f64 {
        self.grid_size as f64 * self.block_size
    }

    /// Physical and performance parameters for a vehicle class.
    pub fn class_spec(&self, class: VehicleClass) -> ClassSpec {
        let base = self.car_size;
        let (length, width, speed, accel, decel) = match class {
            VehicleClass::Car => (1.0, 0.6, 1.0, 1.0, 1.0),
            VehicleClass::ThreeWheeler => (0.9, 0.65, 0.85, 1.0, 1.0),
            VehicleClass::Bus => (3.0, 1.2, 0.7, 0.66, 0.8),
            VehicleClass::Emergency => (1.2, 0.7, 1.1, 1.2, 1.2),
        };
        let max_speed = self.max_speed * speed;
        let response_speed = match class {
            VehicleClass::Emergency => max_speed * self.response_speed_factor,
            _ => max_speed,
        };
        ClassSpec {
            length: base * length,
            width: base * width,
            max_speed,
            response_speed,
            acceleration: self.acceleration * accel,
            deceleration: self.deceleration * decel,
        }
    }
}

/// Per-class vehicle parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassSpec {
    pub length: f64,
    pub width: f64,
    pub max_speed: f64,
    /// Speed cap while on a response mission
    pub response_speed: f64,
    pub acceleration: f64,
    pub deceleration: f64,
}
