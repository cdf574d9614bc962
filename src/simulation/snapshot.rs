//! Completed-tick state handed to hosts
//!
//! A snapshot carries everything needed to rebuild the kernel: the random
//! source is derived from `(seed, tick)`, so no generator state is stored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::congestion::QueueMap;
use super::intersection::Intersection;
use super::types::SegmentId;
use super::vehicle::Vehicle;

/// Read-only copy of the kernel after a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of ticks completed
    pub tick: u64,
    pub seed: u64,
    /// Next id the world will issue
    pub next_vehicle_id: u64,
    pub grid_size: u32,
    pub intersections: Vec<Intersection>,
    pub vehicles: Vec<Vehicle>,
    pub closed_segments: Vec<SegmentId>,
    pub queue_map: QueueMap,
    pub avg_speed: f64,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize snapshot")
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize snapshot")
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse snapshot")
    }

    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let text = self.to_json_pretty()?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write snapshot to {}", path.display()))
    }

    pub fn read_from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid snapshot in {}", path.display()))
    }
}
