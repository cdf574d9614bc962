//! Per-tick congestion tallies
//!
//! The kernel only reports raw inputs: queue lengths per approach, mean
//! speed and corridor occupancy. Turning these into a congestion score is
//! left to whoever consumes the report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::topology::Topology;
use super::types::{Heading, IntersectionId};
use super::vehicle::Vehicle;

/// One approach to an intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueueKey {
    pub intersection: IntersectionId,
    pub heading: Heading,
}

/// Serialized form of one [`QueueMap`] row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub intersection: IntersectionId,
    pub heading: Heading,
    pub count: u32,
}

/// Stopped-vehicle counts per `(intersection, heading)` approach
///
/// Serialized as a list of entries since JSON maps need string keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<QueueEntry>", into = "Vec<QueueEntry>")]
pub struct QueueMap(BTreeMap<QueueKey, u32>);

impl QueueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one queued vehicle against an approach.
    pub fn record(&mut self, intersection: IntersectionId, heading: Heading) {
        *self.0.entry(QueueKey { intersection, heading }).or_insert(0) += 1;
    }

    pub fn get(&self, intersection: IntersectionId, heading: Heading) -> u32 {
        self.0
            .get(&QueueKey { intersection, heading })
            .copied()
            .unwrap_or(0)
    }

    /// Queued vehicles on both approaches of one axis.
    pub fn axis_total(&self, intersection: IntersectionId, vertical: bool) -> u32 {
        Heading::ALL
            .iter()
            .filter(|heading| heading.is_vertical() == vertical)
            .map(|heading| self.get(intersection, *heading))
            .sum()
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QueueKey, &u32)> {
        self.0.iter()
    }
}

impl From<Vec<QueueEntry>> for QueueMap {
    fn from(entries: Vec<QueueEntry>) -> Self {
        let mut map = BTreeMap::new();
        for entry in entries {
            let key = QueueKey {
                intersection: entry.intersection,
                heading: entry.heading,
            };
            *map.entry(key).or_insert(0) += entry.count;
        }
        Self(map)
    }
}

impl From<QueueMap> for Vec<QueueEntry> {
    fn from(map: QueueMap) -> Self {
        map.0
            .into_iter()
            .map(|(key, count)| QueueEntry {
                intersection: key.intersection,
                heading: key.heading,
                count,
            })
            .collect()
    }
}

/// Throttled summary handed to the dashboard / advisory layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CongestionReport {
    pub tick: u64,
    pub total_vehicles: usize,
    /// Vehicles that are not broken down
    pub active_vehicles: usize,
    pub avg_speed: f64,
    pub total_queued: u32,
    pub queue_map: QueueMap,
    /// North/south travelling vehicles inside the grid, per column
    pub column_density: Vec<u32>,
    /// East/west travelling vehicles inside the grid, per row
    pub row_density: Vec<u32>,
}

/// Mean speed over vehicles that are not broken down; zero when none.
pub fn mean_speed(vehicles: &[Vehicle]) -> f64 {
    let (sum, count) = vehicles
        .iter()
        .filter(|v| !v.disabled)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v.speed, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Build the report for a completed tick.
pub fn summarize(
    tick: u64,
    vehicles: &[Vehicle],
    queue_map: &QueueMap,
    topology: &Topology,
    block_size: f64,
) -> CongestionReport {
    let n = topology.grid_size() as usize;
    let mut column_density = vec![0; n];
    let mut row_density = vec![0; n];

    for vehicle in vehicles {
        let column = (vehicle.position.x / block_size).floor();
        let row = (vehicle.position.y / block_size).floor();
        if column < 0.0 || row < 0.0 || column >= n as f64 || row >= n as f64 {
            continue;
        }
        if vehicle.heading.is_vertical() {
            column_density[column as usize] += 1;
        } else {
            row_density[row as usize] += 1;
        }
    }

    CongestionReport {
        tick,
        total_vehicles: vehicles.len(),
        active_vehicles: vehicles.iter().filter(|v| !v.disabled).count(),
        avg_speed: mean_speed(vehicles),
        total_queued: queue_map.total(),
        queue_map: queue_map.clone(),
        column_density,
        row_density,
    }
}
