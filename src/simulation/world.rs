//! Main simulation world that ties everything together
//!
//! This is the entry point for running the traffic kernel. Hosts queue
//! commands between ticks, call [`SimWorld::tick`] once per frame and read
//! the returned [`Snapshot`].

use anyhow::{ensure, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

use super::cities::junction_label;
use super::commands::{Command, SignalDurationChange};
use super::config::{SimConfig, MAX_GRID_SIZE};
use super::congestion::{self, CongestionReport, QueueMap};
use super::intersection::Intersection;
use super::motion::MotionResolver;
use super::routing::Router;
use super::snapshot::Snapshot;
use super::spawner::Spawner;
use super::topology::Topology;
use super::types::{
    Heading, IntersectionId, Mission, Position, SegmentId, SignalOverride, VehicleClass, VehicleId,
};
use super::vehicle::Vehicle;

/// Odd constant spreading consecutive ticks across the seed space
const TICK_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Separate stream for the one-off staggered signal timers
const STAGGER_SEED_SALT: u64 = 0x5EED_5157_A11E_D000;

/// The main simulation world
pub struct SimWorld {
    config: SimConfig,
    seed: u64,
    /// Ticks completed so far
    tick: u64,
    next_vehicle_id: u64,
    topology: Topology,
    /// Indexed by intersection id
    intersections: Vec<Intersection>,
    /// Sorted by vehicle id
    vehicles: Vec<Vehicle>,
    closed_segments: BTreeSet<SegmentId>,
    queue_map: QueueMap,
    avg_speed: f64,
    /// Commands waiting for the next tick boundary
    pending: Vec<Command>,
    /// Latest published report not yet taken by the host
    report: Option<CongestionReport>,
    resolver: MotionResolver,
    router: Router,
    spawner: Spawner,
}

impl SimWorld {
    /// Create a world with generic junction labels.
    pub fn new(config: SimConfig) -> Result<Self> {
        Self::with_labels(config, &[])
    }

    /// Create a world whose junctions take their names from `labels`,
    /// column by column.
    pub fn with_labels(config: SimConfig, labels: &[String]) -> Result<Self> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let topology = Topology::new(&config);
        let mut intersections = build_intersections(&config, &topology, labels);

        if config.stagger_signals {
            let mut rng = StdRng::seed_from_u64(seed ^ STAGGER_SEED_SALT);
            for intersection in &mut intersections {
                intersection.timer = rng.random_range(1..=config.green_duration);
            }
        }

        info!(
            "Created {}x{} grid with {} segments (seed {})",
            config.grid_size,
            config.grid_size,
            topology.segment_count(),
            seed
        );

        Ok(Self::assemble(config, seed, topology, intersections))
    }

    /// Rebuild a world from a snapshot taken after some tick.
    ///
    /// The snapshot's grid size and seed replace the ones in `config`, so
    /// ticking the restored world replays the original run exactly.
    pub fn from_snapshot(mut config: SimConfig, snapshot: Snapshot) -> Result<Self> {
        config.grid_size = snapshot.grid_size;
        config.seed = Some(snapshot.seed);
        config.validate()?;

        let topology = Topology::new(&config);
        ensure!(
            snapshot.intersections.len() == topology.intersection_count(),
            "snapshot has {} intersections, a {}x{} grid needs {}",
            snapshot.intersections.len(),
            snapshot.grid_size,
            snapshot.grid_size,
            topology.intersection_count()
        );
        for (index, intersection) in snapshot.intersections.iter().enumerate() {
            ensure!(
                intersection.id.index() == index,
                "snapshot intersection {} is out of order",
                intersection.id
            );
        }
        ensure!(
            snapshot.vehicles.windows(2).all(|pair| pair[0].id < pair[1].id),
            "snapshot vehicles must be sorted by id without duplicates"
        );
        if let Some(last) = snapshot.vehicles.last() {
            ensure!(
                last.id.0 < snapshot.next_vehicle_id,
                "snapshot vehicle {} was never issued",
                last.id
            );
        }
        for vehicle in &snapshot.vehicles {
            for junction in vehicle.target.iter().chain(vehicle.destination().iter()) {
                ensure!(
                    topology.contains(*junction),
                    "snapshot vehicle {} refers to unknown intersection {}",
                    vehicle.id,
                    junction
                );
            }
        }
        for segment in &snapshot.closed_segments {
            ensure!(
                topology.segment_between(segment.a, segment.b) == Some(*segment),
                "snapshot closes unknown segment {}",
                segment
            );
        }

        let mut world = Self::assemble(config, snapshot.seed, topology, snapshot.intersections);
        world.tick = snapshot.tick;
        world.next_vehicle_id = snapshot.next_vehicle_id;
        world.vehicles = snapshot.vehicles;
        world.closed_segments = snapshot.closed_segments.into_iter().collect();
        world.queue_map = snapshot.queue_map;
        world.avg_speed = snapshot.avg_speed;
        info!("Restored world at tick {} with {} vehicles", world.tick, world.vehicles.len());
        Ok(world)
    }

    fn assemble(config: SimConfig, seed: u64, topology: Topology, intersections: Vec<Intersection>) -> Self {
        Self {
            resolver: MotionResolver::new(&config),
            router: Router::new(config.lane_tolerance, config.follow_buffer),
            spawner: Spawner::new(&config),
            config,
            seed,
            tick: 0,
            next_vehicle_id: 0,
            topology,
            intersections,
            vehicles: Vec::new(),
            closed_segments: BTreeSet::new(),
            queue_map: QueueMap::new(),
            avg_speed: 0.0,
            pending: Vec::new(),
            report: None,
        }
    }

    /// Random source for one tick, derived from the seed alone.
    fn tick_rng(&self, tick: u64) -> StdRng {
        StdRng::seed_from_u64(self.seed.wrapping_add(tick.wrapping_mul(TICK_SEED_STRIDE)))
    }

    fn vehicle_index(&self, id: VehicleId) -> Option<usize> {
        self.vehicles.binary_search_by_key(&id, |v| v.id).ok()
    }

    // ---------------------------------------------------------------------
    // External commands. All of these are queued and take effect at the
    // start of the next tick.
    // ---------------------------------------------------------------------

    /// Queue a command for the next tick boundary.
    ///
    /// Identifiers the world never issued are host bugs: they trip an
    /// assertion in debug builds and are dropped as no-ops otherwise.
    pub fn submit(&mut self, command: Command) {
        match &command {
            Command::DisableVehicle(id)
            | Command::ClearObstacle(id)
            | Command::DispatchEmergency { vehicle: id, .. } => {
                debug_assert!(id.0 < self.next_vehicle_id, "{} was never issued", id);
            }
            _ => {}
        }
        match &command {
            Command::ForceOverride { intersection, .. }
            | Command::DispatchEmergency {
                destination: intersection,
                ..
            }
            | Command::DisableVehiclesNear { intersection, .. } => {
                debug_assert!(
                    self.topology.contains(*intersection),
                    "{} is outside the grid",
                    intersection
                );
            }
            _ => {}
        }
        self.pending.push(command);
    }

    pub fn apply_signal_durations(&mut self, changes: Vec<SignalDurationChange>) {
        self.submit(Command::SetGreenDurations(changes));
    }

    pub fn set_road_closed(&mut self, segment: SegmentId, closed: bool) {
        self.submit(Command::SetRoadClosed { segment, closed });
    }

    pub fn clear_all_closures(&mut self) {
        self.submit(Command::ClearAllClosures);
    }

    pub fn force_override(&mut self, intersection: IntersectionId, signal_override: Option<SignalOverride>) {
        self.submit(Command::ForceOverride {
            intersection,
            signal_override,
        });
    }

    /// Break a vehicle down where it stands.
    pub fn spawn_incident_obstacle(&mut self, vehicle: VehicleId) {
        self.submit(Command::DisableVehicle(vehicle));
    }

    pub fn clear_obstacle(&mut self, vehicle: VehicleId) {
        self.submit(Command::ClearObstacle(vehicle));
    }

    pub fn dispatch_emergency(&mut self, vehicle: VehicleId, destination: IntersectionId) {
        self.submit(Command::DispatchEmergency { vehicle, destination });
    }

    pub fn reset_topology(&mut self, grid_size: u32, labels: Vec<String>) {
        self.submit(Command::ResetTopology { grid_size, labels });
    }

    pub fn disable_vehicles_near(&mut self, intersection: IntersectionId, radius: f64) {
        self.submit(Command::DisableVehiclesNear { intersection, radius });
    }

    /// Number of commands waiting for the next tick.
    pub fn pending_commands(&self) -> usize {
        self.pending.len()
    }

    fn apply_pending(&mut self) {
        let commands = std::mem::take(&mut self.pending);
        for command in commands {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::SetGreenDurations(changes) => {
                let (min, max) = (self.config.min_green_duration, self.config.max_green_duration);
                for change in changes {
                    if !self.topology.contains(change.intersection) {
                        warn!("Ignoring green duration for unknown intersection {}", change.intersection);
                        continue;
                    }
                    let duration = change.green_duration.clamp(min, max);
                    if duration != change.green_duration {
                        warn!(
                            "Green duration {} for {} clamped to {}",
                            change.green_duration, change.intersection, duration
                        );
                    }
                    self.intersections[change.intersection.index()].set_green_duration(duration);
                }
            }
            Command::SetRoadClosed { segment, closed } => {
                if !self.topology.has_segment(segment) {
                    warn!("Ignoring closure of {}: not a road segment", segment);
                    return;
                }
                if closed {
                    self.closed_segments.insert(segment);
                } else {
                    self.closed_segments.remove(&segment);
                }
                info!("Segment {} {}", segment, if closed { "closed" } else { "reopened" });
            }
            Command::ClearAllClosures => {
                if !self.closed_segments.is_empty() {
                    info!("Reopened {} segments", self.closed_segments.len());
                }
                self.closed_segments.clear();
            }
            Command::ForceOverride {
                intersection,
                signal_override,
            } => {
                if !self.topology.contains(intersection) {
                    warn!("Ignoring override for unknown intersection {}", intersection);
                    return;
                }
                self.intersections[intersection.index()].set_override(signal_override);
                info!("Override on {} set to {:?}", intersection, signal_override);
            }
            Command::DisableVehicle(id) => match self.vehicle_index(id) {
                Some(index) => {
                    self.vehicles[index].disable();
                    info!("{} broke down", id);
                }
                None => warn!("Cannot disable {}: not in the simulation", id),
            },
            Command::ClearObstacle(id) => match self.vehicle_index(id) {
                Some(index) if self.vehicles[index].disabled => {
                    self.vehicles.remove(index);
                    info!("Cleared obstacle {}", id);
                }
                Some(_) => warn!("Cannot clear {}: it is not broken down", id),
                None => warn!("Cannot clear {}: not in the simulation", id),
            },
            Command::DispatchEmergency { vehicle, destination } => {
                if !self.topology.contains(destination) {
                    warn!("Cannot dispatch {} to unknown intersection {}", vehicle, destination);
                    return;
                }
                match self.vehicle_index(vehicle) {
                    Some(index) if self.vehicles[index].is_emergency() => {
                        self.vehicles[index].mission = Some(Mission::Response { destination });
                        info!("Dispatched {} to {}", vehicle, destination);
                    }
                    Some(_) => warn!("Cannot dispatch {}: not an emergency vehicle", vehicle),
                    None => warn!("Cannot dispatch {}: not in the simulation", vehicle),
                }
            }
            Command::ResetTopology { grid_size, labels } => {
                if !(1..=MAX_GRID_SIZE).contains(&grid_size) {
                    warn!("Ignoring topology reset to unsupported grid size {}", grid_size);
                    return;
                }
                self.config.grid_size = grid_size;
                self.topology = Topology::new(&self.config);
                self.intersections = build_intersections(&self.config, &self.topology, &labels);
                self.spawner = Spawner::new(&self.config);
                self.vehicles.clear();
                self.closed_segments.clear();
                self.queue_map = QueueMap::new();
                self.avg_speed = 0.0;
                info!("Topology reset to a {}x{} grid", grid_size, grid_size);
            }
            Command::DisableVehiclesNear { intersection, radius } => {
                if !self.topology.contains(intersection) {
                    warn!("Ignoring incident at unknown intersection {}", intersection);
                    return;
                }
                let center = self.topology.center(intersection);
                let mut count = 0;
                for vehicle in &mut self.vehicles {
                    if !vehicle.disabled && vehicle.position.distance(&center) <= radius {
                        vehicle.disable();
                        count += 1;
                    }
                }
                info!("Incident at {} disabled {} vehicles", intersection, count);
            }
        }
    }

    /// Place a vehicle directly, bypassing the spawner.
    ///
    /// Takes effect immediately; meant for hosts that script scenarios.
    pub fn add_vehicle(
        &mut self,
        class: VehicleClass,
        heading: Heading,
        position: Position,
        speed: f64,
    ) -> VehicleId {
        let id = VehicleId(self.next_vehicle_id);
        self.next_vehicle_id += 1;
        let spec = self.config.class_spec(class);
        self.vehicles.push(Vehicle::new(id, class, spec, position, heading, speed));
        debug!("Added {:?} {} heading {} at ({:.1}, {:.1})", class, id, heading, position.x, position.y);
        id
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> Snapshot {
        self.apply_pending();

        let tick = self.tick + 1;
        let mut rng = self.tick_rng(tick);

        // Signals first, so every vehicle sees this tick's phases
        for intersection in &mut self.intersections {
            intersection.advance(self.config.yellow_duration);
        }

        self.queue_map = self
            .resolver
            .resolve(&mut self.vehicles, &self.intersections, &self.topology);

        self.router
            .route(&mut self.vehicles, &self.topology, &self.closed_segments, &mut rng);

        // Despawn vehicles that drove off the map
        let margin = self.config.despawn_margin;
        let before = self.vehicles.len();
        let topology = &self.topology;
        self.vehicles.retain(|v| topology.in_bounds(&v.position, margin));
        if self.vehicles.len() < before {
            debug!("Despawned {} vehicles at tick {}", before - self.vehicles.len(), tick);
        }

        if self.spawner.should_spawn(tick, self.vehicles.len()) {
            let id = VehicleId(self.next_vehicle_id);
            if let Some(vehicle) = self
                .spawner
                .try_spawn(id, &self.vehicles, &self.topology, &mut rng)
            {
                debug!("Spawned {:?} {} heading {}", vehicle.class, id, vehicle.heading);
                self.next_vehicle_id += 1;
                self.vehicles.push(vehicle);
            }
        }

        self.avg_speed = congestion::mean_speed(&self.vehicles);
        self.tick = tick;

        if tick % self.config.report_interval == 0 {
            let report = congestion::summarize(
                tick,
                &self.vehicles,
                &self.queue_map,
                &self.topology,
                self.config.block_size,
            );
            info!(
                "Tick {}: {} vehicles, {} queued, avg speed {:.2}",
                tick, report.total_vehicles, report.total_queued, report.avg_speed
            );
            self.report = Some(report);
        }

        self.snapshot()
    }

    /// Copy out the state after the last completed tick.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            seed: self.seed,
            next_vehicle_id: self.next_vehicle_id,
            grid_size: self.topology.grid_size(),
            intersections: self.intersections.clone(),
            vehicles: self.vehicles.clone(),
            closed_segments: self.closed_segments.iter().copied().collect(),
            queue_map: self.queue_map.clone(),
            avg_speed: self.avg_speed,
        }
    }

    /// Take the latest congestion report, if one was published since the
    /// last call.
    pub fn take_congestion_report(&mut self) -> Option<CongestionReport> {
        self.report.take()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn intersections(&self) -> &[Intersection] {
        &self.intersections
    }

    pub fn intersection(&self, id: IntersectionId) -> Option<&Intersection> {
        self.intersections.get(id.index())
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicle_index(id).map(|index| &self.vehicles[index])
    }

    pub fn closed_segments(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.closed_segments.iter().copied()
    }

    pub fn is_closed(&self, segment: SegmentId) -> bool {
        self.closed_segments.contains(&segment)
    }

    pub fn queue_map(&self) -> &QueueMap {
        &self.queue_map
    }

    pub fn avg_speed(&self) -> f64 {
        self.avg_speed
    }

    /// Point in the `heading` lane `distance` units before the centre of
    /// `intersection`.
    pub fn approach_position(&self, intersection: IntersectionId, heading: Heading, distance: f64) -> Position {
        self.topology.approach_position(intersection, heading, distance)
    }

    /// Signed distance from a vehicle to the stop line it is approaching,
    /// or `None` if it has nothing ahead of it in the grid.
    pub fn distance_to_stop_line(&self, id: VehicleId) -> Option<f64> {
        let vehicle = self.vehicle(id)?;
        let target = vehicle
            .target
            .or_else(|| self.topology.next_intersection(&vehicle.position, vehicle.heading))?;
        Some(
            self.topology
                .distance_to_stop_line(target, &vehicle.position, vehicle.heading),
        )
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== Traffic Simulation Summary ===");
        println!("Tick: {} (seed {})", self.tick, self.seed);
        println!(
            "Intersections: {}, Segments: {} ({} closed)",
            self.topology.intersection_count(),
            self.topology.segment_count(),
            self.closed_segments.len()
        );
        let disabled = self.vehicles.iter().filter(|v| v.disabled).count();
        println!("Vehicles: {} ({} broken down)", self.vehicles.len(), disabled);
        println!("Average speed: {:.2}", self.avg_speed);
        println!();

        println!("--- Signals ---");
        for intersection in &self.intersections {
            let ns_queue = self.queue_map.axis_total(intersection.id, true);
            let ew_queue = self.queue_map.axis_total(intersection.id, false);
            println!(
                "  {} {:<18} ns={:?} ew={:?} green={} queue ns/ew={}/{}{}",
                intersection.id,
                intersection.label,
                intersection.light.ns,
                intersection.light.ew,
                intersection.green_duration,
                ns_queue,
                ew_queue,
                if intersection.is_overridden() {
                    " [override]"
                } else {
                    ""
                }
            );
        }

        let responders: Vec<&Vehicle> = self.vehicles.iter().filter(|v| v.is_responding()).collect();
        if !responders.is_empty() {
            println!("--- Emergency Responses ---");
            for vehicle in responders {
                if let Some(destination) = vehicle.destination() {
                    println!(
                        "  {} heading {} at ({:.1}, {:.1}) -> {}",
                        vehicle.id, vehicle.heading, vehicle.position.x, vehicle.position.y, destination
                    );
                }
            }
        }
    }
}

fn build_intersections(config: &SimConfig, topology: &Topology, labels: &[String]) -> Vec<Intersection> {
    let n = config.grid_size;
    let mut ids: Vec<IntersectionId> = topology.intersection_ids().collect();
    ids.sort();
    ids.into_iter()
        .map(|id| {
            let (x, y) = topology.coords(id);
            Intersection::new(id, junction_label(labels, x, y, n), x, y, config.green_duration)
        })
        .collect()
}
