//! Motion, braking and car-following behaviour

use assert_approx_eq::assert_approx_eq;
use traffic_grid::simulation::{
    Heading, IntersectionId, LightColor, MotionResolver, MotionState, Position, SegmentId,
    SignalOverride, SimConfig, SimWorld, Vehicle, VehicleClass, VehicleId,
};

fn quiet_config() -> SimConfig {
    SimConfig {
        spawn_interval: 0,
        seed: Some(3),
        ..SimConfig::default()
    }
}

fn same_lane(a: &Vehicle, b: &Vehicle, tolerance: f64) -> bool {
    a.heading == b.heading
        && (a.position.lateral(a.heading) - b.position.lateral(a.heading)).abs() < tolerance
}

#[test]
fn test_vehicle_stops_before_red_stop_line() {
    let mut world = SimWorld::new(quiet_config()).unwrap();
    let center = IntersectionId(4);
    world.force_override(center, Some(SignalOverride::AllRed));
    let start = world.approach_position(center, Heading::South, 200.0);
    let id = world.add_vehicle(VehicleClass::Car, Heading::South, start, 4.0);

    for _ in 0..400 {
        world.tick();
        let distance = world.distance_to_stop_line(id).unwrap();
        assert!(distance >= 0.0, "crossed the stop line: {}", distance);
    }

    let vehicle = world.vehicle(id).unwrap();
    assert_eq!(vehicle.speed, 0.0);
    assert_eq!(vehicle.motion, MotionState::Stopped);
    assert_eq!(vehicle.target, Some(center));
    assert_eq!(world.queue_map().get(center, Heading::South), 1);
}

#[test]
fn test_queue_counts_vehicles_behind_stopped_leader() {
    let mut world = SimWorld::new(quiet_config()).unwrap();
    let center = IntersectionId(4);
    world.force_override(center, Some(SignalOverride::AllRed));
    let leader_start = world.approach_position(center, Heading::South, 200.0);
    let follower_start = world.approach_position(center, Heading::South, 260.0);
    let leader = world.add_vehicle(VehicleClass::Car, Heading::South, leader_start, 4.0);
    let follower = world.add_vehicle(VehicleClass::Car, Heading::South, follower_start, 4.0);

    for _ in 0..400 {
        world.tick();
    }

    let leader = world.vehicle(leader).unwrap().clone();
    let follower = world.vehicle(follower).unwrap().clone();
    assert_eq!(leader.speed, 0.0);
    assert_eq!(follower.speed, 0.0);
    let gap = follower.position.along_to(&leader.position, Heading::South);
    assert!(gap > 0.5 * (leader.length + follower.length), "gap {}", gap);
    assert_eq!(world.queue_map().get(center, Heading::South), 2);
    assert_eq!(world.queue_map().total(), 2);
}

#[test]
fn test_follower_stops_behind_broken_down_vehicle() {
    let mut world = SimWorld::new(quiet_config()).unwrap();
    let lane_x = world.topology().lane_center(1, Heading::South);
    let obstacle = world.add_vehicle(VehicleClass::Bus, Heading::South, Position::new(lane_x, 250.0), 0.0);
    let follower = world.add_vehicle(VehicleClass::Car, Heading::South, Position::new(lane_x, 150.0), 4.0);
    world.spawn_incident_obstacle(obstacle);
    world.force_override(IntersectionId(4), Some(SignalOverride::NsGreen));

    for _ in 0..200 {
        world.tick();
        let obstacle = world.vehicle(obstacle).unwrap();
        let follower = world.vehicle(follower).unwrap();
        assert!(obstacle.disabled);
        assert_approx_eq!(obstacle.position.y, 250.0);
        let gap = follower.position.along_to(&obstacle.position, Heading::South);
        assert!(gap > 0.5 * (obstacle.length + follower.length), "gap {}", gap);
    }

    let follower = world.vehicle(follower).unwrap();
    assert_eq!(follower.speed, 0.0);
    assert_eq!(follower.motion, MotionState::Stopped);
    // A vehicle stuck behind an obstacle on a green approach is not a signal queue
    assert!(world.queue_map().is_empty());
}

#[test]
fn test_green_ten_vehicle_clears_line_during_green() {
    let config = SimConfig {
        grid_size: 1,
        green_duration: 10,
        ..quiet_config()
    };
    let mut world = SimWorld::new(config).unwrap();
    let junction = IntersectionId(0);
    // Eastbound traffic sees red first: NS green for 10 ticks, then NS yellow
    let start = world.approach_position(junction, Heading::East, 150.0);
    let id = world.add_vehicle(VehicleClass::Car, Heading::East, start, 0.0);
    let green_from = 10 + world.config().yellow_duration as u64;

    let mut crossed_at = None;
    for _ in 0..green_from + 10 {
        let snapshot = world.tick();
        let vehicle = world.vehicle(id).unwrap();
        let front = world.distance_to_stop_line(id).unwrap() - vehicle.length / 2.0;

        if snapshot.tick == green_from - 1 {
            assert_eq!(vehicle.motion, MotionState::Stopped);
            assert_eq!(vehicle.speed, 0.0);
        }
        if snapshot.tick == green_from {
            assert_eq!(snapshot.intersections[0].light.ew, LightColor::Green);
            assert_eq!(vehicle.motion, MotionState::Accelerating);
        }
        if snapshot.tick < green_from {
            assert!(front >= 0.0, "crossed on red at tick {}", snapshot.tick);
        } else if front < 0.0 && crossed_at.is_none() {
            crossed_at = Some(snapshot.tick);
        }
    }

    let crossed_at = crossed_at.expect("vehicle never crossed the stop line");
    assert!(crossed_at < green_from + 10);
}

#[test]
fn test_speed_ramps_to_class_cap() {
    let mut world = SimWorld::new(quiet_config()).unwrap();
    let lane_y = world.topology().lane_center(0, Heading::East);
    let car = world.add_vehicle(VehicleClass::Car, Heading::East, Position::new(-40.0, lane_y), 0.0);
    let bus_lane_y = world.topology().lane_center(2, Heading::East);
    let bus = world.add_vehicle(VehicleClass::Bus, Heading::East, Position::new(-40.0, bus_lane_y), 0.0);
    world.force_override(IntersectionId(0), Some(SignalOverride::EwGreen));
    world.force_override(IntersectionId(6), Some(SignalOverride::EwGreen));

    world.tick();
    let vehicle = world.vehicle(car).unwrap();
    assert_approx_eq!(vehicle.speed, 0.15);
    assert_eq!(vehicle.motion, MotionState::Accelerating);
    assert_approx_eq!(vehicle.position.x, -40.0 + 0.15);

    for _ in 0..40 {
        world.tick();
    }
    let car = world.vehicle(car).unwrap();
    let bus = world.vehicle(bus).unwrap();
    assert_approx_eq!(car.speed, 4.0);
    assert_eq!(car.motion, MotionState::Moving);
    assert_approx_eq!(bus.speed, 4.0 * 0.7);
    assert!(bus.speed <= bus.max_speed);
}

#[test]
fn test_no_overlap_in_lanes_with_random_traffic() {
    let config = SimConfig {
        seed: Some(2024),
        spawn_interval: 5,
        green_duration: 80,
        yellow_duration: 20,
        ..SimConfig::default()
    };
    let tolerance = config.lane_tolerance;
    let mut world = SimWorld::new(config).unwrap();
    world.set_road_closed(SegmentId::new(IntersectionId(4), IntersectionId(5)), true);

    let mut peak = 0;
    for _ in 0..1500 {
        let snapshot = world.tick();
        peak = peak.max(snapshot.vehicles.len());
        let active: Vec<&Vehicle> = snapshot.vehicles.iter().filter(|v| !v.disabled).collect();
        for (i, a) in active.iter().enumerate() {
            assert!(a.speed >= 0.0 && a.speed <= a.response_speed + 1e-9);
            for b in &active[i + 1..] {
                if same_lane(a, b, tolerance) {
                    let gap = a.position.along_to(&b.position, a.heading).abs();
                    assert!(
                        gap > 0.5 * (a.length + b.length) - 1e-6,
                        "{} and {} overlap at tick {} (gap {})",
                        a.id,
                        b.id,
                        snapshot.tick,
                        gap
                    );
                }
            }
        }
    }
    assert!(peak > 10, "spawner barely produced traffic");
}

#[test]
fn test_disabled_vehicles_excluded_from_mean_speed() {
    let mut world = SimWorld::new(quiet_config()).unwrap();
    let lane_y = world.topology().lane_center(0, Heading::East);
    let moving = world.add_vehicle(VehicleClass::Car, Heading::East, Position::new(-40.0, lane_y), 2.0);
    let lane_x = world.topology().lane_center(2, Heading::South);
    let broken = world.add_vehicle(VehicleClass::Car, Heading::South, Position::new(lane_x, 400.0), 3.0);
    world.spawn_incident_obstacle(broken);

    let snapshot = world.tick();
    let moving = world.vehicle(moving).unwrap();
    assert_approx_eq!(snapshot.avg_speed, moving.speed);
    assert_approx_eq!(moving.speed, 2.15);
}

#[test]
fn test_held_vehicle_is_brought_under_its_cap() {
    let config = quiet_config();
    let world = SimWorld::new(config.clone()).unwrap();
    let resolver = MotionResolver::new(&config);
    let junction = IntersectionId(4);
    assert_eq!(world.intersections()[4].light.for_heading(Heading::East), LightColor::Red);

    let mut vehicle = Vehicle::new(
        VehicleId(0),
        VehicleClass::Emergency,
        config.class_spec(VehicleClass::Emergency),
        world.approach_position(junction, Heading::East, 150.0),
        Heading::East,
        0.0,
    );
    // Left over from a response that just ended
    vehicle.speed = 2.0 * vehicle.max_speed;
    let start = vehicle.position;
    let mut vehicles = vec![vehicle];

    resolver.resolve(&mut vehicles, world.intersections(), world.topology());

    assert_eq!(vehicles[0].motion, MotionState::Stopped);
    assert!(vehicles[0].speed <= vehicles[0].max_speed, "speed {}", vehicles[0].speed);
    assert_approx_eq!(vehicles[0].position.x, start.x);
}
