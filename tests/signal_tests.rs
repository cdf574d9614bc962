//! Signal controller behaviour

use traffic_grid::simulation::{
    Intersection, IntersectionId, LightColor, LightPhase, SignalDurationChange, SignalOverride,
    SimConfig, SimWorld, OVERRIDE_TIMER,
};

fn quiet_config() -> SimConfig {
    SimConfig {
        spawn_interval: 0,
        seed: Some(11),
        ..SimConfig::default()
    }
}

/// Lengths of each complete run of identical phases in `phases`.
fn run_lengths(phases: &[LightPhase]) -> Vec<(LightPhase, usize)> {
    let mut runs: Vec<(LightPhase, usize)> = Vec::new();
    for phase in phases {
        match runs.last_mut() {
            Some((current, length)) if current == phase => *length += 1,
            _ => runs.push((*phase, 1)),
        }
    }
    // The last run may have been cut off
    runs.pop();
    runs
}

#[test]
fn test_phase_order_and_exact_durations() {
    let mut intersection = Intersection::new(IntersectionId(0), "Test".into(), 0, 0, 10);
    let yellow = 4;

    let mut phases = vec![intersection.light];
    for _ in 0..100 {
        intersection.advance(yellow);
        phases.push(intersection.light);
    }

    let runs = run_lengths(&phases);
    assert!(runs.len() >= 6);
    let expected_order = [
        LightPhase::NS_GREEN,
        LightPhase::NS_YELLOW,
        LightPhase::EW_GREEN,
        LightPhase::EW_YELLOW,
    ];
    for (index, (phase, length)) in runs.iter().enumerate() {
        assert_eq!(*phase, expected_order[index % 4], "run {} out of order", index);
        let expected = if phase.ns == LightColor::Yellow || phase.ew == LightColor::Yellow {
            yellow as usize
        } else {
            10
        };
        assert_eq!(*length, expected, "run {} ({:?}) has wrong length", index, phase);
    }
}

#[test]
fn test_phase_transitions_on_exact_ticks() {
    let mut intersection = Intersection::new(IntersectionId(0), "Test".into(), 0, 0, 10);

    for _ in 0..9 {
        intersection.advance(4);
        assert_eq!(intersection.light, LightPhase::NS_GREEN);
    }
    intersection.advance(4);
    assert_eq!(intersection.light, LightPhase::NS_YELLOW);
    assert_eq!(intersection.timer, 4);

    for _ in 0..3 {
        intersection.advance(4);
        assert_eq!(intersection.light, LightPhase::NS_YELLOW);
    }
    intersection.advance(4);
    assert_eq!(intersection.light, LightPhase::EW_GREEN);
    assert_eq!(intersection.timer, 10);
}

#[test]
fn test_override_freezes_phase() {
    let mut intersection = Intersection::new(IntersectionId(3), "Test".into(), 0, 1, 10);
    intersection.set_override(Some(SignalOverride::AllRed));

    for _ in 0..500 {
        intersection.advance(4);
        assert_eq!(intersection.light, LightPhase::ALL_RED);
        assert_eq!(intersection.timer, OVERRIDE_TIMER);
    }

    intersection.set_override(None);
    assert!(!intersection.is_overridden());
    assert_eq!(intersection.light, LightPhase::NS_GREEN);
    assert_eq!(intersection.timer, 11);
}

#[test]
fn test_releasing_ew_override_resumes_ew_green() {
    let mut intersection = Intersection::new(IntersectionId(0), "Test".into(), 0, 0, 20);
    intersection.set_override(Some(SignalOverride::EwGreen));
    intersection.advance(4);
    assert_eq!(intersection.light, LightPhase::EW_GREEN);

    intersection.set_override(None);
    assert_eq!(intersection.light, LightPhase::EW_GREEN);
    assert_eq!(intersection.timer, 21);

    // A full green, then normal cycling continues from there
    for _ in 0..20 {
        intersection.advance(4);
        assert_eq!(intersection.light, LightPhase::EW_GREEN);
    }
    intersection.advance(4);
    assert_eq!(intersection.light, LightPhase::EW_YELLOW);
}

#[test]
fn test_green_resumed_by_command_lasts_full_duration() {
    let config = SimConfig {
        green_duration: 30,
        ..quiet_config()
    };
    let mut world = SimWorld::new(config).unwrap();
    let junction = IntersectionId(2);
    world.force_override(junction, Some(SignalOverride::EwGreen));
    for _ in 0..5 {
        world.tick();
    }

    world.force_override(junction, None);
    let mut green_ticks = 0;
    loop {
        let snapshot = world.tick();
        let light = snapshot.intersections[junction.index()].light;
        if light != LightPhase::EW_GREEN {
            assert_eq!(light, LightPhase::EW_YELLOW);
            break;
        }
        green_ticks += 1;
        assert!(green_ticks <= 30, "resumed green overran");
    }
    assert_eq!(green_ticks, 30);
}

#[test]
fn test_new_green_duration_applies_from_next_green() {
    let mut intersection = Intersection::new(IntersectionId(0), "Test".into(), 0, 0, 10);
    for _ in 0..3 {
        intersection.advance(4);
    }
    intersection.set_green_duration(20);
    assert_eq!(intersection.timer, 7);

    // Finish NS green and NS yellow
    for _ in 0..11 {
        intersection.advance(4);
    }
    assert_eq!(intersection.light, LightPhase::EW_GREEN);
    assert_eq!(intersection.timer, 20);
}

#[test]
fn test_mutual_exclusion_holds_every_tick() {
    let config = SimConfig {
        seed: Some(5),
        green_duration: 40,
        yellow_duration: 7,
        stagger_signals: true,
        ..SimConfig::default()
    };
    let mut world = SimWorld::new(config).unwrap();

    for tick in 0..600u64 {
        if tick == 100 {
            world.force_override(IntersectionId(4), Some(SignalOverride::AllRed));
        }
        if tick == 200 {
            world.force_override(IntersectionId(4), None);
            world.force_override(IntersectionId(0), Some(SignalOverride::EwGreen));
        }
        if tick == 300 {
            world.force_override(IntersectionId(0), None);
        }
        let snapshot = world.tick();
        for intersection in &snapshot.intersections {
            assert!(
                intersection.light.is_exclusive(),
                "{} shows {:?} at tick {}",
                intersection.id,
                intersection.light,
                snapshot.tick
            );
        }
    }
}

#[test]
fn test_signal_durations_are_clamped_and_applied_at_tick_boundary() {
    let mut world = SimWorld::new(quiet_config()).unwrap();
    world.apply_signal_durations(vec![
        SignalDurationChange {
            intersection: IntersectionId(0),
            green_duration: 5,
        },
        SignalDurationChange {
            intersection: IntersectionId(1),
            green_duration: 1000,
        },
        SignalDurationChange {
            intersection: IntersectionId(2),
            green_duration: 120,
        },
        SignalDurationChange {
            intersection: IntersectionId(99),
            green_duration: 100,
        },
    ]);

    // Nothing changes until the next tick
    assert_eq!(world.intersections()[0].green_duration, 150);
    assert_eq!(world.pending_commands(), 1);

    world.tick();
    assert_eq!(world.pending_commands(), 0);
    assert_eq!(world.intersections()[0].green_duration, 60);
    assert_eq!(world.intersections()[1].green_duration, 300);
    assert_eq!(world.intersections()[2].green_duration, 120);
    assert_eq!(world.intersections()[3].green_duration, 150);
    assert_eq!(world.intersections().len(), 9);
}

#[test]
fn test_staggered_timers_are_seeded() {
    let config = SimConfig {
        stagger_signals: true,
        ..quiet_config()
    };
    let first = SimWorld::new(config.clone()).unwrap();
    let second = SimWorld::new(config).unwrap();

    let timers: Vec<u32> = first.intersections().iter().map(|i| i.timer).collect();
    let again: Vec<u32> = second.intersections().iter().map(|i| i.timer).collect();
    assert_eq!(timers, again);
    assert!(timers.iter().all(|timer| (1..=150).contains(timer)));
}
