// moto_sim/tests/scenarios.rs

//! Whole scenarios driven through the reference world.

use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use moto_sim::prelude::*;

fn asset(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("assets/scenarios")
        .join(name)
}

fn quiet(mut config: ScenarioConfig) -> ScenarioConfig {
    config.simulation.log_interval_seconds = 0.0;
    config
}

fn ridden() -> ScenarioConfig {
    quiet(ScenarioConfig {
        occupied_seat: Some(0),
        ..ScenarioConfig::default()
    })
}

fn hold(keys: &[Key], start: f64, end: f64) -> InputPhase {
    InputPhase {
        start,
        end,
        keys: keys.to_vec(),
    }
}

#[test]
fn bundled_scenarios_load() {
    let lean = load_scenario(&asset("lean_turn.toml")).unwrap();
    assert_eq!(lean.occupied_seat, Some(0));
    assert_eq!(lean.script.len(), 2);

    let righting = load_scenario(&asset("righting.toml")).unwrap();
    assert_eq!(righting.occupied_seat, None);
    assert_eq!(righting.events[0].action, VehicleEvent::StartRighting);
}

#[test]
fn holding_right_steers_to_the_lock() {
    let mut config = ridden();
    config.script = vec![hold(&[Key::Right], 0.0, 1.0)];
    let mut runner = ScenarioRunner::new(config).unwrap();

    runner.run_for(0.5);
    assert_abs_diff_eq!(runner.state().steering_angle, 30.0_f64.to_radians(), epsilon = 1e-9);

    // Letting go re-centres at the same rate.
    runner.run_for(1.0);
    assert_abs_diff_eq!(runner.state().steering_angle, 0.0, epsilon = 1e-9);
    runner.finish();
}

#[test]
fn riding_forward_gains_speed_and_stays_upright() {
    let mut config = ridden();
    config.script = vec![hold(&[Key::Forward], 0.0, 3.0)];
    let mut runner = ScenarioRunner::new(config).unwrap();

    runner.run_for(3.0);
    let forward = runner.vehicle().linear_velocity(runner.world()).y;
    assert!(forward > 2.0, "forward speed {}", forward);
    assert!(runner.roll().abs() < 0.2, "roll {}", runner.roll());

    let summary = runner.finish();
    assert!(summary.final_position.y > 1.0);
}

#[test]
fn leaning_into_a_right_turn() {
    let config = quiet(load_scenario(&asset("lean_turn.toml")).unwrap());
    let mut runner = ScenarioRunner::new(config).unwrap();

    runner.run_for(2.0);
    let mut max_tilt = f64::MIN;
    let mut max_roll = f64::MIN;
    while runner.time() < 3.0 {
        runner.step();
        max_tilt = max_tilt.max(runner.state().target_tilt);
        max_roll = max_roll.max(runner.roll());
    }
    assert!(max_tilt > 0.05, "max tilt target {}", max_tilt);
    assert!(max_roll > 0.03, "max roll {}", max_roll);
    runner.finish();
}

#[test]
fn righting_in_mid_air_reduces_the_lean() {
    let mut config = quiet(ScenarioConfig::default());
    config.start.translation = Vector3::new(0.0, 0.0, 5.0);
    config.start.rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 80.0_f64.to_radians());
    config.events = vec![ScheduledEvent {
        at: 0.0,
        action: VehicleEvent::StartRighting,
    }];
    let mut runner = ScenarioRunner::new(config).unwrap();

    let mut roll = runner.roll();
    assert_abs_diff_eq!(roll, 80.0_f64.to_radians(), epsilon = 1e-9);
    for _ in 0..5 {
        runner.run_for(0.1);
        let next = runner.roll();
        assert!(next.abs() < roll.abs(), "roll went from {} to {}", roll, next);
        roll = next;
    }
    assert!(roll.abs() < 40.0_f64.to_radians());
    // Still falling freely.
    assert!(runner.vehicle().body_transform(runner.world()).translation.z > 3.0);
    runner.finish();
}

#[test]
fn debug_primitives_live_until_destroy() {
    let mut config = ridden();
    config.simulation.debug_vis = true;
    let mut runner = ScenarioRunner::new(config).unwrap();

    runner.step();
    assert_eq!(runner.renderer().live_count(), 10);

    // Switching the visualization off releases everything.
    runner.set_debug_visualization(false);
    runner.step();
    assert_eq!(runner.renderer().live_count(), 0);

    runner.set_debug_visualization(true);
    runner.step();
    let summary = runner.finish();
    assert_eq!(summary.primitives_created, 20);
    assert_eq!(summary.primitives_alive, 0);
}

#[test]
fn destroy_leaves_an_empty_world() {
    let mut world = FlatGroundWorld::new(&WorldConfig::default());
    let object = WorldObject {
        id: ObjectId(9),
        pose: Isometry3::from_parts(Translation3::new(0.0, 0.0, 0.6), UnitQuaternion::identity()),
    };
    let mut vehicle = create_vehicle(
        &object,
        VehicleSettings::default(),
        TuningConfig::default(),
        &mut world,
        None,
    )
    .unwrap();
    assert_eq!(world.body_count(), 1);
    assert_eq!(world.constraint_count(), 1);
    assert_eq!(world.listener_count(), 1);

    let input = PhysicsInput {
        forward: true,
        ..Default::default()
    };
    for _ in 0..10 {
        vehicle.update(&mut world, None, &input, 1.0 / 120.0);
        world.step(1.0 / 120.0);
    }

    vehicle.destroy(&mut world, None);
    assert_eq!(world.body_count(), 0);
    assert_eq!(world.constraint_count(), 0);
    assert_eq!(world.listener_count(), 0);
    assert_eq!(world.object_body(ObjectId(9)), None);
}

#[test]
fn rebuilding_after_destroy_starts_fresh() {
    let mut world = FlatGroundWorld::new(&WorldConfig::default());
    let object = WorldObject {
        id: ObjectId(3),
        pose: Isometry3::translation(2.0, 0.0, 0.6),
    };
    let first = create_vehicle(&object, VehicleSettings::default(), TuningConfig::default(), &mut world, None)
        .unwrap();
    first.destroy(&mut world, None);

    let second = create_vehicle(&object, VehicleSettings::default(), TuningConfig::default(), &mut world, None)
        .unwrap();
    assert_eq!(world.body_count(), 1);
    assert_abs_diff_eq!(second.body_transform(&world).translation.x, 2.0, epsilon = 1e-12);
    second.destroy(&mut world, None);
}

#[test]
fn missing_scenario_is_a_config_error() {
    let err = load_scenario(&asset("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}
