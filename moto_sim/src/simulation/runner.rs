// moto_sim/src/simulation/runner.rs

use nalgebra::Vector3;
use tracing::{debug, info};

use moto_core::abstractions::SkeletonPose;
use moto_core::frames::{ModelFrame, VehicleBasis};
use moto_core::messages::{PhysicsInput, VehicleUpdateEvents};
use moto_core::types::{ObjectId, WorldObject};
use moto_core::vehicle::{create_vehicle, VehiclePhysics, VehicleRuntimeState};

use super::config::{input_at, ScenarioConfig, ScheduledEvent, VehicleEvent};
use super::physics::FlatGroundWorld;
use super::render::{HeadlessRenderer, NamedSkeleton};
use crate::error::SimError;

/// The world object every scenario drives.
pub const VEHICLE_OBJECT: ObjectId = ObjectId(1);

/// Slack when comparing the clock against scheduled times.
const TIME_EPSILON: f64 = 1.0e-9;

/// What a finished run looked like.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub duration: f64,
    pub final_position: Vector3<f64>,
    pub final_speed: f64,
    pub final_roll: f64,
    pub max_abs_roll: f64,
    pub primitives_created: usize,
    /// Debug primitives still alive after the vehicle was destroyed.
    pub primitives_alive: usize,
    /// Bodies left in the world after the vehicle was destroyed.
    pub bodies_alive: usize,
}

/// Steps one vehicle through a scenario at a fixed rate.
///
/// Per step: fire due events, update the controller with the scripted input,
/// advance the world, then refresh (or release) the debug primitives.
#[derive(Debug)]
pub struct ScenarioRunner {
    config: ScenarioConfig,
    frame: ModelFrame,
    world: FlatGroundWorld,
    renderer: HeadlessRenderer,
    skeleton: NamedSkeleton,
    vehicle: Box<dyn VehiclePhysics>,
    events: Vec<ScheduledEvent>,
    next_event: usize,
    show_debug: bool,
    time: f64,
    steps: u64,
    next_log: f64,
    max_abs_roll: f64,
}

impl ScenarioRunner {
    pub fn new(config: ScenarioConfig) -> Result<Self, SimError> {
        config.validate()?;

        let mut world = FlatGroundWorld::new(&config.world);
        let skeleton = NamedSkeleton::stock_bike(&config.vehicle.joint_names);
        let object = WorldObject {
            id: VEHICLE_OBJECT,
            pose: config.start.to_isometry(),
        };
        let mut vehicle = create_vehicle(
            &object,
            config.vehicle.clone(),
            config.tuning.clone(),
            &mut world,
            Some(&skeleton as &dyn SkeletonPose),
        )?;
        vehicle.on_spawned();
        if let Some(seat) = config.occupied_seat {
            vehicle.on_seat_entered(seat);
        }

        let frame = ModelFrame::new(
            &config.vehicle.model_to_y_forwards_rot_1,
            &config.vehicle.model_to_y_forwards_rot_2,
        );
        Ok(Self {
            events: config.sorted_events(),
            show_debug: config.simulation.debug_vis,
            frame,
            world,
            renderer: HeadlessRenderer::new(),
            skeleton,
            vehicle,
            next_event: 0,
            time: 0.0,
            steps: 0,
            next_log: 0.0,
            max_abs_roll: 0.0,
            config,
        })
    }

    // --- Accessors ---

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn world(&self) -> &FlatGroundWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut FlatGroundWorld {
        &mut self.world
    }

    pub fn renderer(&self) -> &HeadlessRenderer {
        &self.renderer
    }

    pub fn skeleton(&self) -> &NamedSkeleton {
        &self.skeleton
    }

    pub fn vehicle(&self) -> &dyn VehiclePhysics {
        self.vehicle.as_ref()
    }

    pub fn state(&self) -> VehicleRuntimeState {
        self.vehicle.runtime_state()
    }

    pub fn set_debug_visualization(&mut self, show: bool) {
        self.show_debug = show;
    }

    pub fn input_now(&self) -> PhysicsInput {
        input_at(&self.config.script, self.time)
    }

    /// Current roll of the body, positive leaning right.
    pub fn roll(&self) -> f64 {
        let pose = self.vehicle.body_transform(&self.world);
        VehicleBasis::from_pose(&pose, &self.frame).roll()
    }

    pub fn speed(&self) -> f64 {
        self.vehicle.linear_velocity(&self.world).norm()
    }

    pub fn is_finished(&self) -> bool {
        self.time + TIME_EPSILON >= self.config.simulation.duration_seconds
    }

    // --- Stepping ---

    pub fn step(&mut self) -> VehicleUpdateEvents {
        let dt = self.config.simulation.dt;
        self.fire_due_events();

        let input = self.input_now();
        let events = self.vehicle.update(
            &mut self.world,
            Some(&mut self.skeleton as &mut dyn SkeletonPose),
            &input,
            dt,
        );
        self.world.step(dt);
        self.vehicle
            .update_debug_visualization(&self.world, &mut self.renderer, self.show_debug);

        self.time += dt;
        self.steps += 1;
        self.max_abs_roll = self.max_abs_roll.max(self.roll().abs());
        self.log_state_if_due();
        events
    }

    /// Steps until `seconds` of simulated time have passed.
    pub fn run_for(&mut self, seconds: f64) {
        let end = self.time + seconds;
        while self.time + TIME_EPSILON < end {
            self.step();
        }
    }

    /// Runs to the configured duration and tears the vehicle down.
    pub fn run(mut self) -> RunSummary {
        while !self.is_finished() {
            self.step();
        }
        self.finish()
    }

    /// Destroys the vehicle and reports on the run.
    pub fn finish(self) -> RunSummary {
        let final_position = self.vehicle.body_transform(&self.world).translation.vector;
        let final_speed = self.speed();
        let final_roll = self.roll();

        let Self {
            mut world,
            mut renderer,
            vehicle,
            time,
            steps,
            max_abs_roll,
            ..
        } = self;
        vehicle.destroy(&mut world, Some(&mut renderer));

        let summary = RunSummary {
            steps,
            duration: time,
            final_position,
            final_speed,
            final_roll,
            max_abs_roll,
            primitives_created: renderer.created_count(),
            primitives_alive: renderer.live_count(),
            bodies_alive: world.body_count(),
        };
        info!(
            "Finished after {} steps ({:.2} s): position ({:.2}, {:.2}, {:.2}), speed {:.2} m/s, max roll {:.1} deg",
            summary.steps,
            summary.duration,
            final_position.x,
            final_position.y,
            final_position.z,
            final_speed,
            max_abs_roll.to_degrees()
        );
        summary
    }

    fn fire_due_events(&mut self) {
        while let Some(event) = self.events.get(self.next_event).copied() {
            if event.at > self.time + TIME_EPSILON {
                break;
            }
            debug!("t={:.3}s: firing {:?}", self.time, event.action);
            match event.action {
                VehicleEvent::StartRighting => self.vehicle.start_righting(),
                VehicleEvent::EnterSeat { seat } => self.vehicle.on_seat_entered(seat),
                VehicleEvent::ExitSeat => self.vehicle.on_seat_exited(),
                VehicleEvent::Spawned => self.vehicle.on_spawned(),
            }
            self.next_event += 1;
        }
    }

    fn log_state_if_due(&mut self) {
        let interval = self.config.simulation.log_interval_seconds;
        if interval <= 0.0 || self.time + TIME_EPSILON < self.next_log {
            return;
        }
        self.next_log = self.time + interval;

        let position = self.vehicle.body_transform(&self.world).translation.vector;
        let state = self.vehicle.runtime_state();
        info!(
            "t={:.2}s pos=({:.2}, {:.2}, {:.2}) speed={:.2} m/s roll={:.1} deg steer={:.1} deg tilt={:.1} deg",
            self.time,
            position.x,
            position.y,
            position.z,
            self.speed(),
            self.roll().to_degrees(),
            state.steering_angle.to_degrees(),
            state.target_tilt.to_degrees()
        );
    }
}
