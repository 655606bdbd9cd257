// moto_core/src/vehicle/bike.rs

use nalgebra::{Isometry3, Point3, Translation3, Vector3};
use tracing::{debug, info, trace, warn};

use crate::abstractions::{
    DebugRenderer, DriverInput, PhysicsWorld, SkeletonPose, VehicleConstraintSettings, WheelState,
};
use crate::builder::build_vehicle;
use crate::control::{map_input, target_roll_angle, RollStabilizer, SelfRightingController, SteeringFilter};
use crate::debug_vis::{DebugSnapshot, DebugVisualizer, DebugWheel};
use crate::error::VehicleBuildError;
use crate::frames::{ModelFrame, VehicleBasis};
use crate::messages::{PhysicsInput, VehicleUpdateEvents};
use crate::pose::{apply_joint_overrides, compute_joint_overrides, JointIndexTable, PoseInputs};
use crate::settings::{TuningConfig, VehicleSettings};
use crate::types::{BodyHandle, ConstraintHandle, ObjectId, WorldObject, FRONT_WHEEL, REAR_WHEEL, WHEEL_COUNT};
use crate::vehicle::{VehicleKind, VehiclePhysics, VehicleRuntimeState};

/// Time since spawn reported before the first `on_spawned`; far past any effect.
const NEVER_SPAWNED: f64 = 1.0e7;

/// Controller for a two-wheeled motorbike.
///
/// Steering is rate limited and self-centering. While the controlling seat is
/// occupied the bike leans into turns: the lean that balances the measured lateral
/// tire force becomes the tilt target of the constraint's roll limiter. With nobody
/// riding, the roll limiter is opened up and the bike falls over like any other
/// body until righting is requested.
#[derive(Debug)]
pub struct BikePhysics {
    object: ObjectId,
    settings: VehicleSettings,
    tuning: TuningConfig,
    frame: ModelFrame,

    body: BodyHandle,
    constraint: ConstraintHandle,
    constraint_settings: VehicleConstraintSettings,
    joints: JointIndexTable,

    seat: Option<usize>,
    steering: SteeringFilter,
    roll: RollStabilizer,
    righting: SelfRightingController,
    time_since_spawn: f64,

    debug_vis: DebugVisualizer,
    destroyed: bool,
}

impl BikePhysics {
    /// Builds the physics side of the bike for `object`. See [`build_vehicle`].
    pub fn new(
        object: &WorldObject,
        settings: VehicleSettings,
        tuning: TuningConfig,
        physics: &mut dyn PhysicsWorld,
        skeleton: Option<&dyn SkeletonPose>,
    ) -> Result<Self, VehicleBuildError> {
        let built = build_vehicle(object, &settings, &tuning, physics, skeleton)?;
        let frame = ModelFrame::new(
            &settings.model_to_y_forwards_rot_1,
            &settings.model_to_y_forwards_rot_2,
        );
        let steering = SteeringFilter::new(settings.max_steering_angle(), tuning.steering_rate);

        Ok(Self {
            object: object.id,
            settings,
            tuning,
            frame,
            body: built.body,
            constraint: built.constraint,
            constraint_settings: built.constraint_settings,
            joints: built.joints,
            seat: None,
            steering,
            roll: RollStabilizer::default(),
            righting: SelfRightingController::default(),
            time_since_spawn: NEVER_SPAWNED,
            debug_vis: DebugVisualizer::new(),
            destroyed: false,
        })
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn constraint(&self) -> ConstraintHandle {
        self.constraint
    }

    pub fn tuning(&self) -> &TuningConfig {
        &self.tuning
    }

    pub fn joints(&self) -> &JointIndexTable {
        &self.joints
    }

    pub fn debug_visualizer(&self) -> &DebugVisualizer {
        &self.debug_vis
    }

    /// World transform of a wheel, from its constraint-local transform.
    pub fn wheel_to_world_transform(&self, physics: &dyn PhysicsWorld, wheel: usize) -> Isometry3<f64> {
        assert!(wheel < WHEEL_COUNT, "wheel index {} out of range", wheel);
        physics.body_pose(self.body) * physics.wheel_state(self.constraint, wheel).local_transform
    }

    /// Progress of a spawn effect lasting `duration` seconds, in `[0, 1]`.
    pub fn spawn_effect_fraction(&self, duration: f64) -> f64 {
        if duration <= 0.0 {
            return 1.0;
        }
        (self.time_since_spawn / duration).clamp(0.0, 1.0)
    }

    fn is_controlled(&self) -> bool {
        self.seat == Some(self.tuning.controlling_seat)
    }

    fn wheel_states(&self, physics: &dyn PhysicsWorld) -> [WheelState; WHEEL_COUNT] {
        [
            physics.wheel_state(self.constraint, FRONT_WHEEL),
            physics.wheel_state(self.constraint, REAR_WHEEL),
        ]
    }

    fn debug_snapshot(&self, physics: &dyn PhysicsWorld) -> DebugSnapshot {
        let states = self.wheel_states(physics);
        let wheel = |i: usize| {
            let ws = &self.constraint_settings.wheels[i];
            DebugWheel {
                attach_position: ws.position,
                radius: ws.radius,
                width: ws.width,
                state: states[i],
            }
        };
        DebugSnapshot {
            body_transform: physics.body_pose(self.body),
            sim_to_model: *self.frame.sim_to_model(),
            half_extents: self.settings.half_extents,
            wheels: [wheel(FRONT_WHEEL), wheel(REAR_WHEEL)],
            desired_up: *self.roll.last_desired_up(),
        }
    }
}

impl VehiclePhysics for BikePhysics {
    fn kind(&self) -> VehicleKind {
        VehicleKind::Bike
    }

    fn controlled_object(&self) -> ObjectId {
        self.object
    }

    fn settings(&self) -> &VehicleSettings {
        &self.settings
    }

    fn runtime_state(&self) -> VehicleRuntimeState {
        VehicleRuntimeState {
            occupied_seat: self.seat,
            steering_angle: self.steering.angle(),
            smoothed_desired_roll: self.roll.smoothed_desired_roll(),
            target_tilt: self.roll.target_tilt(),
            righting_time_remaining: self.righting.time_remaining(),
            time_since_spawn: self.time_since_spawn,
            last_desired_up: *self.roll.last_desired_up(),
        }
    }

    fn start_righting(&mut self) {
        self.righting.start(self.tuning.righting_duration);
    }

    fn on_seat_entered(&mut self, seat: usize) {
        assert!(
            seat < self.settings.seats.len(),
            "seat index {} out of range for {} seats",
            seat,
            self.settings.seats.len()
        );
        info!("Object {:?}: seat {} ({}) occupied", self.object, seat, self.settings.seats[seat].name);
        self.seat = Some(seat);
        self.righting.cancel();
    }

    fn on_seat_exited(&mut self) {
        debug!("Object {:?}: seat {:?} vacated", self.object, self.seat);
        self.seat = None;
        self.righting.cancel();
    }

    fn on_spawned(&mut self) {
        self.time_since_spawn = 0.0;
    }

    fn update(
        &mut self,
        physics: &mut dyn PhysicsWorld,
        skeleton: Option<&mut dyn SkeletonPose>,
        input: &PhysicsInput,
        dt: f64,
    ) -> VehicleUpdateEvents {
        let events = VehicleUpdateEvents::default();

        // --- Driver input ---
        let axes = map_input(input);
        self.steering.update(axes.steering_target, dt);

        // The steering angle itself, in radians, is the fraction of wheel lock.
        let driver = DriverInput {
            forward: axes.throttle,
            right: self.steering.angle(),
            brake: axes.brake,
            hand_brake: axes.hand_brake,
        };
        if driver != DriverInput::default() {
            physics.activate_body(self.body);
        }
        physics.set_driver_input(self.constraint, &driver);

        let pose = physics.body_pose(self.body);
        let basis = VehicleBasis::from_pose(&pose, &self.frame);
        let wheels = self.wheel_states(physics);
        let mass = self.settings.mass;

        // --- Lean control ---
        if self.is_controlled() {
            physics.set_max_roll_angle(self.constraint, self.tuning.occupied_max_roll_angle);

            if wheels.iter().all(|w| !w.has_contact) && axes.pitch != 0.0 {
                let torque = basis.right * mass * self.tuning.air_pitch_torque_gain * axes.pitch;
                physics.add_torque(self.body, &torque);
            }

            let target = target_roll_angle(
                &wheels,
                &basis.no_roll_right,
                mass,
                self.tuning.gravity,
                dt,
            );
            let tilt = self.roll.update(
                target,
                &basis.no_roll_right,
                &basis.no_roll_up,
                dt,
                self.tuning.roll_smoothing_rate,
                self.tuning.roll_max_blend,
            );
            physics.set_tilt_angle(self.constraint, tilt);
        } else {
            physics.set_max_roll_angle(self.constraint, self.tuning.unoccupied_max_roll_angle);
        }

        // --- Self-righting ---
        let angular_velocity = physics.angular_velocity(self.body);
        if let Some(cmd) = self.righting.update(
            &pose.rotation,
            basis.yaw(),
            self.frame.model_to_sim(),
            &angular_velocity,
            mass,
            self.tuning.righting_angular_gain,
            self.tuning.righting_torque_gain,
            dt,
        ) {
            trace!("Righting torque {:?}, remaining rotation {:?}", cmd.torque, cmd.rotation);
            physics.add_torque(self.body, &cmd.torque);
        }

        // --- Procedural pose ---
        if let Some(skeleton) = skeleton {
            let inputs = PoseInputs {
                steering_angle: self.steering.angle(),
                suspension_lengths: [wheels[FRONT_WHEEL].suspension_length, wheels[REAR_WHEEL].suspension_length],
                wheel_angles: [wheels[FRONT_WHEEL].rotation_angle, wheels[REAR_WHEEL].rotation_angle],
            };
            let overrides = compute_joint_overrides(
                &inputs,
                &self.joints,
                &self.tuning.pose,
                skeleton.joint_count(),
            );
            apply_joint_overrides(&overrides, skeleton);
        }

        self.time_since_spawn += dt;
        events
    }

    fn first_person_camera_position(&self, physics: &dyn PhysicsWorld) -> Point3<f64> {
        let seat = self.seat.unwrap_or(self.tuning.controlling_seat);
        self.seat_to_world_transform(physics, seat)
            * Point3::new(0.0, 0.0, self.tuning.camera_head_height)
    }

    fn third_person_camera_target_translation(&self) -> Vector3<f64> {
        Vector3::zeros()
    }

    fn body_transform(&self, physics: &dyn PhysicsWorld) -> Isometry3<f64> {
        physics.body_pose(self.body)
    }

    fn seat_to_world_transform(&self, physics: &dyn PhysicsWorld, seat: usize) -> Isometry3<f64> {
        assert!(seat < self.settings.seats.len(), "seat index {} out of range", seat);
        // Seat space is y-forward; R^-1 takes it into model space at the seat position.
        let seat_to_object = Isometry3::from_parts(
            Translation3::from(self.settings.seats[seat].seat_position),
            *self.frame.sim_to_model(),
        );
        physics.body_pose(self.body) * seat_to_object
    }

    fn linear_velocity(&self, physics: &dyn PhysicsWorld) -> Vector3<f64> {
        physics.linear_velocity(self.body)
    }

    fn update_debug_visualization(
        &mut self,
        physics: &dyn PhysicsWorld,
        renderer: &mut dyn DebugRenderer,
        show: bool,
    ) {
        if show {
            let snapshot = self.debug_snapshot(physics);
            self.debug_vis.show(renderer, &snapshot);
        } else {
            self.debug_vis.release(renderer);
        }
    }

    fn destroy(mut self: Box<Self>, physics: &mut dyn PhysicsWorld, renderer: Option<&mut dyn DebugRenderer>) {
        physics.remove_step_listener(self.constraint);
        physics.remove_constraint(self.constraint);

        match renderer {
            Some(renderer) => self.debug_vis.release(renderer),
            None if !self.debug_vis.primitives().is_empty() => warn!(
                "Object {:?}: destroyed without a renderer, {} debug primitives leaked",
                self.object,
                self.debug_vis.primitives().owned_count()
            ),
            None => {}
        }

        physics.remove_object(self.object);
        self.destroyed = true;
        info!("Object {:?}: vehicle destroyed", self.object);
    }
}

impl Drop for BikePhysics {
    fn drop(&mut self) {
        if !self.destroyed {
            warn!(
                "Object {:?}: bike controller dropped without destroy(), body {:?} is still registered",
                self.object, self.body
            );
        }
    }
}
