// moto_sim/src/simulation/physics/vehicle.rs

//! The wheeled-vehicle constraint of the reference world.
//!
//! Suspension rays, tire friction and wheel spin are rapier's raycast vehicle
//! controller. On top of it sit the parts a motorbike needs: engine torque routed
//! through the differentials, foot and hand brake limits, and a roll limiter that
//! keeps the body within `max_roll_angle` of the tilt target.

use std::f64::consts::TAU;

use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, Unit, UnitQuaternion, Vector3};
use rapier3d_f64::control::{DynamicRayCastVehicleController, WheelTuning};
use rapier3d_f64::prelude::{
    ColliderSet, QueryFilter, QueryPipeline, RigidBody, RigidBodyHandle, RigidBodySet,
};

use moto_core::abstractions::{DriverInput, VehicleConstraintSettings, WheelState};
use moto_core::types::{BodyHandle, WHEEL_COUNT};

// --- Suspension ---
const SUSPENSION_FREQUENCY_HZ: f64 = 1.5;
const SUSPENSION_DAMPING_RATIO: f64 = 0.5;
/// Suspension force clamp, as a multiple of the body's weight.
const MAX_SUSPENSION_LOAD: f64 = 10.0;

/// Fraction of the roll limit violation corrected per step.
const ROLL_LIMIT_BAUMGARTE: f64 = 0.2;

/// Rays reach past the suspension travel; hits beyond it are not contacts.
const CONTACT_SLOP: f64 = 1.0e-6;

/// Index and sign of the largest component of an axis-aligned direction.
fn dominant_axis(v: &Vector3<f64>) -> (usize, f64) {
    let index = v.iamax();
    (index, v[index].signum())
}

pub struct SimVehicle {
    pub body: BodyHandle,
    pub settings: VehicleConstraintSettings,
    pub input: DriverInput,
    pub max_roll_angle: f64,
    pub tilt_angle: f64,
    pub wheels: [WheelState; WHEEL_COUNT],
    controller: DynamicRayCastVehicleController,
    /// Takes the controller's positive forward axis onto the vehicle's forward.
    forward_sign: f64,
    previous_spin: [f64; WHEEL_COUNT],
    /// Spin rate of each wheel about its axle, in rad/s.
    wheel_speeds: [f64; WHEEL_COUNT],
}

impl SimVehicle {
    /// `mass` and `gravity` size the suspension; the springs settle each wheel
    /// at the same sag whatever the body weighs.
    pub fn new(
        body: BodyHandle,
        chassis: RigidBodyHandle,
        mass: f64,
        gravity: f64,
        settings: &VehicleConstraintSettings,
    ) -> Self {
        let mut controller = DynamicRayCastVehicleController::new(chassis);
        let (forward_axis, forward_sign) = dominant_axis(&settings.forward);
        controller.index_forward_axis = forward_axis;
        controller.index_up_axis = dominant_axis(&settings.up).0;

        // The controller scales stiffness and damping by the chassis mass.
        let omega = TAU * SUSPENSION_FREQUENCY_HZ;
        let share = 1.0 / WHEEL_COUNT as f64;
        let damping = 2.0 * SUSPENSION_DAMPING_RATIO * omega * share;
        let axle = settings.forward.cross(&settings.up);
        for ws in &settings.wheels {
            let tuning = WheelTuning {
                suspension_stiffness: omega * omega * share,
                suspension_compression: damping,
                suspension_damping: damping,
                max_suspension_travel: ws.suspension_max_length - ws.suspension_min_length,
                friction_slip: ws.longitudinal_friction.peak(),
                max_suspension_force: MAX_SUSPENSION_LOAD * mass * gravity,
                ..WheelTuning::default()
            };
            // Unloaded springs rest fully extended.
            controller.add_wheel(
                Point3::from(ws.position),
                ws.suspension_direction,
                axle,
                ws.suspension_max_length,
                ws.radius,
                &tuning,
            );
        }

        let mut vehicle = Self {
            body,
            settings: settings.clone(),
            input: DriverInput::default(),
            max_roll_angle: settings.max_roll_angle,
            tilt_angle: 0.0,
            wheels: [WheelState::default(); WHEEL_COUNT],
            controller,
            forward_sign,
            previous_spin: [0.0; WHEEL_COUNT],
            wheel_speeds: [0.0; WHEEL_COUNT],
        };
        for i in 0..WHEEL_COUNT {
            let max_length = vehicle.settings.wheels[i].suspension_max_length;
            vehicle.wheels[i].suspension_length = max_length;
            vehicle.wheels[i].local_transform = vehicle.wheel_local_transform(i, max_length, 0.0, 0.0);
        }
        vehicle
    }

    pub fn chassis(&self) -> RigidBodyHandle {
        self.controller.chassis
    }

    /// Body-space right, derived so that (right, forward, up) is right-handed.
    fn right(&self) -> Vector3<f64> {
        self.settings.forward.cross(&self.settings.up)
    }

    /// Wheel-to-body transform. The axle maps onto local Z.
    fn wheel_local_transform(&self, wheel: usize, length: f64, steer: f64, spin: f64) -> Isometry3<f64> {
        let ws = &self.settings.wheels[wheel];
        let up = Unit::new_normalize(self.settings.up);
        let right = Unit::new_normalize(self.right());
        let basis = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[
            up.into_inner(),
            right.cross(&up),
            right.into_inner(),
        ]));
        let rotation = UnitQuaternion::from_axis_angle(&up, -steer)
            * UnitQuaternion::from_axis_angle(&right, -spin)
            * UnitQuaternion::from_rotation_matrix(&basis);
        let translation = ws.position + ws.suspension_direction * length;
        Isometry3::from_parts(Translation3::from(translation), rotation)
    }

    /// Engine torque delivered to each wheel for the current input.
    fn drive_torques(&self) -> [f64; WHEEL_COUNT] {
        let mut torques = [0.0; WHEEL_COUNT];
        if self.input.hand_brake > 0.0 || self.input.forward == 0.0 {
            return torques;
        }
        let gear = self.settings.gear_ratios.first().copied().unwrap_or(1.0);
        let total = self.input.forward * self.settings.engine.max_torque * gear;
        for diff in &self.settings.differentials {
            // A negative index routes to no wheel.
            for (index, share) in [
                (diff.left_wheel, 1.0 - diff.left_right_split),
                (diff.right_wheel, diff.left_right_split),
            ] {
                if let Ok(i) = usize::try_from(index) {
                    if i < WHEEL_COUNT {
                        torques[i] += total * share;
                    }
                }
            }
        }
        torques
    }

    fn engine_over_revving(&self, wheel: usize) -> bool {
        let gear = self.settings.gear_ratios.first().copied().unwrap_or(1.0);
        let rpm = (self.wheel_speeds[wheel] * gear).abs() * 60.0 / TAU;
        rpm >= self.settings.engine.max_rpm
    }

    /// Runs one constraint step on the chassis, before the world integrates it.
    /// `principal_inertia` is the chassis inertia along its body axes.
    pub fn step(
        &mut self,
        bodies: &mut RigidBodySet,
        colliders: &ColliderSet,
        queries: &QueryPipeline,
        principal_inertia: &Vector3<f64>,
        dt: f64,
    ) {
        if dt <= 0.0 {
            return;
        }

        let drive = self.drive_torques();
        let mut engine_forces = [0.0; WHEEL_COUNT];
        let mut brakes = [0.0; WHEEL_COUNT];
        let mut steering = [0.0; WHEEL_COUNT];
        for (i, ws) in self.settings.wheels.iter().enumerate() {
            if !self.engine_over_revving(i) {
                engine_forces[i] = drive[i] / ws.radius;
            }
            let brake_torque = self.input.brake * ws.max_brake_torque
                + self.input.hand_brake * ws.max_hand_brake_torque;
            // The controller caps its rolling-friction impulse by `brake`.
            brakes[i] = brake_torque / ws.radius * dt;
            // Positive controller steering turns left.
            steering[i] = -self.input.right * ws.max_steer_angle;
        }
        for (i, wheel) in self.controller.wheels_mut().iter_mut().enumerate() {
            wheel.engine_force = engine_forces[i];
            wheel.brake = brakes[i];
            wheel.steering = steering[i];
        }

        let filter = QueryFilter::exclude_dynamic().exclude_rigid_body(self.controller.chassis);
        self.controller.update_vehicle(dt, bodies, colliders, queries, filter);

        let Some(chassis) = bodies.get_mut(self.controller.chassis) else {
            return;
        };
        let pose = *chassis.position();
        for i in 0..WHEEL_COUNT {
            let spin = self.forward_sign * self.controller.wheels()[i].rotation;
            self.wheel_speeds[i] = (spin - self.previous_spin[i]) / dt;
            self.previous_spin[i] = spin;
            self.wheels[i] = self.read_wheel(i, &pose, spin);
        }

        self.limit_roll(chassis, principal_inertia, dt);
    }

    /// Converts the controller's view of a wheel into a `WheelState`.
    fn read_wheel(&self, i: usize, pose: &Isometry3<f64>, spin: f64) -> WheelState {
        let ws = &self.settings.wheels[i];
        let wheel = &self.controller.wheels()[i];
        let info = wheel.raycast_info();
        let steer = self.input.right * ws.max_steer_angle;

        let mut state = WheelState {
            steer_angle: steer,
            rotation_angle: spin.rem_euclid(TAU),
            suspension_length: ws.suspension_max_length,
            ..WheelState::default()
        };

        let direction = pose.rotation * ws.suspension_direction;
        let reach = (info.contact_point_ws - info.hard_point_ws).dot(&direction) - ws.radius;
        if info.is_in_contact && reach <= ws.suspension_max_length + CONTACT_SLOP {
            let normal = info.contact_normal_ws;

            // Rolling direction of the steered wheel, projected onto the ground.
            let up = Unit::new_normalize(self.settings.up);
            let wheel_forward =
                pose.rotation * (UnitQuaternion::from_axis_angle(&up, -steer) * self.settings.forward);
            let longitudinal = (wheel_forward - normal * wheel_forward.dot(&normal))
                .try_normalize(1.0e-9)
                .unwrap_or_else(|| normal.cross(&(pose.rotation * self.right())));

            state.has_contact = true;
            state.contact_position = info.contact_point_ws;
            state.contact_normal = normal;
            state.contact_longitudinal = longitudinal;
            state.contact_lateral = longitudinal.cross(&normal);
            state.longitudinal_impulse = wheel.forward_impulse;
            state.lateral_impulse = wheel.side_impulse;
            state.suspension_length = info
                .suspension_length
                .clamp(ws.suspension_min_length, ws.suspension_max_length);
        }

        state.local_transform =
            self.wheel_local_transform(i, state.suspension_length, steer, state.rotation_angle);
        state
    }

    /// Removes angular velocity that would carry the roll further outside
    /// `tilt_angle ± max_roll_angle`, plus a fraction of the existing violation.
    fn limit_roll(&self, body: &mut RigidBody, principal_inertia: &Vector3<f64>, dt: f64) {
        let rotation = body.position().rotation;
        let forward = rotation * self.settings.forward;
        let up = rotation * self.settings.up;
        let world_up = self.settings.world_up;

        let Some(no_roll_right) = forward.cross(&world_up).try_normalize(1.0e-6) else {
            return;
        };
        let no_roll_up = no_roll_right.cross(&forward);
        let roll = up.dot(&no_roll_right).atan2(up.dot(&no_roll_up));

        let error = roll - self.tilt_angle;
        let excess = if error > self.max_roll_angle {
            error - self.max_roll_angle
        } else if error < -self.max_roll_angle {
            error + self.max_roll_angle
        } else {
            return;
        };

        let Some(axis) = forward.try_normalize(1.0e-9) else {
            return;
        };
        let roll_rate = body.angvel().dot(&axis);
        let desired_rate = -excess * ROLL_LIMIT_BAUMGARTE / dt;
        let moving_away = if excess > 0.0 {
            roll_rate > desired_rate
        } else {
            roll_rate < desired_rate
        };
        if moving_away {
            let local_axis = rotation.inverse_transform_vector(&axis);
            let inertia = local_axis.component_mul(&local_axis).dot(principal_inertia);
            body.apply_torque_impulse(axis * (desired_rate - roll_rate) * inertia, true);
        }
    }
}
