// moto_core/src/settings.rs

//! Declarative vehicle settings and the named tuning configuration.
//!
//! Everything here is immutable once a controller has been built. Geometry is
//! given in y-forward / z-up space (see [`crate::frames`]); the builder converts
//! it into model space using the settings' own model rotation.
//!
//! The `Default` implementations describe the stock motorbike.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::VehicleBuildError;
use crate::frames::ModelFrame;
use crate::pose::PoseConfig;
use crate::serde_helpers::{quat_f64_from_euler_deg, radians_from_degrees, vec3_f64_from_array};
use crate::vehicle::VehicleKind;

/// Scale of the stock bike model: one model unit is this many metres.
const STOCK_MODEL_SCALE: f64 = 0.18;

// =========================================================================
// == Vehicle Settings ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleSettings {
    #[serde(default)]
    pub kind: VehicleKind,
    /// Body mass in kg.
    pub mass: f64,
    /// Collision box half-extents (half width, half length, half height).
    #[serde(with = "vec3_f64_from_array")]
    pub half_extents: Vector3<f64>,
    /// Offset of the centre of mass from the box centre.
    #[serde(with = "vec3_f64_from_array")]
    pub center_of_mass_offset: Vector3<f64>,
    /// First rotation applied to take model space into y-forward space.
    #[serde(with = "quat_f64_from_euler_deg")]
    pub model_to_y_forwards_rot_1: UnitQuaternion<f64>,
    /// Second rotation, applied after `model_to_y_forwards_rot_1`.
    #[serde(with = "quat_f64_from_euler_deg")]
    pub model_to_y_forwards_rot_2: UnitQuaternion<f64>,
    pub front_wheel: WheelSettings,
    pub rear_wheel: WheelSettings,
    #[serde(default)]
    pub differential: DifferentialSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub transmission: TransmissionSettings,
    pub seats: Vec<SeatSettings>,
    #[serde(default)]
    pub joint_names: JointNames,
}

impl VehicleSettings {
    /// Both wheels in constraint order: front first, then rear.
    pub fn wheels(&self) -> [&WheelSettings; 2] {
        [&self.front_wheel, &self.rear_wheel]
    }

    /// Largest steering lock over both wheels; the steering filter clamps to this.
    pub fn max_steering_angle(&self) -> f64 {
        self.front_wheel
            .max_steer_angle
            .max(self.rear_wheel.max_steer_angle)
    }

    /// Rejects settings the physics engine cannot build a stable vehicle from.
    pub fn validate(&self) -> Result<(), VehicleBuildError> {
        let invalid = |msg: String| Err(VehicleBuildError::InvalidSettings(msg));

        if !(self.mass > 0.0) {
            return invalid(format!("mass must be positive, got {}", self.mass));
        }
        if self.half_extents.iter().any(|e| !(*e > 0.0)) {
            return invalid(format!(
                "half extents must be positive, got {:?}",
                self.half_extents
            ));
        }
        for (name, wheel) in [("front", &self.front_wheel), ("rear", &self.rear_wheel)] {
            if !(wheel.radius > 0.0) || !(wheel.width > 0.0) {
                return invalid(format!("{} wheel radius and width must be positive", name));
            }
            if wheel.suspension_min_length > wheel.suspension_max_length {
                return invalid(format!(
                    "{} wheel suspension min length {} exceeds max length {}",
                    name, wheel.suspension_min_length, wheel.suspension_max_length
                ));
            }
            if wheel.max_steer_angle < 0.0 {
                return invalid(format!("{} wheel steering limit must not be negative", name));
            }
        }
        // The collision box is built along model axes.
        if !ModelFrame::new(&self.model_to_y_forwards_rot_1, &self.model_to_y_forwards_rot_2)
            .is_axis_aligned()
        {
            return invalid(
                "model to y-forwards rotation must be a multiple of 90 degrees about each axis"
                    .to_string(),
            );
        }
        if self.transmission.gear_ratios.is_empty() {
            return invalid("transmission needs at least one forward gear".to_string());
        }
        if self.seats.is_empty() {
            return invalid("vehicle needs at least one seat".to_string());
        }
        Ok(())
    }
}

impl Default for VehicleSettings {
    fn default() -> Self {
        let s = STOCK_MODEL_SCALE;
        Self {
            kind: VehicleKind::default(),
            mass: 200.0,
            half_extents: Vector3::new(1.7 / 2.0 * s, 10.0 / 2.0 * s, 3.5 / 2.0 * s),
            center_of_mass_offset: Vector3::new(0.0, 0.0, -0.15),
            model_to_y_forwards_rot_1: UnitQuaternion::identity(),
            model_to_y_forwards_rot_2: UnitQuaternion::identity(),
            front_wheel: WheelSettings {
                position: Vector3::new(0.0, 0.85, 0.0),
                max_steer_angle: 30.0_f64.to_radians(),
                hand_brake_fraction: 0.02,
                ..WheelSettings::default()
            },
            rear_wheel: WheelSettings {
                position: Vector3::new(0.0, -0.85, 0.0),
                max_steer_angle: 0.0,
                hand_brake_fraction: 1.0,
                ..WheelSettings::default()
            },
            differential: DifferentialSettings::default(),
            engine: EngineSettings::default(),
            transmission: TransmissionSettings::default(),
            seats: vec![SeatSettings::default()],
            joint_names: JointNames::default(),
        }
    }
}

/// Geometry and braking for a single wheel, in y-forward space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WheelSettings {
    /// Suspension attachment point relative to the body.
    #[serde(with = "vec3_f64_from_array")]
    pub position: Vector3<f64>,
    /// Direction the suspension extends in.
    #[serde(with = "vec3_f64_from_array", default = "default_suspension_direction")]
    pub suspension_direction: Vector3<f64>,
    pub radius: f64,
    pub width: f64,
    pub suspension_min_length: f64,
    pub suspension_max_length: f64,
    #[serde(with = "radians_from_degrees")]
    pub max_steer_angle: f64,
    /// Foot brake torque in Nm.
    pub max_brake_torque: f64,
    /// Share of [`TuningConfig::hand_brake_torque`] this wheel receives.
    pub hand_brake_fraction: f64,
}

fn default_suspension_direction() -> Vector3<f64> {
    -Vector3::z()
}

impl Default for WheelSettings {
    fn default() -> Self {
        let s = STOCK_MODEL_SCALE;
        Self {
            position: Vector3::zeros(),
            suspension_direction: default_suspension_direction(),
            radius: 3.856 / 2.0 * s,
            width: 0.94 * s,
            suspension_min_length: 0.2,
            suspension_max_length: 0.4,
            max_steer_angle: 0.0,
            max_brake_torque: 1500.0,
            hand_brake_fraction: 1.0,
        }
    }
}

/// How engine torque is split between wheels.
///
/// The indices follow the vehicle constraint's own convention, where `-1` means
/// "no wheel". The stock bike sends all torque to its "left" wheel, which is
/// wheel index 1: the rear wheel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DifferentialSettings {
    pub left_wheel: i32,
    pub right_wheel: i32,
    /// 0 sends all torque to the left wheel, 1 all to the right.
    pub left_right_split: f64,
}

impl Default for DifferentialSettings {
    fn default() -> Self {
        Self {
            left_wheel: 1,
            right_wheel: -1,
            left_right_split: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSettings {
    /// Nm
    pub max_torque: f64,
    pub max_rpm: f64,
    /// kg m^2
    pub inertia: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        // With a single gear the engine is allowed to spin much higher than usual.
        Self {
            max_torque: 200.0,
            max_rpm: 30000.0,
            inertia: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransmissionSettings {
    pub gear_ratios: Vec<f64>,
}

impl Default for TransmissionSettings {
    fn default() -> Self {
        Self {
            gear_ratios: vec![2.66],
        }
    }
}

/// A named seat. Sitting position is the origin of seat space, forwards is +Y and
/// right is +X.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeatSettings {
    pub name: String,
    /// Seat origin in model space.
    #[serde(with = "vec3_f64_from_array")]
    pub seat_position: Vector3<f64>,
}

impl Default for SeatSettings {
    fn default() -> Self {
        Self {
            name: "rider".to_string(),
            seat_position: Vector3::new(0.0, -0.1, 0.35),
        }
    }
}

/// Skeleton node names for the procedurally posed joints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JointNames {
    pub steering: String,
    pub swing_arm: String,
    pub front_wheel: String,
    pub rear_wheel: String,
    pub upper_piston_left: String,
    pub upper_piston_right: String,
    pub lower_piston_left: String,
    pub lower_piston_right: String,
}

impl Default for JointNames {
    fn default() -> Self {
        Self {
            steering: "Steering bone".to_string(),
            swing_arm: "back arm bone".to_string(),
            front_wheel: "Wheel-Front".to_string(),
            rear_wheel: "Wheel-back".to_string(),
            upper_piston_left: "piston upper left".to_string(),
            upper_piston_right: "piston upper right".to_string(),
            lower_piston_left: "piston lower left".to_string(),
            lower_piston_right: "piston lower right".to_string(),
        }
    }
}

// =========================================================================
// == Tuning ==
// =========================================================================

/// Hand-tuned constants of the controller. None of these are physical derivations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TuningConfig {
    /// Multiplier applied to the default lateral and longitudinal tire friction curves.
    pub friction_multiplier: f64,
    /// Hand brake torque in Nm before each wheel's `hand_brake_fraction`.
    pub hand_brake_torque: f64,
    /// Steering slew rate in rad/s, used both when steering and when re-centering.
    pub steering_rate: f64,
    /// Gravity magnitude used to turn lateral force into a lean angle.
    pub gravity: f64,
    /// Rate of the roll-angle low-pass filters, in 1/s.
    pub roll_smoothing_rate: f64,
    /// Upper bound of the per-step blend factor of the roll filters.
    pub roll_max_blend: f64,
    /// Roll limiter bound while a rider is in the controlling seat.
    #[serde(with = "radians_from_degrees")]
    pub occupied_max_roll_angle: f64,
    /// Roll limiter bound with nobody riding, effectively unconstrained.
    #[serde(with = "radians_from_degrees")]
    pub unoccupied_max_roll_angle: f64,
    /// Seat whose occupant drives the roll and pitch controllers.
    pub controlling_seat: usize,
    /// Pitch torque per kg applied while both wheels are airborne.
    pub air_pitch_torque_gain: f64,
    /// How long a righting request keeps applying torque, in seconds.
    pub righting_duration: f64,
    /// Desired angular velocity per radian of remaining righting rotation.
    pub righting_angular_gain: f64,
    /// Corrective torque per kg per rad/s of angular velocity error.
    pub righting_torque_gain: f64,
    /// Height of the rider's eyes above the seat origin.
    pub camera_head_height: f64,
    pub pose: PoseConfig,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            friction_multiplier: 5.0,
            hand_brake_torque: 10000.0,
            steering_rate: 2.0,
            gravity: 9.81,
            roll_smoothing_rate: 4.0,
            roll_max_blend: 0.1,
            occupied_max_roll_angle: 1.0_f64.to_radians(),
            unoccupied_max_roll_angle: PI,
            controlling_seat: 0,
            air_pitch_torque_gain: 2.0,
            righting_duration: 2.0,
            righting_angular_gain: 3.0,
            righting_torque_gain: 3.5,
            camera_head_height: 0.6,
            pose: PoseConfig::default(),
        }
    }
}

impl TuningConfig {
    pub fn validate(&self) -> Result<(), VehicleBuildError> {
        if !(self.friction_multiplier > 0.0) {
            return Err(VehicleBuildError::InvalidSettings(format!(
                "friction multiplier must be positive, got {}",
                self.friction_multiplier
            )));
        }
        if !(self.steering_rate >= 0.0) || !(self.gravity > 0.0) {
            return Err(VehicleBuildError::InvalidSettings(
                "steering rate must be non-negative and gravity positive".to_string(),
            ));
        }
        Ok(())
    }
}
