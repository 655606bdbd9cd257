// moto_core/src/pose.rs

//! Procedural animation of the bike's visual model.
//!
//! The physics state (steering angle, suspension lengths and wheel spin) is mapped
//! onto local transform overrides of named skeleton joints. The mapping is a pure
//! function of its inputs: calling it twice with the same state writes the same
//! transforms. Joints missing from the model are skipped.

use nalgebra::{Matrix4, Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::abstractions::SkeletonPose;
use crate::serde_helpers::vec3_f64_from_array;
use crate::settings::JointNames;
use crate::types::{FRONT_WHEEL, REAR_WHEEL, WHEEL_COUNT};

// =========================================================================
// == Joints ==
// =========================================================================

/// The skeleton joints the controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BikeJoint {
    Steering,
    SwingArm,
    FrontWheel,
    RearWheel,
    UpperPistonLeft,
    UpperPistonRight,
    LowerPistonLeft,
    LowerPistonRight,
}

impl BikeJoint {
    pub const ALL: [BikeJoint; 8] = [
        BikeJoint::Steering,
        BikeJoint::SwingArm,
        BikeJoint::FrontWheel,
        BikeJoint::RearWheel,
        BikeJoint::UpperPistonLeft,
        BikeJoint::UpperPistonRight,
        BikeJoint::LowerPistonLeft,
        BikeJoint::LowerPistonRight,
    ];

    fn slot(self) -> usize {
        self as usize
    }

    /// The joint's name in the model, as configured.
    pub fn name(self, names: &JointNames) -> &str {
        match self {
            BikeJoint::Steering => &names.steering,
            BikeJoint::SwingArm => &names.swing_arm,
            BikeJoint::FrontWheel => &names.front_wheel,
            BikeJoint::RearWheel => &names.rear_wheel,
            BikeJoint::UpperPistonLeft => &names.upper_piston_left,
            BikeJoint::UpperPistonRight => &names.upper_piston_right,
            BikeJoint::LowerPistonLeft => &names.lower_piston_left,
            BikeJoint::LowerPistonRight => &names.lower_piston_right,
        }
    }
}

/// Skeleton indices of the driven joints, resolved once when the vehicle is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JointIndexTable {
    indices: [Option<usize>; 8],
}

impl JointIndexTable {
    /// Looks every joint up by name. Without a skeleton nothing resolves.
    pub fn resolve(skeleton: Option<&dyn SkeletonPose>, names: &JointNames) -> Self {
        let mut table = Self::default();
        let Some(skeleton) = skeleton else {
            debug!("No skeleton available, procedural pose disabled");
            return table;
        };

        for joint in BikeJoint::ALL {
            let name = joint.name(names);
            table.indices[joint.slot()] = skeleton.joint_index(name);
            if table.indices[joint.slot()].is_none() {
                debug!("Joint '{}' not found in model, {:?} will not be posed", name, joint);
            }
        }
        table
    }

    pub fn get(&self, joint: BikeJoint) -> Option<usize> {
        self.indices[joint.slot()]
    }

    pub fn set(&mut self, joint: BikeJoint, index: Option<usize>) {
        self.indices[joint.slot()] = index;
    }

    pub fn resolved_count(&self) -> usize {
        self.indices.iter().filter(|i| i.is_some()).count()
    }

    /// The joint's index if it resolved and lies inside the current skeleton.
    fn usable(&self, joint: BikeJoint, joint_count: usize) -> Option<usize> {
        self.get(joint).filter(|&i| i < joint_count)
    }
}

// =========================================================================
// == Configuration ==
// =========================================================================

/// Constants of the procedural pose. The defaults fit the stock bike model; the
/// piston mappings are affine approximations tuned by eye.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PoseConfig {
    /// Steering joint rotation axis, in joint space.
    #[serde(with = "vec3_f64_from_array")]
    pub steering_axis: Vector3<f64>,
    /// Flips the steering joint rotation for models rigged the other way round.
    pub steering_sign: f64,
    /// Rear suspension length at which the swing arm is at rest.
    pub swing_arm_neutral_length: f64,
    /// Swing arm rotation per metre of rear suspension travel.
    pub swing_arm_gain: f64,
    /// Applied to the wheel spin angle; the stock model spins opposite to the constraint.
    pub wheel_spin_sign: f64,
    /// Direction the front wheel joint slides along as the fork compresses.
    #[serde(with = "vec3_f64_from_array")]
    pub front_wheel_travel_axis: Vector3<f64>,
    /// Front suspension length at which the wheel joint sits at its rest position.
    pub front_wheel_neutral_length: f64,
    /// Metres per model unit.
    pub model_scale: f64,
    pub upper_piston_neutral_length: f64,
    pub upper_piston_gain: f64,
    /// Upper bound of the upper piston rotation, in radians.
    pub upper_piston_max_angle: f64,
    pub lower_piston_neutral_length: f64,
    pub lower_piston_gain: f64,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            steering_axis: Vector3::y(),
            steering_sign: 1.0,
            swing_arm_neutral_length: 0.20,
            swing_arm_gain: 3.0,
            wheel_spin_sign: -1.0,
            front_wheel_travel_axis: Vector3::y(),
            front_wheel_neutral_length: 0.222,
            model_scale: 0.18,
            upper_piston_neutral_length: 0.26,
            upper_piston_gain: 0.7,
            upper_piston_max_angle: 0.02,
            lower_piston_neutral_length: 0.23,
            lower_piston_gain: 0.7,
        }
    }
}

// =========================================================================
// == Pose Mapping ==
// =========================================================================

/// Physics state consumed by the pose mapping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseInputs {
    pub steering_angle: f64,
    pub suspension_lengths: [f64; WHEEL_COUNT],
    pub wheel_angles: [f64; WHEEL_COUNT],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointOverride {
    pub joint: BikeJoint,
    pub index: usize,
    pub transform: Matrix4<f64>,
}

fn rotation_about(axis: &Vector3<f64>, angle: f64) -> Matrix4<f64> {
    let axis = Unit::try_new(*axis, 1.0e-9).unwrap_or_else(Vector3::x_axis);
    Rotation3::from_axis_angle(&axis, angle).to_homogeneous()
}

fn rotation_x(angle: f64) -> Matrix4<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), angle).to_homogeneous()
}

/// Computes the override of every usable joint.
///
/// A joint is usable when it resolved and its index is below `joint_count`. The
/// pistons move in pairs: a pair is only posed when both sides are usable.
pub fn compute_joint_overrides(
    inputs: &PoseInputs,
    table: &JointIndexTable,
    config: &PoseConfig,
    joint_count: usize,
) -> Vec<JointOverride> {
    let mut overrides = Vec::with_capacity(BikeJoint::ALL.len());
    let mut push = |joint: BikeJoint, index: usize, transform: Matrix4<f64>| {
        overrides.push(JointOverride {
            joint,
            index,
            transform,
        })
    };

    let front_sus = inputs.suspension_lengths[FRONT_WHEEL];
    let rear_sus = inputs.suspension_lengths[REAR_WHEEL];

    if let Some(i) = table.usable(BikeJoint::Steering, joint_count) {
        let angle = config.steering_sign * inputs.steering_angle;
        push(BikeJoint::Steering, i, rotation_about(&config.steering_axis, angle));
    }

    if let Some(i) = table.usable(BikeJoint::SwingArm, joint_count) {
        let angle = (rear_sus - config.swing_arm_neutral_length) * config.swing_arm_gain;
        push(BikeJoint::SwingArm, i, rotation_x(angle));
    }

    if let Some(i) = table.usable(BikeJoint::FrontWheel, joint_count) {
        // Suspension lengths are in metres, the joint lives in model units.
        let travel = -(front_sus - config.front_wheel_neutral_length) / config.model_scale;
        let translation = Matrix4::new_translation(&(config.front_wheel_travel_axis * travel));
        let spin = rotation_x(config.wheel_spin_sign * inputs.wheel_angles[FRONT_WHEEL]);
        push(BikeJoint::FrontWheel, i, translation * spin);
    }

    if let Some(i) = table.usable(BikeJoint::RearWheel, joint_count) {
        let spin = rotation_x(config.wheel_spin_sign * inputs.wheel_angles[REAR_WHEEL]);
        push(BikeJoint::RearWheel, i, spin);
    }

    if let (Some(left), Some(right)) = (
        table.usable(BikeJoint::UpperPistonLeft, joint_count),
        table.usable(BikeJoint::UpperPistonRight, joint_count),
    ) {
        let angle = ((rear_sus - config.upper_piston_neutral_length) * config.upper_piston_gain)
            .min(config.upper_piston_max_angle);
        let transform = rotation_x(angle);
        push(BikeJoint::UpperPistonLeft, left, transform);
        push(BikeJoint::UpperPistonRight, right, transform);
    }

    if let (Some(left), Some(right)) = (
        table.usable(BikeJoint::LowerPistonLeft, joint_count),
        table.usable(BikeJoint::LowerPistonRight, joint_count),
    ) {
        let stretch = (rear_sus - config.lower_piston_neutral_length) * config.lower_piston_gain;
        // Scaling keeps the bottom of the spring fixed; shift it so the top stays put.
        let transform = Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 1.0 + stretch, 1.0))
            * Matrix4::new_translation(&Vector3::new(0.0, -stretch, 0.0));
        push(BikeJoint::LowerPistonLeft, left, transform);
        push(BikeJoint::LowerPistonRight, right, transform);
    }

    overrides
}

/// Writes computed overrides to the skeleton.
pub fn apply_joint_overrides(overrides: &[JointOverride], skeleton: &mut dyn SkeletonPose) {
    for o in overrides {
        skeleton.set_procedural_transform(o.index, &o.transform);
    }
}
