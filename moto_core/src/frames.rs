// moto_core/src/frames.rs

//! Coordinate-frame conversion between the authored model space of a vehicle and
//! the canonical simulation space.
//!
//! Simulation space is "y-forward, z-up": +X is the vehicle's right, +Y its
//! forward direction and +Z is up. Artists are free to author the model in any
//! orientation; the vehicle settings carry the rotation `R` that takes model space
//! into simulation space, expressed as two composed quaternions (`R = rot_2 * rot_1`).
//!
//! - model space -> y-forward space = `R`
//! - y-forward space -> model space = `R^-1`

use nalgebra::{Isometry3, Matrix4, UnitQuaternion, Vector3};

/// World up direction of the physics world.
pub fn world_up() -> Vector3<f64> {
    Vector3::z()
}

/// Vehicle forward direction in y-forward space.
pub fn forward_y_for() -> Vector3<f64> {
    Vector3::y()
}

/// Vehicle right direction in y-forward space.
pub fn right_y_for() -> Vector3<f64> {
    Vector3::x()
}

/// Vehicle up direction in y-forward space.
pub fn up_y_for() -> Vector3<f64> {
    Vector3::z()
}

/// The one-time computed rotation between model space and y-forward simulation
/// space, together with its inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelFrame {
    model_to_sim: UnitQuaternion<f64>,
    sim_to_model: UnitQuaternion<f64>,
}

impl ModelFrame {
    /// Composes `rot_2 * rot_1` into the model-to-simulation rotation.
    pub fn new(rot_1: &UnitQuaternion<f64>, rot_2: &UnitQuaternion<f64>) -> Self {
        let model_to_sim = rot_2 * rot_1;
        Self {
            model_to_sim,
            sim_to_model: model_to_sim.inverse(),
        }
    }

    pub fn identity() -> Self {
        Self::new(&UnitQuaternion::identity(), &UnitQuaternion::identity())
    }

    /// `R`: model space to y-forward space.
    pub fn model_to_sim(&self) -> &UnitQuaternion<f64> {
        &self.model_to_sim
    }

    /// `R^-1`: y-forward space to model space.
    pub fn sim_to_model(&self) -> &UnitQuaternion<f64> {
        &self.sim_to_model
    }

    /// `R^-1` as a homogeneous matrix, for composing joint and debug transforms.
    pub fn sim_to_model_matrix(&self) -> Matrix4<f64> {
        self.sim_to_model.to_homogeneous()
    }

    /// Expresses a y-forward space direction or offset in model space.
    pub fn to_model(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.sim_to_model * v
    }

    /// Expresses a model space direction or offset in y-forward space.
    pub fn to_sim(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.model_to_sim * v
    }

    pub fn forward_model(&self) -> Vector3<f64> {
        self.to_model(&forward_y_for())
    }

    pub fn right_model(&self) -> Vector3<f64> {
        self.to_model(&right_y_for())
    }

    /// Up in model space, derived from right and forward so the basis stays right-handed.
    pub fn up_model(&self) -> Vector3<f64> {
        self.right_model().cross(&self.forward_model())
    }

    /// True when `R` maps every model axis onto a simulation axis, i.e. it is a
    /// composition of quarter turns.
    pub fn is_axis_aligned(&self) -> bool {
        const TOLERANCE: f64 = 1.0e-6;
        self.model_to_sim
            .to_rotation_matrix()
            .matrix()
            .iter()
            .all(|e| e.abs() < TOLERANCE || (e.abs() - 1.0).abs() < TOLERANCE)
    }

    /// Half-extents of the smallest model space box that holds a y-forward space box.
    /// For quarter-turn frames this is the same box with its axes permuted.
    pub fn model_half_extents(&self, canonical: &Vector3<f64>) -> Vector3<f64> {
        self.sim_to_model.to_rotation_matrix().matrix().abs() * canonical
    }
}

impl Default for ModelFrame {
    fn default() -> Self {
        Self::identity()
    }
}

/// The vehicle's world-space basis for a single step, plus the "no-roll" basis
/// recomputed from the forward vector and world up.
///
/// The no-roll vectors are independent of the vehicle's current roll and give a
/// stable reference frame for the roll and righting controllers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleBasis {
    pub forward: Vector3<f64>,
    pub right: Vector3<f64>,
    pub up: Vector3<f64>,
    pub no_roll_right: Vector3<f64>,
    pub no_roll_up: Vector3<f64>,
}

impl VehicleBasis {
    const NORMALIZE_EPSILON: f64 = 1.0e-6;

    pub fn from_pose(pose: &Isometry3<f64>, frame: &ModelFrame) -> Self {
        let forward = pose.rotation * frame.forward_model();
        let right = pose.rotation * frame.right_model();
        let up = pose.rotation * frame.up_model();

        // Pointing straight up or down leaves forward x up degenerate; fall back to
        // the body's own right vector in that case.
        let no_roll_right = forward
            .cross(&world_up())
            .try_normalize(Self::NORMALIZE_EPSILON)
            .unwrap_or(right);
        let mut no_roll_up = no_roll_right
            .cross(&forward)
            .try_normalize(Self::NORMALIZE_EPSILON)
            .unwrap_or_else(world_up);
        if no_roll_right.dot(&right) < 0.0 {
            no_roll_up = -no_roll_up;
        }

        Self {
            forward,
            right,
            up,
            no_roll_right,
            no_roll_up,
        }
    }

    /// Heading of the vehicle: rotation of the no-roll right vector about world up.
    pub fn yaw(&self) -> f64 {
        self.no_roll_right.y.atan2(self.no_roll_right.x)
    }

    /// Signed roll of the body relative to the no-roll frame. Positive leans right.
    pub fn roll(&self) -> f64 {
        self.up
            .dot(&self.no_roll_right)
            .atan2(self.up.dot(&self.no_roll_up))
    }
}
