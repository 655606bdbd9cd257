// moto_core/src/abstractions.rs

//! The contracts of the external collaborators.
//!
//! The controller never talks to a concrete physics or rendering engine. The
//! application (or the `moto_sim` harness, or a mock for testing) implements
//! these traits and passes them in on every call.

use nalgebra::{Isometry3, Matrix4, Point3, Vector3};

use crate::error::PhysicsError;
use crate::types::{BodyHandle, ConstraintHandle, ObjectId, PrimitiveHandle, Rgba, WHEEL_COUNT};

// =========================================================================
// == Physics Collaborator ==
// =========================================================================

/// A box collision shape whose centre of mass is shifted from its geometric centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetBoxShape {
    pub half_extents: Vector3<f64>,
    pub center_of_mass_offset: Vector3<f64>,
}

/// Everything the physics world needs to create a dynamic rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub shape: OffsetBoxShape,
    /// Mass override; inertia is computed from the shape.
    pub mass: f64,
    pub pose: Isometry3<f64>,
    /// Back-reference to the owning world object.
    pub owner: ObjectId,
}

/// Piecewise-linear tire friction curve: `(slip, friction coefficient)` points.
#[derive(Debug, Clone, PartialEq)]
pub struct FrictionCurve {
    pub points: Vec<(f64, f64)>,
}

impl FrictionCurve {
    /// Default longitudinal preset, slip ratio on the x axis.
    pub fn default_longitudinal() -> Self {
        Self {
            points: vec![(0.0, 0.0), (0.06, 1.2), (0.2, 1.0)],
        }
    }

    /// Default lateral preset, slip angle in degrees on the x axis.
    pub fn default_lateral() -> Self {
        Self {
            points: vec![(0.0, 0.0), (3.0, 1.2), (20.0, 1.0)],
        }
    }

    /// Multiplies every friction coefficient by `factor`.
    pub fn scaled(mut self, factor: f64) -> Self {
        for (_, mu) in &mut self.points {
            *mu *= factor;
        }
        self
    }

    /// Linear interpolation, clamped to the first and last points.
    pub fn sample(&self, x: f64) -> f64 {
        let Some(&(first_x, first_y)) = self.points.first() else {
            return 0.0;
        };
        if x <= first_x {
            return first_y;
        }
        for pair in self.points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if x <= x1 {
                let t = if x1 > x0 { (x - x0) / (x1 - x0) } else { 1.0 };
                return y0 + (y1 - y0) * t;
            }
        }
        self.points.last().map_or(0.0, |p| p.1)
    }

    /// Highest friction coefficient on the curve.
    pub fn peak(&self) -> f64 {
        self.points.iter().map(|p| p.1).fold(0.0, f64::max)
    }
}

/// Per-wheel settings handed to the vehicle constraint, already in model space.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintWheelSettings {
    /// Suspension attachment point in body space.
    pub position: Vector3<f64>,
    /// Direction of suspension travel in body space.
    pub suspension_direction: Vector3<f64>,
    pub radius: f64,
    pub width: f64,
    pub suspension_min_length: f64,
    pub suspension_max_length: f64,
    pub max_steer_angle: f64,
    pub max_brake_torque: f64,
    pub max_hand_brake_torque: f64,
    pub longitudinal_friction: FrictionCurve,
    pub lateral_friction: FrictionCurve,
}

/// Torque routing, in the constraint's own wheel index convention (`-1` = none).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintDifferential {
    pub left_wheel: i32,
    pub right_wheel: i32,
    pub left_right_split: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintEngine {
    pub max_torque: f64,
    pub max_rpm: f64,
    pub inertia: f64,
}

/// How the constraint probes the ground under each wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionTester {
    Ray,
    Sphere { radius: f64 },
    /// Sweeps the wheel cylinder; `convex_radius_fraction` rounds its edges.
    Cylinder { convex_radius_fraction: f64 },
}

/// The full description of a wheeled vehicle constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleConstraintSettings {
    /// Vehicle up in body space.
    pub up: Vector3<f64>,
    /// Vehicle forward in body space.
    pub forward: Vector3<f64>,
    pub world_up: Vector3<f64>,
    /// Initial roll limiter bound in radians.
    pub max_roll_angle: f64,
    /// Front wheel first, rear wheel second.
    pub wheels: [ConstraintWheelSettings; WHEEL_COUNT],
    pub differentials: Vec<ConstraintDifferential>,
    pub engine: ConstraintEngine,
    pub gear_ratios: Vec<f64>,
    pub collision_tester: CollisionTester,
}

/// Read-back of one wheel after a physics step. Stale until the first step ran.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelState {
    pub has_contact: bool,
    pub contact_position: Point3<f64>,
    pub contact_normal: Vector3<f64>,
    /// Contact-plane direction along the wheel's rolling direction.
    pub contact_longitudinal: Vector3<f64>,
    /// Contact-plane direction pointing to the wheel's right.
    pub contact_lateral: Vector3<f64>,
    /// Impulse of the longitudinal friction constraint over the last step.
    pub longitudinal_impulse: f64,
    /// Impulse of the lateral friction constraint over the last step.
    pub lateral_impulse: f64,
    pub suspension_length: f64,
    /// Accumulated spin angle about the axle, in radians.
    pub rotation_angle: f64,
    pub steer_angle: f64,
    /// Wheel-to-body transform. The axle runs along the local Z axis.
    pub local_transform: Isometry3<f64>,
}

impl Default for WheelState {
    fn default() -> Self {
        Self {
            has_contact: false,
            contact_position: Point3::origin(),
            contact_normal: Vector3::z(),
            contact_longitudinal: Vector3::y(),
            contact_lateral: Vector3::x(),
            longitudinal_impulse: 0.0,
            lateral_impulse: 0.0,
            suspension_length: 0.0,
            rotation_angle: 0.0,
            steer_angle: 0.0,
            local_transform: Isometry3::identity(),
        }
    }
}

/// Driver controls forwarded to the constraint's wheeled-vehicle controller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriverInput {
    /// -1 (full reverse) to 1 (full forward).
    pub forward: f64,
    /// Fraction of each wheel's steering lock, -1 (full left) to 1 (full right).
    pub right: f64,
    /// 0 to 1.
    pub brake: f64,
    /// 0 to 1.
    pub hand_brake: f64,
}

/// The physics engine as seen by the vehicle controller.
///
/// Handles passed in are expected to be live; implementations should treat a stale
/// handle as a no-op (and return neutral values from queries) rather than panic.
pub trait PhysicsWorld {
    // --- World object bookkeeping ---

    /// The body currently registered for a world object, if any.
    fn object_body(&self, object: ObjectId) -> Option<BodyHandle>;
    /// Registers `body` as the physics representation of `object`.
    fn add_object(&mut self, object: ObjectId, body: BodyHandle);
    /// Unregisters `object` and removes and destroys its body.
    fn remove_object(&mut self, object: ObjectId);

    // --- Bodies ---

    fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, PhysicsError>;
    fn add_body(&mut self, body: BodyHandle, activate: bool);
    /// Removes the body from the simulation and destroys it.
    fn remove_body(&mut self, body: BodyHandle);
    /// Wakes a sleeping body so applied input takes effect.
    fn activate_body(&mut self, body: BodyHandle);

    fn body_pose(&self, body: BodyHandle) -> Isometry3<f64>;
    fn linear_velocity(&self, body: BodyHandle) -> Vector3<f64>;
    fn angular_velocity(&self, body: BodyHandle) -> Vector3<f64>;

    /// Accumulates a world-space torque for the next integration step.
    fn add_torque(&mut self, body: BodyHandle, torque: &Vector3<f64>);
    /// Accumulates a world-space force at a world-space point for the next step.
    fn add_force_at_point(&mut self, body: BodyHandle, force: &Vector3<f64>, point: &Point3<f64>);

    // --- Vehicle constraint ---

    /// Creates the constraint for `body` and adds it to the world.
    fn create_vehicle_constraint(
        &mut self,
        body: BodyHandle,
        settings: &VehicleConstraintSettings,
    ) -> Result<ConstraintHandle, PhysicsError>;
    fn remove_constraint(&mut self, constraint: ConstraintHandle);
    /// Advances the constraint in lock-step with body integration.
    fn add_step_listener(&mut self, constraint: ConstraintHandle) -> Result<(), PhysicsError>;
    fn remove_step_listener(&mut self, constraint: ConstraintHandle);

    fn wheel_state(&self, constraint: ConstraintHandle, wheel: usize) -> WheelState;
    fn set_driver_input(&mut self, constraint: ConstraintHandle, input: &DriverInput);
    /// Maximum roll, in radians, the limiter allows around the tilt target.
    fn set_max_roll_angle(&mut self, constraint: ConstraintHandle, angle: f64);
    /// Roll angle the limiter is centred on, in radians. Positive leans right.
    fn set_tilt_angle(&mut self, constraint: ConstraintHandle, angle: f64);
}

// =========================================================================
// == Rendering Collaborator ==
// =========================================================================

/// Unit debug shapes. The transform given to the renderer places and sizes them:
/// - `Box`: the unit cube spanning `[0, 1]^3`.
/// - `Sphere`: radius 1 around the origin.
/// - `Cylinder`: radius 1, from `(0, 0, 0)` to `(0, 0, 1)`.
/// - `Arrow`: from `(0, 0, 0)` to `(1, 0, 0)`, unit shaft radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveShape {
    Box,
    Sphere,
    Cylinder,
    Arrow,
}

/// Debug drawing. The renderer owns the drawable; the caller owns the handle and
/// must hand it back through `remove_primitive`.
pub trait DebugRenderer {
    fn create_primitive(
        &mut self,
        shape: PrimitiveShape,
        transform: &Matrix4<f64>,
        color: Rgba,
    ) -> PrimitiveHandle;
    fn set_primitive_transform(&mut self, primitive: PrimitiveHandle, transform: &Matrix4<f64>);
    fn remove_primitive(&mut self, primitive: PrimitiveHandle);
}

/// The animated skeleton of the vehicle's visual model.
pub trait SkeletonPose {
    /// Index of a named joint, or `None` if the model does not have it.
    fn joint_index(&self, name: &str) -> Option<usize>;
    fn joint_count(&self) -> usize;
    /// Overrides the joint's local transform for the next rendered frame.
    fn set_procedural_transform(&mut self, joint: usize, transform: &Matrix4<f64>);
}
