// moto_core/src/types.rs

use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};

// --- Core Identifiers ---
// Every handle is an opaque integer minted by the collaborator that owns the
// underlying resource. The controller never dereferences them.

/// A rigid body living inside the physics collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BodyHandle(pub u64);

/// A vehicle constraint living inside the physics collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConstraintHandle(pub u64);

/// A debug primitive owned by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PrimitiveHandle(pub u64);

/// The application-level world object a vehicle controller is attached to.
/// Bodies created for the vehicle carry this as their back-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

/// The world object handed to the builder: its identity and its pose at the
/// moment the controller is attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldObject {
    pub id: ObjectId,
    pub pose: Isometry3<f64>,
}

// --- Wheel Indexing ---

/// Number of wheels on every two-wheeled vehicle built by this crate.
pub const WHEEL_COUNT: usize = 2;
/// Index of the steerable front wheel inside the vehicle constraint.
pub const FRONT_WHEEL: usize = 0;
/// Index of the driven rear wheel inside the vehicle constraint.
pub const REAR_WHEEL: usize = 1;

/// A translucent colour for debug primitives, linear RGBA in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}
