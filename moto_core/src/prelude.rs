// moto_core/src/prelude.rs

// --- Collaborator Contracts (implemented by the host application) ---
pub use crate::abstractions::{
    DebugRenderer, DriverInput, PhysicsWorld, PrimitiveShape, SkeletonPose,
    VehicleConstraintSettings, WheelState,
};
pub use crate::types::{BodyHandle, ConstraintHandle, ObjectId, PrimitiveHandle, Rgba, WorldObject};

// --- Controller Entry Points ---
pub use crate::messages::{PhysicsInput, VehicleUpdateEvents};
pub use crate::vehicle::{create_vehicle, BikePhysics, VehicleKind, VehiclePhysics, VehicleRuntimeState};

// --- Configuration ---
pub use crate::pose::PoseConfig;
pub use crate::settings::{SeatSettings, TuningConfig, VehicleSettings, WheelSettings};

// --- Errors ---
pub use crate::error::{PhysicsError, VehicleBuildError};

// --- Frames ---
pub use crate::frames::{ModelFrame, VehicleBasis};
