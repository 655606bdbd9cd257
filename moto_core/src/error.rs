// moto_core/src/error.rs

use thiserror::Error;

use crate::types::{BodyHandle, ConstraintHandle};

/// Failures reported by the physics collaborator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("physics engine could not allocate {what}")]
    AllocationFailed { what: String },
    #[error("unknown body {0:?}")]
    UnknownBody(BodyHandle),
    #[error("unknown constraint {0:?}")]
    UnknownConstraint(ConstraintHandle),
}

/// Everything that can go wrong while attaching a vehicle controller to a world object.
/// Construction is atomic: when one of these is returned, nothing the builder
/// created is still registered with the physics world.
#[derive(Debug, Error)]
pub enum VehicleBuildError {
    #[error("invalid vehicle settings: {0}")]
    InvalidSettings(String),
    #[error("failed to create vehicle body")]
    BodyCreation(#[source] PhysicsError),
    #[error("failed to create vehicle constraint")]
    ConstraintCreation(#[source] PhysicsError),
    #[error("failed to register vehicle constraint as a step listener")]
    StepListener(#[source] PhysicsError),
}
