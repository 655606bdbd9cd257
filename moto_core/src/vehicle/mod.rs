// moto_core/src/vehicle/mod.rs

//! The vehicle controller interface and its implementations.

pub mod bike;

pub use bike::BikePhysics;

use nalgebra::{Isometry3, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::abstractions::{DebugRenderer, PhysicsWorld, SkeletonPose};
use crate::error::VehicleBuildError;
use crate::messages::{PhysicsInput, VehicleUpdateEvents};
use crate::settings::{TuningConfig, VehicleSettings};
use crate::types::{ObjectId, WorldObject};

/// The closed set of vehicle variants. Selects the controller `create_vehicle` builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    #[default]
    Bike,
}

/// Read-only snapshot of a controller's own state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleRuntimeState {
    /// `None` while nobody rides; disables roll control.
    pub occupied_seat: Option<usize>,
    pub steering_angle: f64,
    pub smoothed_desired_roll: f64,
    pub target_tilt: f64,
    pub righting_time_remaining: f64,
    pub time_since_spawn: f64,
    /// Debug only.
    pub last_desired_up: Vector3<f64>,
}

/// A controller driving one vehicle in the physics world.
///
/// The controller owns its body, constraint and debug primitives. The collaborators
/// themselves are borrowed on every call. `update` runs once per physics step on
/// the physics thread.
pub trait VehiclePhysics: Debug + Send {
    fn kind(&self) -> VehicleKind;
    fn controlled_object(&self) -> ObjectId;
    fn settings(&self) -> &VehicleSettings;
    fn runtime_state(&self) -> VehicleRuntimeState;

    // --- Lifecycle hooks ---

    /// Starts turning the vehicle back onto its wheels for a fixed time.
    fn start_righting(&mut self);
    /// A user sat down in `seat`. Panics if `seat` is not one of the vehicle's seats.
    fn on_seat_entered(&mut self, seat: usize);
    fn on_seat_exited(&mut self);
    /// The vehicle was just summoned; restarts the spawn effect clock.
    fn on_spawned(&mut self);

    // --- Per-step ---

    /// Applies one frame of input and the stabilizing controllers.
    ///
    /// The skeleton, when given, receives this step's procedural joint pose.
    fn update(
        &mut self,
        physics: &mut dyn PhysicsWorld,
        skeleton: Option<&mut dyn SkeletonPose>,
        input: &PhysicsInput,
        dt: f64,
    ) -> VehicleUpdateEvents;

    // --- Queries ---

    fn first_person_camera_position(&self, physics: &dyn PhysicsWorld) -> Point3<f64>;
    fn third_person_camera_target_translation(&self) -> Vector3<f64>;
    fn body_transform(&self, physics: &dyn PhysicsWorld) -> Isometry3<f64>;
    /// Panics if `seat` is not one of the vehicle's seats.
    fn seat_to_world_transform(&self, physics: &dyn PhysicsWorld, seat: usize) -> Isometry3<f64>;
    fn linear_velocity(&self, physics: &dyn PhysicsWorld) -> Vector3<f64>;

    // --- Debug & teardown ---

    fn update_debug_visualization(
        &mut self,
        physics: &dyn PhysicsWorld,
        renderer: &mut dyn DebugRenderer,
        show: bool,
    );

    /// Deregisters the constraint and step listener, releases debug primitives and
    /// finally removes the body, in that order.
    fn destroy(self: Box<Self>, physics: &mut dyn PhysicsWorld, renderer: Option<&mut dyn DebugRenderer>);
}

/// Builds the controller variant selected by `settings.kind`.
pub fn create_vehicle(
    object: &WorldObject,
    settings: VehicleSettings,
    tuning: TuningConfig,
    physics: &mut dyn PhysicsWorld,
    skeleton: Option<&dyn SkeletonPose>,
) -> Result<Box<dyn VehiclePhysics>, VehicleBuildError> {
    match settings.kind {
        VehicleKind::Bike => {
            let bike = BikePhysics::new(object, settings, tuning, physics, skeleton)?;
            Ok(Box::new(bike))
        }
    }
}
