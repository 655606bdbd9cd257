// moto_sim/src/simulation/physics/world.rs

use std::collections::HashMap;
use std::fmt;

use nalgebra::{Isometry3, Point3, Vector3};
use rapier3d_f64::prelude::{
    CCDSolver, ColliderBuilder, ColliderSet, DefaultBroadPhase, ImpulseJointSet,
    IntegrationParameters, IslandManager, MassProperties, MultibodyJointSet, NarrowPhase,
    PhysicsPipeline, QueryPipeline, RigidBody, RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};
use tracing::{debug, warn};

use moto_core::abstractions::{
    BodyDesc, DriverInput, PhysicsWorld, VehicleConstraintSettings, WheelState,
};
use moto_core::error::PhysicsError;
use moto_core::types::{BodyHandle, ConstraintHandle, ObjectId};

use super::vehicle::SimVehicle;
use crate::simulation::config::WorldConfig;

/// Half size of the ground slab; its top face is the ground plane.
const GROUND_HALF_SIZE: f64 = 1000.0;
const GROUND_HALF_THICKNESS: f64 = 1.0;

/// Light velocity damping on every dynamic body.
const BODY_DAMPING: f64 = 0.05;

/// Bookkeeping for a body created through the `PhysicsWorld` interface.
#[derive(Debug, Clone, Copy)]
struct SimBody {
    handle: RigidBodyHandle,
    mass: f64,
    /// Inertia about the body axes through the centre of mass.
    principal_inertia: Vector3<f64>,
}

/// Solid box inertia about its own centre, from half extents.
fn box_inertia(mass: f64, half: &Vector3<f64>) -> Vector3<f64> {
    let sq = half.component_mul(half);
    Vector3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y) * (mass / 3.0)
}

/// A rapier world with a flat ground slab and raycast vehicles on it.
///
/// Each `step` runs the registered vehicle constraints first, then lets rapier
/// integrate the bodies and resolve their collision boxes against the ground.
pub struct FlatGroundWorld {
    gravity: Vector3<f64>,
    ground_friction: f64,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    next_id: u64,
    bodies: HashMap<BodyHandle, SimBody>,
    objects: HashMap<ObjectId, BodyHandle>,
    vehicles: HashMap<ConstraintHandle, SimVehicle>,
    step_listeners: Vec<ConstraintHandle>,
}

impl FlatGroundWorld {
    pub fn new(config: &WorldConfig) -> Self {
        let mut rigid_bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        let ground = rigid_bodies.insert(
            RigidBodyBuilder::fixed()
                .translation(Vector3::new(0.0, 0.0, config.ground_height - GROUND_HALF_THICKNESS))
                .build(),
        );
        let ground_collider =
            ColliderBuilder::cuboid(GROUND_HALF_SIZE, GROUND_HALF_SIZE, GROUND_HALF_THICKNESS)
                .friction(config.ground_friction)
                .restitution(0.0)
                .build();
        colliders.insert_with_parent(ground_collider, ground, &mut rigid_bodies);

        Self {
            gravity: Vector3::new(0.0, 0.0, -config.gravity),
            ground_friction: config.ground_friction,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies,
            colliders,
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            next_id: 0,
            bodies: HashMap::new(),
            objects: HashMap::new(),
            vehicles: HashMap::new(),
            step_listeners: Vec::new(),
        }
    }

    fn mint(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn rigid_body(&self, body: BodyHandle) -> Option<&RigidBody> {
        self.bodies
            .get(&body)
            .and_then(|b| self.rigid_bodies.get(b.handle))
    }

    fn rigid_body_mut(&mut self, body: BodyHandle) -> Option<&mut RigidBody> {
        let handle = self.bodies.get(&body)?.handle;
        self.rigid_bodies.get_mut(handle)
    }

    // --- Inspection ---

    pub fn vehicle(&self, constraint: ConstraintHandle) -> Option<&SimVehicle> {
        self.vehicles.get(&constraint)
    }

    /// Dynamic bodies created through the `PhysicsWorld` interface.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn listener_count(&self) -> usize {
        self.step_listeners.len()
    }

    /// Whether the body was added to the simulation.
    pub fn is_in_world(&self, body: BodyHandle) -> bool {
        self.rigid_body(body).is_some_and(|b| b.is_enabled())
    }

    pub fn is_sleeping(&self, body: BodyHandle) -> bool {
        self.rigid_body(body).is_some_and(|b| b.is_sleeping())
    }

    /// Teleports a body, clearing its velocities.
    pub fn set_body_pose(&mut self, body: BodyHandle, pose: Isometry3<f64>) {
        if let Some(b) = self.rigid_body_mut(body) {
            b.set_position(pose, true);
            b.set_linvel(Vector3::zeros(), true);
            b.set_angvel(Vector3::zeros(), true);
        }
    }

    pub fn set_body_velocity(&mut self, body: BodyHandle, linear: Vector3<f64>, angular: Vector3<f64>) {
        if let Some(b) = self.rigid_body_mut(body) {
            b.set_linvel(linear, true);
            b.set_angvel(angular, true);
        }
    }

    // --- Simulation ---

    pub fn step(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        self.query_pipeline.update(&self.colliders);

        for handle in &self.step_listeners {
            let Some(vehicle) = self.vehicles.get_mut(handle) else {
                continue;
            };
            let Some(body) = self.bodies.get(&vehicle.body) else {
                warn!("Constraint {:?} steps a removed body {:?}", handle, vehicle.body);
                continue;
            };
            let in_world = self
                .rigid_bodies
                .get(body.handle)
                .is_some_and(|b| b.is_enabled());
            if in_world {
                vehicle.step(
                    &mut self.rigid_bodies,
                    &self.colliders,
                    &self.query_pipeline,
                    &body.principal_inertia,
                    dt,
                );
            }
        }

        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        // Applied forces and torques last for a single step.
        for body in self.bodies.values() {
            if let Some(b) = self.rigid_bodies.get_mut(body.handle) {
                b.reset_forces(false);
                b.reset_torques(false);
            }
        }
    }
}

impl fmt::Debug for FlatGroundWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatGroundWorld")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("objects", &self.objects)
            .field("constraints", &self.vehicles.len())
            .field("step_listeners", &self.step_listeners)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld for FlatGroundWorld {
    fn object_body(&self, object: ObjectId) -> Option<BodyHandle> {
        self.objects.get(&object).copied()
    }

    fn add_object(&mut self, object: ObjectId, body: BodyHandle) {
        self.objects.insert(object, body);
    }

    fn remove_object(&mut self, object: ObjectId) {
        if let Some(body) = self.objects.remove(&object) {
            self.remove_body(body);
        }
    }

    fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, PhysicsError> {
        let half = desc.shape.half_extents;
        if !(desc.mass > 0.0) || half.iter().any(|e| !(*e > 0.0)) {
            return Err(PhysicsError::AllocationFailed {
                what: format!("body with mass {} and half extents {:?}", desc.mass, half),
            });
        }

        // Mass and inertia come from the override; the box itself only collides.
        let principal_inertia = box_inertia(desc.mass, &half);
        let rigid_body = RigidBodyBuilder::dynamic()
            .position(desc.pose)
            .linear_damping(BODY_DAMPING)
            .angular_damping(BODY_DAMPING)
            .additional_mass_properties(MassProperties::new(
                Point3::from(desc.shape.center_of_mass_offset),
                desc.mass,
                principal_inertia,
            ))
            .user_data(u128::from(desc.owner.0))
            .enabled(false)
            .build();
        let rb_handle = self.rigid_bodies.insert(rigid_body);
        let collider = ColliderBuilder::cuboid(half.x, half.y, half.z)
            .density(0.0)
            .friction(self.ground_friction)
            .restitution(0.0)
            .build();
        self.colliders
            .insert_with_parent(collider, rb_handle, &mut self.rigid_bodies);

        let handle = BodyHandle(self.mint());
        self.bodies.insert(
            handle,
            SimBody {
                handle: rb_handle,
                mass: desc.mass,
                principal_inertia,
            },
        );
        debug!("Created body {:?} for {:?}", handle, desc.owner);
        Ok(handle)
    }

    fn add_body(&mut self, body: BodyHandle, activate: bool) {
        if let Some(b) = self.rigid_body_mut(body) {
            b.set_enabled(true);
            if activate {
                b.wake_up(true);
            } else {
                b.sleep();
            }
        }
    }

    fn remove_body(&mut self, body: BodyHandle) {
        let Some(record) = self.bodies.remove(&body) else {
            return;
        };
        self.rigid_bodies.remove(
            record.handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        debug!("Removed body {:?}", body);
    }

    fn activate_body(&mut self, body: BodyHandle) {
        if let Some(b) = self.rigid_body_mut(body) {
            b.wake_up(true);
        }
    }

    fn body_pose(&self, body: BodyHandle) -> Isometry3<f64> {
        self.rigid_body(body)
            .map(|b| *b.position())
            .unwrap_or_else(Isometry3::identity)
    }

    fn linear_velocity(&self, body: BodyHandle) -> Vector3<f64> {
        self.rigid_body(body)
            .map(|b| *b.linvel())
            .unwrap_or_else(Vector3::zeros)
    }

    fn angular_velocity(&self, body: BodyHandle) -> Vector3<f64> {
        self.rigid_body(body)
            .map(|b| *b.angvel())
            .unwrap_or_else(Vector3::zeros)
    }

    fn add_torque(&mut self, body: BodyHandle, torque: &Vector3<f64>) {
        if let Some(b) = self.rigid_body_mut(body) {
            b.add_torque(*torque, true);
        }
    }

    fn add_force_at_point(&mut self, body: BodyHandle, force: &Vector3<f64>, point: &Point3<f64>) {
        if let Some(b) = self.rigid_body_mut(body) {
            b.add_force_at_point(*force, *point, true);
        }
    }

    fn create_vehicle_constraint(
        &mut self,
        body: BodyHandle,
        settings: &VehicleConstraintSettings,
    ) -> Result<ConstraintHandle, PhysicsError> {
        let record = *self.bodies.get(&body).ok_or(PhysicsError::UnknownBody(body))?;
        let vehicle = SimVehicle::new(body, record.handle, record.mass, self.gravity.norm(), settings);
        let handle = ConstraintHandle(self.mint());
        self.vehicles.insert(handle, vehicle);
        debug!("Created vehicle constraint {:?} on {:?}", handle, body);
        Ok(handle)
    }

    fn remove_constraint(&mut self, constraint: ConstraintHandle) {
        self.vehicles.remove(&constraint);
    }

    fn add_step_listener(&mut self, constraint: ConstraintHandle) -> Result<(), PhysicsError> {
        if !self.vehicles.contains_key(&constraint) {
            return Err(PhysicsError::UnknownConstraint(constraint));
        }
        if !self.step_listeners.contains(&constraint) {
            self.step_listeners.push(constraint);
        }
        Ok(())
    }

    fn remove_step_listener(&mut self, constraint: ConstraintHandle) {
        self.step_listeners.retain(|c| *c != constraint);
    }

    fn wheel_state(&self, constraint: ConstraintHandle, wheel: usize) -> WheelState {
        self.vehicles
            .get(&constraint)
            .and_then(|v| v.wheels.get(wheel).copied())
            .unwrap_or_default()
    }

    fn set_driver_input(&mut self, constraint: ConstraintHandle, input: &DriverInput) {
        if let Some(v) = self.vehicles.get_mut(&constraint) {
            v.input = *input;
        }
    }

    fn set_max_roll_angle(&mut self, constraint: ConstraintHandle, angle: f64) {
        if let Some(v) = self.vehicles.get_mut(&constraint) {
            v.max_roll_angle = angle;
        }
    }

    fn set_tilt_angle(&mut self, constraint: ConstraintHandle, angle: f64) {
        if let Some(v) = self.vehicles.get_mut(&constraint) {
            v.tilt_angle = angle;
        }
    }
}
