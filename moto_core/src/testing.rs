// moto_core/src/testing.rs

//! Scripted stand-ins for the physics and rendering collaborators, used by the
//! unit tests of this crate.
//!
//! The mock world does not integrate anything: tests set poses, velocities and
//! wheel states directly and inspect what the controller asked for.

use std::collections::{BTreeMap, HashMap};

use nalgebra::{Isometry3, Matrix4, Point3, Vector3};

use crate::abstractions::{
    BodyDesc, DebugRenderer, DriverInput, PhysicsWorld, PrimitiveShape, SkeletonPose,
    VehicleConstraintSettings, WheelState,
};
use crate::error::PhysicsError;
use crate::types::{
    BodyHandle, ConstraintHandle, ObjectId, PrimitiveHandle, Rgba, WHEEL_COUNT,
};

// =========================================================================
// == Physics ==
// =========================================================================

#[derive(Debug, Clone)]
pub struct MockBody {
    pub desc: BodyDesc,
    pub pose: Isometry3<f64>,
    pub linear_velocity: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
    pub in_world: bool,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct MockConstraint {
    pub body: BodyHandle,
    pub settings: VehicleConstraintSettings,
    pub wheels: [WheelState; WHEEL_COUNT],
    pub driver_input: DriverInput,
    pub max_roll_angle: f64,
    pub tilt_angle: f64,
}

#[derive(Debug, Default)]
pub struct MockPhysicsWorld {
    next_id: u64,
    pub bodies: HashMap<BodyHandle, MockBody>,
    pub objects: HashMap<ObjectId, BodyHandle>,
    pub constraints: HashMap<ConstraintHandle, MockConstraint>,
    pub step_listeners: Vec<ConstraintHandle>,
    /// Every torque applied, in order.
    pub torques: Vec<(BodyHandle, Vector3<f64>)>,
    pub fail_body_creation: bool,
    pub fail_constraint: bool,
    pub fail_listener: bool,
}

impl MockPhysicsWorld {
    pub fn new() -> Self {
        Self::default()
    }

    fn mint(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn body_mut(&mut self, body: BodyHandle) -> &mut MockBody {
        self.bodies.get_mut(&body).expect("unknown body")
    }

    pub fn constraint(&self, constraint: ConstraintHandle) -> &MockConstraint {
        self.constraints.get(&constraint).expect("unknown constraint")
    }

    pub fn set_wheel_state(&mut self, constraint: ConstraintHandle, wheel: usize, state: WheelState) {
        self.constraints
            .get_mut(&constraint)
            .expect("unknown constraint")
            .wheels[wheel] = state;
    }

    /// Sum of all torques applied since the last call, then forgets them.
    pub fn take_torque(&mut self) -> Vector3<f64> {
        self.torques.drain(..).map(|(_, t)| t).sum()
    }

    /// Registers a pre-existing body for `object`, as if another controller had built it.
    pub fn spawn_plain_body(&mut self, object: ObjectId, pose: Isometry3<f64>) -> BodyHandle {
        let desc = BodyDesc {
            shape: crate::abstractions::OffsetBoxShape {
                half_extents: Vector3::new(0.5, 0.5, 0.5),
                center_of_mass_offset: Vector3::zeros(),
            },
            mass: 1.0,
            pose,
            owner: object,
        };
        let body = self.create_body(&desc).expect("body creation");
        self.add_body(body, true);
        self.add_object(object, body);
        body
    }
}

impl PhysicsWorld for MockPhysicsWorld {
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
        if self.fail_body_creation {
            return Err(PhysicsError::AllocationFailed {
                what: "body".to_string(),
            });
        }
        let handle = BodyHandle(self.mint());
        self.bodies.insert(
            handle,
            MockBody {
                desc: *desc,
                pose: desc.pose,
                linear_velocity: Vector3::zeros(),
                angular_velocity: Vector3::zeros(),
                in_world: false,
                active: false,
            },
        );
        Ok(handle)
    }

    fn add_body(&mut self, body: BodyHandle, activate: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.in_world = true;
            b.active = activate;
        }
    }

    fn remove_body(&mut self, body: BodyHandle) {
        self.bodies.remove(&body);
    }

    fn activate_body(&mut self, body: BodyHandle) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.active = true;
        }
    }

    fn body_pose(&self, body: BodyHandle) -> Isometry3<f64> {
        self.bodies
            .get(&body)
            .map(|b| b.pose)
            .unwrap_or_else(Isometry3::identity)
    }

    fn linear_velocity(&self, body: BodyHandle) -> Vector3<f64> {
        self.bodies
            .get(&body)
            .map(|b| b.linear_velocity)
            .unwrap_or_else(Vector3::zeros)
    }

    fn angular_velocity(&self, body: BodyHandle) -> Vector3<f64> {
        self.bodies
            .get(&body)
            .map(|b| b.angular_velocity)
            .unwrap_or_else(Vector3::zeros)
    }

    fn add_torque(&mut self, body: BodyHandle, torque: &Vector3<f64>) {
        self.torques.push((body, *torque));
    }

    fn add_force_at_point(&mut self, _body: BodyHandle, _force: &Vector3<f64>, _point: &Point3<f64>) {}

    fn create_vehicle_constraint(
        &mut self,
        body: BodyHandle,
        settings: &VehicleConstraintSettings,
    ) -> Result<ConstraintHandle, PhysicsError> {
        if self.fail_constraint {
            return Err(PhysicsError::AllocationFailed {
                what: "vehicle constraint".to_string(),
            });
        }
        if !self.bodies.contains_key(&body) {
            return Err(PhysicsError::UnknownBody(body));
        }
        let handle = ConstraintHandle(self.mint());
        self.constraints.insert(
            handle,
            MockConstraint {
                body,
                settings: settings.clone(),
                wheels: [WheelState::default(); WHEEL_COUNT],
                driver_input: DriverInput::default(),
                max_roll_angle: settings.max_roll_angle,
                tilt_angle: 0.0,
            },
        );
        Ok(handle)
    }

    fn remove_constraint(&mut self, constraint: ConstraintHandle) {
        self.constraints.remove(&constraint);
    }

    fn add_step_listener(&mut self, constraint: ConstraintHandle) -> Result<(), PhysicsError> {
        if self.fail_listener {
            return Err(PhysicsError::AllocationFailed {
                what: "step listener".to_string(),
            });
        }
        self.step_listeners.push(constraint);
        Ok(())
    }

    fn remove_step_listener(&mut self, constraint: ConstraintHandle) {
        self.step_listeners.retain(|c| *c != constraint);
    }

    fn wheel_state(&self, constraint: ConstraintHandle, wheel: usize) -> WheelState {
        self.constraints
            .get(&constraint)
            .and_then(|c| c.wheels.get(wheel).copied())
            .unwrap_or_default()
    }

    fn set_driver_input(&mut self, constraint: ConstraintHandle, input: &DriverInput) {
        if let Some(c) = self.constraints.get_mut(&constraint) {
            c.driver_input = *input;
        }
    }

    fn set_max_roll_angle(&mut self, constraint: ConstraintHandle, angle: f64) {
        if let Some(c) = self.constraints.get_mut(&constraint) {
            c.max_roll_angle = angle;
        }
    }

    fn set_tilt_angle(&mut self, constraint: ConstraintHandle, angle: f64) {
        if let Some(c) = self.constraints.get_mut(&constraint) {
            c.tilt_angle = angle;
        }
    }
}

// =========================================================================
// == Rendering ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedPrimitive {
    pub shape: PrimitiveShape,
    pub transform: Matrix4<f64>,
    pub color: Rgba,
}

#[derive(Debug, Default)]
pub struct RecordingRenderer {
    next_id: u64,
    pub live: HashMap<PrimitiveHandle, RecordedPrimitive>,
    /// Number of primitives ever created.
    pub created: usize,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl DebugRenderer for RecordingRenderer {
    fn create_primitive(
        &mut self,
        shape: PrimitiveShape,
        transform: &Matrix4<f64>,
        color: Rgba,
    ) -> PrimitiveHandle {
        self.next_id += 1;
        self.created += 1;
        let handle = PrimitiveHandle(self.next_id);
        self.live.insert(
            handle,
            RecordedPrimitive {
                shape,
                transform: *transform,
                color,
            },
        );
        handle
    }

    fn set_primitive_transform(&mut self, primitive: PrimitiveHandle, transform: &Matrix4<f64>) {
        let p = self.live.get_mut(&primitive).expect("stale primitive handle");
        p.transform = *transform;
    }

    fn remove_primitive(&mut self, primitive: PrimitiveHandle) {
        assert!(
            self.live.remove(&primitive).is_some(),
            "primitive {:?} removed twice",
            primitive
        );
    }
}

#[derive(Debug, Default)]
pub struct MockSkeleton {
    pub names: Vec<String>,
    pub overrides: BTreeMap<usize, Matrix4<f64>>,
    pub writes: usize,
}

impl MockSkeleton {
    pub fn new<I: IntoIterator<Item = String>>(names: I) -> Self {
        Self {
            names: names.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl SkeletonPose for MockSkeleton {
    fn joint_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn joint_count(&self) -> usize {
        self.names.len()
    }

    fn set_procedural_transform(&mut self, joint: usize, transform: &Matrix4<f64>) {
        assert!(joint < self.names.len(), "joint {} out of range", joint);
        self.writes += 1;
        self.overrides.insert(joint, *transform);
    }
}
