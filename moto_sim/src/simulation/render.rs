// moto_sim/src/simulation/render.rs

//! Headless stand-ins for the rendering side: a debug renderer that keeps its
//! primitives in memory and a skeleton that stores procedural joint overrides.

use std::collections::HashMap;

use nalgebra::Matrix4;
use tracing::warn;

use moto_core::abstractions::{DebugRenderer, PrimitiveShape, SkeletonPose};
use moto_core::settings::JointNames;
use moto_core::types::{PrimitiveHandle, Rgba};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primitive {
    pub shape: PrimitiveShape,
    pub transform: Matrix4<f64>,
    pub color: Rgba,
}

/// Keeps every live debug primitive so a run can be inspected afterwards.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    next_id: u64,
    live: HashMap<PrimitiveHandle, Primitive>,
    created: usize,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Primitives created over the renderer's lifetime.
    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn primitive(&self, handle: PrimitiveHandle) -> Option<&Primitive> {
        self.live.get(&handle)
    }
}

impl DebugRenderer for HeadlessRenderer {
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
            Primitive {
                shape,
                transform: *transform,
                color,
            },
        );
        handle
    }

    fn set_primitive_transform(&mut self, primitive: PrimitiveHandle, transform: &Matrix4<f64>) {
        match self.live.get_mut(&primitive) {
            Some(p) => p.transform = *transform,
            None => warn!("Transform set on unknown primitive {:?}", primitive),
        }
    }

    fn remove_primitive(&mut self, primitive: PrimitiveHandle) {
        if self.live.remove(&primitive).is_none() {
            warn!("Primitive {:?} removed twice", primitive);
        }
    }
}

/// A flat list of named joints, as loaded from a model file.
#[derive(Debug, Clone, Default)]
pub struct NamedSkeleton {
    names: Vec<String>,
    overrides: HashMap<usize, Matrix4<f64>>,
}

impl NamedSkeleton {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            overrides: HashMap::new(),
        }
    }

    /// A root joint followed by every joint the bike poses.
    pub fn stock_bike(joint_names: &JointNames) -> Self {
        Self::new([
            "root",
            joint_names.steering.as_str(),
            joint_names.swing_arm.as_str(),
            joint_names.front_wheel.as_str(),
            joint_names.rear_wheel.as_str(),
            joint_names.upper_piston_left.as_str(),
            joint_names.upper_piston_right.as_str(),
            joint_names.lower_piston_left.as_str(),
            joint_names.lower_piston_right.as_str(),
        ])
    }

    pub fn procedural_transform(&self, name: &str) -> Option<&Matrix4<f64>> {
        self.joint_index(name).and_then(|i| self.overrides.get(&i))
    }

    pub fn posed_joint_count(&self) -> usize {
        self.overrides.len()
    }
}

impl SkeletonPose for NamedSkeleton {
    fn joint_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn joint_count(&self) -> usize {
        self.names.len()
    }

    fn set_procedural_transform(&mut self, joint: usize, transform: &Matrix4<f64>) {
        if joint < self.names.len() {
            self.overrides.insert(joint, *transform);
        } else {
            warn!("Joint {} is out of range for {} joints", joint, self.names.len());
        }
    }
}
