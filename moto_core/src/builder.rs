// moto_core/src/builder.rs

//! One-time construction of a vehicle's physics representation.
//!
//! The builder replaces whatever body the world object had with a dynamic box
//! carrying an offset centre of mass, attaches a two-wheeled vehicle constraint to
//! it and registers the constraint as a step listener. Either all of that succeeds
//! or nothing is left registered with the physics world.

use tracing::{debug, info, warn};

use crate::abstractions::{
    BodyDesc, CollisionTester, ConstraintDifferential, ConstraintEngine, ConstraintWheelSettings,
    FrictionCurve, OffsetBoxShape, PhysicsWorld, SkeletonPose, VehicleConstraintSettings,
};
use crate::error::VehicleBuildError;
use crate::frames::{forward_y_for, up_y_for, world_up, ModelFrame};
use crate::pose::JointIndexTable;
use crate::settings::{TuningConfig, VehicleSettings, WheelSettings};
use crate::types::{BodyHandle, ConstraintHandle, WorldObject};

/// Everything the builder registered, handed over to the controller that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltVehicle {
    pub body: BodyHandle,
    pub constraint: ConstraintHandle,
    pub constraint_settings: VehicleConstraintSettings,
    pub joints: JointIndexTable,
}

fn constraint_wheel(
    wheel: &WheelSettings,
    tuning: &TuningConfig,
    frame: &ModelFrame,
) -> ConstraintWheelSettings {
    ConstraintWheelSettings {
        position: frame.to_model(&wheel.position),
        suspension_direction: frame.to_model(&wheel.suspension_direction),
        radius: wheel.radius,
        width: wheel.width,
        suspension_min_length: wheel.suspension_min_length,
        suspension_max_length: wheel.suspension_max_length,
        max_steer_angle: wheel.max_steer_angle,
        max_brake_torque: wheel.max_brake_torque,
        max_hand_brake_torque: tuning.hand_brake_torque * wheel.hand_brake_fraction,
        longitudinal_friction: FrictionCurve::default_longitudinal()
            .scaled(tuning.friction_multiplier),
        lateral_friction: FrictionCurve::default_lateral().scaled(tuning.friction_multiplier),
    }
}

/// Describes the vehicle constraint for `settings`, with all geometry in model space.
pub fn vehicle_constraint_settings(
    settings: &VehicleSettings,
    tuning: &TuningConfig,
    frame: &ModelFrame,
) -> VehicleConstraintSettings {
    let [front, rear] = settings.wheels();
    let differential = &settings.differential;
    VehicleConstraintSettings {
        up: frame.to_model(&up_y_for()),
        forward: frame.to_model(&forward_y_for()),
        world_up: world_up(),
        max_roll_angle: tuning.occupied_max_roll_angle,
        wheels: [
            constraint_wheel(front, tuning, frame),
            constraint_wheel(rear, tuning, frame),
        ],
        differentials: vec![ConstraintDifferential {
            left_wheel: differential.left_wheel,
            right_wheel: differential.right_wheel,
            left_right_split: differential.left_right_split,
        }],
        engine: ConstraintEngine {
            max_torque: settings.engine.max_torque,
            max_rpm: settings.engine.max_rpm,
            inertia: settings.engine.inertia,
        },
        gear_ratios: settings.transmission.gear_ratios.clone(),
        collision_tester: CollisionTester::Cylinder {
            convex_radius_fraction: 1.0,
        },
    }
}

/// The rigid body for `settings`, placed at `object`'s current pose.
pub fn body_desc(
    object: &WorldObject,
    physics: &dyn PhysicsWorld,
    settings: &VehicleSettings,
    frame: &ModelFrame,
) -> BodyDesc {
    // An existing body may have moved since the object's pose was recorded.
    let pose = physics
        .object_body(object.id)
        .map(|body| physics.body_pose(body))
        .unwrap_or(object.pose);

    BodyDesc {
        shape: OffsetBoxShape {
            half_extents: frame.model_half_extents(&settings.half_extents),
            center_of_mass_offset: frame.to_model(&settings.center_of_mass_offset),
        },
        mass: settings.mass,
        pose,
        owner: object.id,
    }
}

/// Builds and registers the physics side of a vehicle for `object`.
///
/// Any body the object already had is replaced, but only once every new part
/// exists. The new body is added without waking it; the first non-zero driver
/// input activates it.
///
/// # Errors
/// Returns [`VehicleBuildError`] if the settings are invalid or the physics
/// world fails to create one of the parts. In that case everything created so far
/// has been removed again and the object keeps the body it had.
pub fn build_vehicle(
    object: &WorldObject,
    settings: &VehicleSettings,
    tuning: &TuningConfig,
    physics: &mut dyn PhysicsWorld,
    skeleton: Option<&dyn SkeletonPose>,
) -> Result<BuiltVehicle, VehicleBuildError> {
    settings.validate()?;
    tuning.validate()?;

    let frame = ModelFrame::new(
        &settings.model_to_y_forwards_rot_1,
        &settings.model_to_y_forwards_rot_2,
    );
    let desc = body_desc(object, physics, settings, &frame);

    let body = physics
        .create_body(&desc)
        .map_err(VehicleBuildError::BodyCreation)?;

    let constraint_settings = vehicle_constraint_settings(settings, tuning, &frame);
    let constraint = match physics.create_vehicle_constraint(body, &constraint_settings) {
        Ok(c) => c,
        Err(e) => {
            warn!("Vehicle constraint creation failed for {:?}: {}", object.id, e);
            physics.remove_body(body);
            return Err(VehicleBuildError::ConstraintCreation(e));
        }
    };

    if let Err(e) = physics.add_step_listener(constraint) {
        warn!("Step listener registration failed for {:?}: {}", object.id, e);
        physics.remove_constraint(constraint);
        physics.remove_body(body);
        return Err(VehicleBuildError::StepListener(e));
    }

    // Every part exists; swap the new body in for the old one.
    physics.remove_object(object.id);
    physics.add_body(body, false);
    physics.add_object(object.id, body);
    debug!(
        "Created vehicle body {:?} for object {:?} with half extents {:?}",
        body, object.id, desc.shape.half_extents
    );

    let joints = JointIndexTable::resolve(skeleton, &settings.joint_names);
    info!(
        "Built {:?} vehicle for object {:?}: mass {} kg, {} of 8 joints resolved",
        settings.kind,
        object.id,
        settings.mass,
        joints.resolved_count()
    );

    Ok(BuiltVehicle {
        body,
        constraint,
        constraint_settings,
        joints,
    })
}
