// moto_core/src/control/righting.rs

use nalgebra::{UnitQuaternion, Vector3};
use tracing::{debug, info};

/// One step's worth of righting output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RightingCommand {
    /// Remaining current-to-desired rotation as a scaled axis (axis * angle).
    pub rotation: Vector3<f64>,
    pub desired_angular_velocity: Vector3<f64>,
    /// World-space torque to apply to the body this step.
    pub torque: Vector3<f64>,
}

/// Timed controller that turns a fallen vehicle back upright, keeping its heading.
///
/// The target orientation is the upright model pose rotated about world up by the
/// vehicle's current yaw. The controller asks for an angular velocity proportional to
/// the remaining rotation and applies a torque proportional to the velocity error,
/// which avoids the oscillation a constant torque would cause.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelfRightingController {
    time_remaining: f64,
}

impl SelfRightingController {
    pub fn start(&mut self, duration: f64) {
        info!("Righting vehicle for {:.2}s", duration);
        self.time_remaining = duration;
    }

    pub fn cancel(&mut self) {
        if self.is_active() {
            debug!("Righting cancelled with {:.2}s remaining", self.time_remaining);
        }
        self.time_remaining = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.time_remaining > 0.0
    }

    pub fn time_remaining(&self) -> f64 {
        self.time_remaining.max(0.0)
    }

    /// Computes this step's corrective torque and advances the countdown.
    ///
    /// Returns `None` once the countdown has run out.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        current_rotation: &UnitQuaternion<f64>,
        current_yaw: f64,
        model_to_sim: &UnitQuaternion<f64>,
        angular_velocity: &Vector3<f64>,
        mass: f64,
        angular_gain: f64,
        torque_gain: f64,
        dt: f64,
    ) -> Option<RightingCommand> {
        if !self.is_active() {
            return None;
        }

        let yaw = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), current_yaw);
        let desired = yaw * model_to_sim;
        let current_to_desired = desired * current_rotation.inverse();

        // Already aligned when there is no rotation axis.
        let rotation = current_to_desired
            .axis_angle()
            .map(|(axis, angle)| axis.into_inner() * angle)
            .unwrap_or_else(Vector3::zeros);

        let desired_angular_velocity = rotation * angular_gain;
        let torque = (desired_angular_velocity - angular_velocity) * mass * torque_gain;

        self.time_remaining -= dt.max(0.0);
        if !self.is_active() {
            info!("Righting finished");
        }

        Some(RightingCommand {
            rotation,
            desired_angular_velocity,
            torque,
        })
    }
}
