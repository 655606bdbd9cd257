// moto_core/src/control/roll.rs

//! Lean control for two-wheeled vehicles.
//!
//! A motorbike in a steady turn leans so that gravity balances the sideways tire
//! force. The stabilizer measures that force from the wheels' lateral friction
//! impulses, converts it into the balancing lean angle and hands a smoothed version
//! to the constraint's roll limiter as its tilt target.

use nalgebra::Vector3;

use crate::abstractions::WheelState;
use crate::types::WHEEL_COUNT;
use crate::utils::{blend, blend_factor};

/// The roll angle at which gravity's lateral component balances the measured
/// lateral tire force.
///
/// Returns exactly `0.0` unless every wheel is touching the ground; the division
/// by `dt` only happens once contact is established and `dt` is positive.
pub fn target_roll_angle(
    wheels: &[WheelState; WHEEL_COUNT],
    no_roll_right: &Vector3<f64>,
    mass: f64,
    gravity: f64,
    dt: f64,
) -> f64 {
    if !wheels.iter().all(|w| w.has_contact) || dt <= 0.0 {
        return 0.0;
    }

    let lateral_impulse: Vector3<f64> = wheels
        .iter()
        .map(|w| w.contact_lateral * w.lateral_impulse)
        .sum();
    let lateral_force = lateral_impulse.dot(no_roll_right) / dt;

    // Magnitude of the normal force pushing up from the ground.
    let normal_force = mass * gravity;
    (lateral_force / normal_force).atan()
}

/// Double low-pass filter from the raw lean target to the limiter's tilt angle.
///
/// The first stage damps noise in the force measurement, the second keeps the
/// limiter from oscillating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollStabilizer {
    smoothed_desired_roll: f64,
    target_tilt: f64,
    last_desired_up: Vector3<f64>,
}

impl Default for RollStabilizer {
    fn default() -> Self {
        Self {
            smoothed_desired_roll: 0.0,
            target_tilt: 0.0,
            last_desired_up: Vector3::zeros(),
        }
    }
}

impl RollStabilizer {
    pub fn smoothed_desired_roll(&self) -> f64 {
        self.smoothed_desired_roll
    }

    pub fn target_tilt(&self) -> f64 {
        self.target_tilt
    }

    /// The up vector the vehicle is being leaned towards, kept for debug display.
    /// Zero until the first occupied update.
    pub fn last_desired_up(&self) -> &Vector3<f64> {
        &self.last_desired_up
    }

    /// Feeds one raw target through both filter stages and returns the new tilt
    /// target for the roll limiter.
    pub fn update(
        &mut self,
        raw_target: f64,
        no_roll_right: &Vector3<f64>,
        no_roll_up: &Vector3<f64>,
        dt: f64,
        smoothing_rate: f64,
        max_blend: f64,
    ) -> f64 {
        let factor = blend_factor(dt, smoothing_rate, max_blend);
        self.smoothed_desired_roll = blend(self.smoothed_desired_roll, raw_target, factor);

        let (sin, cos) = self.smoothed_desired_roll.sin_cos();
        self.last_desired_up = no_roll_up * cos + no_roll_right * sin;

        self.target_tilt = blend(self.target_tilt, self.smoothed_desired_roll, factor);
        self.target_tilt
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn grounded(lateral: Vector3<f64>, impulse: f64) -> WheelState {
        WheelState {
            has_contact: true,
            contact_lateral: lateral,
            lateral_impulse: impulse,
            ..WheelState::default()
        }
    }

    #[test]
    fn airborne_wheel_gives_zero_target_for_any_force() {
        for &impulse in &[-1.0e6, -3.0, 0.0, 2.5, 1.0e9] {
            let mut wheels = [grounded(Vector3::x(), impulse), grounded(Vector3::x(), impulse)];
            wheels[1].has_contact = false;
            assert_eq!(target_roll_angle(&wheels, &Vector3::x(), 200.0, 9.81, 0.016), 0.0);

            wheels[1].has_contact = true;
            wheels[0].has_contact = false;
            assert_eq!(target_roll_angle(&wheels, &Vector3::x(), 200.0, 9.81, 0.016), 0.0);
        }
    }

    #[test]
    fn balancing_angle_matches_force_ratio() {
        let mass = 200.0;
        let g = 9.81;
        let dt = 0.02;
        // Total lateral force equal to the weight -> 45 degree lean.
        let per_wheel = mass * g * dt / 2.0;
        let wheels = [grounded(Vector3::x(), per_wheel), grounded(Vector3::x(), per_wheel)];
        let angle = target_roll_angle(&wheels, &Vector3::x(), mass, g, dt);
        assert_abs_diff_eq!(angle, std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
    }

    #[test]
    fn each_wheel_contributes_along_its_own_lateral_direction() {
        // Front wheel pushes right, rear wheel pushes left by the same amount.
        let wheels = [grounded(Vector3::x(), 5.0), grounded(-Vector3::x(), 5.0)];
        let angle = target_roll_angle(&wheels, &Vector3::x(), 200.0, 9.81, 0.02);
        assert_abs_diff_eq!(angle, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_dt_is_guarded() {
        let wheels = [grounded(Vector3::x(), 5.0), grounded(Vector3::x(), 5.0)];
        assert_eq!(target_roll_angle(&wheels, &Vector3::x(), 200.0, 9.81, 0.0), 0.0);
    }

    #[test]
    fn double_smoothing_lags_the_first_stage() {
        let mut stab = RollStabilizer::default();
        let right = Vector3::x();
        let up = Vector3::z();
        stab.update(0.5, &right, &up, 0.01, 4.0, 0.1);
        // factor = 0.04
        assert_abs_diff_eq!(stab.smoothed_desired_roll(), 0.02, epsilon = 1e-12);
        assert_abs_diff_eq!(stab.target_tilt(), 0.0008, epsilon = 1e-12);

        for _ in 0..2000 {
            stab.update(0.5, &right, &up, 0.01, 4.0, 0.1);
        }
        assert_abs_diff_eq!(stab.target_tilt(), 0.5, epsilon = 1e-6);
        let desired_up = stab.last_desired_up();
        assert_abs_diff_eq!(desired_up.x, 0.5_f64.sin(), epsilon = 1e-6);
        assert_abs_diff_eq!(desired_up.z, 0.5_f64.cos(), epsilon = 1e-6);
    }

    #[test]
    fn long_frames_are_capped() {
        let mut stab = RollStabilizer::default();
        stab.update(1.0, &Vector3::x(), &Vector3::z(), 10.0, 4.0, 0.1);
        assert_abs_diff_eq!(stab.smoothed_desired_roll(), 0.1, epsilon = 1e-12);
    }
}
