// moto_core/src/control/steering.rs

use crate::utils::approach_zero;

/// Rate-limited, self-centering steering angle.
///
/// Holding a direction slews the angle at `rate` rad/s up to the steering lock.
/// With no direction (or both) held the angle relaxes linearly back to zero at the
/// same rate and stops exactly at zero. All increments are scaled by the elapsed
/// time, so the result does not depend on how a period is split into steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringFilter {
    angle: f64,
    max_angle: f64,
    rate: f64,
}

impl SteeringFilter {
    pub fn new(max_angle: f64, rate: f64) -> Self {
        Self {
            angle: 0.0,
            max_angle: max_angle.abs(),
            rate: rate.abs(),
        }
    }

    /// Current steering angle in radians, positive to the right.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn max_angle(&self) -> f64 {
        self.max_angle
    }

    /// Advances the filter by `dt` seconds towards the sign of `target`.
    pub fn update(&mut self, target: f64, dt: f64) -> f64 {
        let step = self.rate * dt.max(0.0);
        self.angle = if target > 0.0 {
            (self.angle + step).clamp(-self.max_angle, self.max_angle)
        } else if target < 0.0 {
            (self.angle - step).clamp(-self.max_angle, self.max_angle)
        } else {
            approach_zero(self.angle, step)
        };
        self.angle
    }

    pub fn reset(&mut self) {
        self.angle = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn thirty_degrees() -> f64 {
        30.0_f64.to_radians()
    }

    #[test]
    fn turning_right_is_monotonic_and_bounded() {
        for &dt in &[0.001, 0.016, 0.1, 0.5, 3.0] {
            let mut filter = SteeringFilter::new(thirty_degrees(), 2.0);
            let mut previous = filter.angle();
            for _ in 0..50 {
                let angle = filter.update(1.0, dt);
                assert!(angle >= previous, "dt {}: {} < {}", dt, angle, previous);
                assert!(angle <= thirty_degrees());
                previous = angle;
            }
        }
    }

    #[test]
    fn one_second_of_right_input_hits_the_lock() {
        let mut filter = SteeringFilter::new(thirty_degrees(), 2.0);
        for _ in 0..10 {
            filter.update(1.0, 0.1);
        }
        assert_abs_diff_eq!(filter.angle(), thirty_degrees().min(2.0), epsilon = 1e-12);
    }

    #[test]
    fn relaxes_to_exactly_zero_without_overshoot() {
        let mut filter = SteeringFilter::new(thirty_degrees(), 2.0);
        filter.update(-1.0, 0.2); // -0.4 rad
        let start = filter.angle();
        let time_to_center = start.abs() / 2.0;

        let dt = 0.03;
        let mut t = 0.0;
        let mut previous = start;
        while t + dt < time_to_center - 1e-9 {
            let angle = filter.update(0.0, dt);
            t += dt;
            assert!(angle < 0.0, "reached zero early at t = {}", t);
            assert!(angle > previous);
            previous = angle;
        }
        // One more step covers the remaining distance and stops at neutral.
        filter.update(0.0, dt);
        assert_eq!(filter.angle(), 0.0);
        filter.update(0.0, dt);
        assert_eq!(filter.angle(), 0.0);
    }

    #[test]
    fn both_keys_behave_like_none() {
        let mut filter = SteeringFilter::new(thirty_degrees(), 2.0);
        filter.update(1.0, 0.1);
        let before = filter.angle();
        filter.update(0.0, 0.05);
        assert_abs_diff_eq!(filter.angle(), before - 0.1, epsilon = 1e-12);
    }

    #[test]
    fn step_size_does_not_change_the_result() {
        let mut coarse = SteeringFilter::new(thirty_degrees(), 2.0);
        let mut fine = SteeringFilter::new(thirty_degrees(), 2.0);
        coarse.update(1.0, 0.2);
        for _ in 0..20 {
            fine.update(1.0, 0.01);
        }
        assert_abs_diff_eq!(coarse.angle(), fine.angle(), epsilon = 1e-12);
    }
}
