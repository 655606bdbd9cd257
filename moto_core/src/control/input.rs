// moto_core/src/control/input.rs

use crate::messages::{ControlAxes, PhysicsInput};

/// Throttle for a plain forward/back key press; boost doubles it.
const BASE_THROTTLE: f64 = 0.5;

/// Maps one frame of key state onto control axes.
///
/// The hand brake also requests full nose-up pitch; cancelling the throttle while
/// it is held is left to the vehicle constraint.
pub fn map_input(input: &PhysicsInput) -> ControlAxes {
    let mut throttle = if input.forward {
        BASE_THROTTLE
    } else if input.back {
        -BASE_THROTTLE
    } else {
        0.0
    };
    if input.boost {
        throttle *= 2.0;
    }

    let mut hand_brake = 0.0;
    let mut pitch = 0.0;
    if input.handbrake {
        hand_brake = 1.0;
        pitch = 1.0;
    }
    if input.up {
        pitch = 1.0;
    }
    if input.down {
        pitch = -1.0;
    }

    let steering_target = match (input.left, input.right) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    };

    ControlAxes {
        throttle,
        steering_target,
        brake: 0.0,
        hand_brake,
        pitch,
    }
}
