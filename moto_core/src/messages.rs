// moto_core/src/messages.rs

use serde::{Deserialize, Serialize};

// =========================================================================
// == Inputs ==
// =========================================================================

/// Raw per-frame key state handed to the controller.
///
/// The names are abstract; a desktop client typically binds W/Up to `forward`,
/// S/Down to `back`, A to `left`, D to `right`, Space to `handbrake` (which also
/// drives `up` pitch), C/Ctrl to `down` and Shift to `boost`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsInput {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub boost: bool,
    pub handbrake: bool,
}

impl PhysicsInput {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Normalized control axes for one step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlAxes {
    /// -1, -0.5, 0, 0.5 or 1.
    pub throttle: f64,
    /// Direction the steering should move in: -1 left, 0 re-center, 1 right.
    pub steering_target: f64,
    /// Foot brake, 0 to 1.
    pub brake: f64,
    /// Hand brake, 0 to 1.
    pub hand_brake: f64,
    /// Air pitch control, -1 (nose down) to 1 (nose up).
    pub pitch: f64,
}

// =========================================================================
// == Outputs ==
// =========================================================================

/// Events raised during a vehicle update, for the owning application to act on.
///
/// No event is raised yet; new fields can be added without breaking callers.
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct VehicleUpdateEvents {}
