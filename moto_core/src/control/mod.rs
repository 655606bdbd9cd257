// moto_core/src/control/mod.rs

//! The per-step controllers, leaves of the vehicle update.
//!
//! Each one is a small stateful value that the vehicle façade calls in order:
//! input mapping, steering, roll stabilization and self-righting.

pub mod input;
pub mod righting;
pub mod roll;
pub mod steering;

pub use input::map_input;
pub use righting::{RightingCommand, SelfRightingController};
pub use roll::{target_roll_angle, RollStabilizer};
pub use steering::SteeringFilter;
