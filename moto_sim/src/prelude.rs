// moto_sim/src/prelude.rs

// Re-export the moto_core prelude so controller types come along with the harness.
pub use moto_core::prelude::*;

// --- Simulation ---
pub use crate::error::{ConfigError, SimError};
pub use crate::simulation::config::{
    input_at, load_scenario, parse_scenario, InputPhase, Key, Pose, ScenarioConfig, ScheduledEvent,
    SimulationConfig, VehicleEvent, WorldConfig,
};
pub use crate::simulation::physics::FlatGroundWorld;
pub use crate::simulation::render::{HeadlessRenderer, NamedSkeleton};
pub use crate::simulation::runner::{RunSummary, ScenarioRunner, VEHICLE_OBJECT};
