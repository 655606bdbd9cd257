// moto_sim/src/simulation/config.rs

//! Scenario files: the world, the vehicle, a scripted input timeline and
//! scheduled lifecycle events.
//!
//! Every section is optional. Missing values fall back to the stock bike on flat
//! ground, so a scenario only has to spell out what it changes.

use std::path::Path;

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::info;

use moto_core::messages::PhysicsInput;
use moto_core::serde_helpers::{quat_f64_from_euler_deg, vec3_f64_from_array};
use moto_core::settings::{TuningConfig, VehicleSettings};

use crate::error::ConfigError;

// =========================================================================
// == Top-Level Config Struct ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScenarioConfig {
    pub simulation: SimulationConfig,
    pub world: WorldConfig,
    pub vehicle: VehicleSettings,
    pub tuning: TuningConfig,
    /// Where the vehicle's world object starts.
    pub start: Pose,
    /// Seat taken right after spawning. `None` leaves the bike unridden.
    pub occupied_seat: Option<usize>,
    /// Input phases; keys of overlapping phases are combined.
    pub script: Vec<InputPhase>,
    /// Lifecycle events, fired at the first step at or after their time.
    pub events: Vec<ScheduledEvent>,
}

// =========================================================================
// == Helper Structs for Nested Configuration ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SimulationConfig {
    /// Fixed physics step in seconds.
    pub dt: f64,
    pub duration_seconds: f64,
    /// Period of the vehicle state log line. Zero disables it.
    pub log_interval_seconds: f64,
    /// Keep the debug primitives up to date every step.
    pub debug_vis: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 120.0,
            duration_seconds: 5.0,
            log_interval_seconds: 0.5,
            debug_vis: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WorldConfig {
    /// Magnitude of gravity along -Z.
    pub gravity: f64,
    pub ground_height: f64,
    /// Coulomb friction of the box against the ground.
    pub ground_friction: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            ground_height: 0.0,
            ground_friction: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Pose {
    #[serde(with = "vec3_f64_from_array")]
    pub translation: Vector3<f64>,
    /// Roll, pitch, yaw in degrees.
    #[serde(with = "quat_f64_from_euler_deg")]
    pub rotation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            translation: Vector3::new(0.0, 0.0, 0.6),
            rotation: UnitQuaternion::identity(),
        }
    }
}

impl Pose {
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.translation), self.rotation)
    }
}

/// A key of the abstract key set the controller reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
    Boost,
    Handbrake,
}

impl Key {
    fn press(self, input: &mut PhysicsInput) {
        match self {
            Key::Forward => input.forward = true,
            Key::Back => input.back = true,
            Key::Left => input.left = true,
            Key::Right => input.right = true,
            Key::Up => input.up = true,
            Key::Down => input.down = true,
            Key::Boost => input.boost = true,
            Key::Handbrake => input.handbrake = true,
        }
    }
}

/// Keys held down over `[start, end)` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputPhase {
    pub start: f64,
    pub end: f64,
    pub keys: Vec<Key>,
}

impl InputPhase {
    pub fn is_active(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }
}

/// The combined key state of every phase active at `time`.
pub fn input_at(script: &[InputPhase], time: f64) -> PhysicsInput {
    let mut input = PhysicsInput::default();
    for phase in script.iter().filter(|p| p.is_active(time)) {
        for key in &phase.keys {
            key.press(&mut input);
        }
    }
    input
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VehicleEvent {
    StartRighting,
    EnterSeat { seat: usize },
    ExitSeat,
    Spawned,
}

/// One `[[events]]` entry. Entries with a misspelt or stray key are refused.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EventEntry", into = "EventEntry")]
pub struct ScheduledEvent {
    pub at: f64,
    pub action: VehicleEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EventKind {
    StartRighting,
    EnterSeat,
    ExitSeat,
    Spawned,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EventEntry {
    at: f64,
    #[serde(rename = "type")]
    kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seat: Option<usize>,
}

impl TryFrom<EventEntry> for ScheduledEvent {
    type Error = String;

    fn try_from(entry: EventEntry) -> Result<Self, Self::Error> {
        let action = match (entry.kind, entry.seat) {
            (EventKind::EnterSeat, Some(seat)) => VehicleEvent::EnterSeat { seat },
            (EventKind::EnterSeat, None) => {
                return Err(format!("enter_seat at {} needs a `seat`", entry.at))
            }
            (kind, Some(_)) => return Err(format!("{:?} at {} takes no `seat`", kind, entry.at)),
            (EventKind::StartRighting, None) => VehicleEvent::StartRighting,
            (EventKind::ExitSeat, None) => VehicleEvent::ExitSeat,
            (EventKind::Spawned, None) => VehicleEvent::Spawned,
        };
        Ok(ScheduledEvent { at: entry.at, action })
    }
}

impl From<ScheduledEvent> for EventEntry {
    fn from(event: ScheduledEvent) -> Self {
        let (kind, seat) = match event.action {
            VehicleEvent::StartRighting => (EventKind::StartRighting, None),
            VehicleEvent::EnterSeat { seat } => (EventKind::EnterSeat, Some(seat)),
            VehicleEvent::ExitSeat => (EventKind::ExitSeat, None),
            VehicleEvent::Spawned => (EventKind::Spawned, None),
        };
        EventEntry { at: event.at, kind, seat }
    }
}

// =========================================================================
// == Loading ==
// =========================================================================

impl ScenarioConfig {
    /// Rejects scenarios the runner cannot execute.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if !(sim.dt > 0.0) {
            return Err(ConfigError::Invalid(format!("dt must be positive, got {}", sim.dt)));
        }
        if !(sim.duration_seconds >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "duration must not be negative, got {}",
                sim.duration_seconds
            )));
        }
        for phase in &self.script {
            if phase.end < phase.start {
                return Err(ConfigError::Invalid(format!(
                    "input phase ends at {} before it starts at {}",
                    phase.end, phase.start
                )));
            }
        }
        let seats = self.vehicle.seats.len();
        let requested_seats = self.occupied_seat.into_iter().chain(self.events.iter().filter_map(|e| {
            match e.action {
                VehicleEvent::EnterSeat { seat } => Some(seat),
                _ => None,
            }
        }));
        for seat in requested_seats {
            if seat >= seats {
                return Err(ConfigError::Invalid(format!(
                    "seat {} does not exist, the vehicle has {} seats",
                    seat, seats
                )));
            }
        }
        self.vehicle
            .validate()
            .and_then(|_| self.tuning.validate())
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Events sorted by firing time.
    pub fn sorted_events(&self) -> Vec<ScheduledEvent> {
        let mut events = self.events.clone();
        events.sort_by(|a, b| a.at.total_cmp(&b.at));
        events
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Loads a scenario, layering the file over the built-in defaults.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    info!("Loading scenario from: {}", path.display());

    let config: ScenarioConfig = Figment::from(Serialized::defaults(ScenarioConfig::default()))
        .merge(Toml::file(path))
        .extract()
        .map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
    config.validate()?;
    Ok(config)
}

/// Parses a scenario from a TOML string, for tests and embedded scenarios.
pub fn parse_scenario(toml: &str) -> Result<ScenarioConfig, ConfigError> {
    let config: ScenarioConfig = Figment::from(Serialized::defaults(ScenarioConfig::default()))
        .merge(Toml::string(toml))
        .extract()
        .map_err(|e| ConfigError::Parse {
            path: "<inline>".into(),
            source: Box::new(e),
        })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn an_empty_scenario_is_the_stock_bike() {
        let config = parse_scenario("").unwrap();
        let stock = ScenarioConfig::default();
        assert_eq!(config.simulation, stock.simulation);
        assert_eq!(config.world, stock.world);
        assert_eq!(config.vehicle.mass, stock.vehicle.mass);
        assert_eq!(config.vehicle.seats, stock.vehicle.seats);
        assert_eq!(config.occupied_seat, None);
        assert!(config.script.is_empty() && config.events.is_empty());
    }

    #[test]
    fn partial_sections_merge_over_the_defaults() {
        let config = parse_scenario(
            r#"
            occupied_seat = 0

            [simulation]
            duration_seconds = 2.0

            [vehicle]
            mass = 250.0

            [vehicle.front_wheel]
            max_steer_angle = 25.0

            [start]
            translation = [1.0, 2.0, 0.7]
            rotation = [0.0, 0.0, 90.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.occupied_seat, Some(0));
        assert_eq!(config.simulation.duration_seconds, 2.0);
        assert_abs_diff_eq!(config.simulation.dt, 1.0 / 120.0);
        assert_eq!(config.vehicle.mass, 250.0);
        assert_abs_diff_eq!(config.vehicle.front_wheel.max_steer_angle, 25.0_f64.to_radians(), epsilon = 1e-12);
        // Untouched wheel fields keep their stock values.
        assert_eq!(config.vehicle.front_wheel.radius, VehicleSettings::default().front_wheel.radius);
        assert_abs_diff_eq!(config.start.rotation.euler_angles().2, 90.0_f64.to_radians(), epsilon = 1e-9);
    }

    #[test]
    fn script_keys_combine_over_overlapping_phases() {
        let config = parse_scenario(
            r#"
            [[script]]
            start = 0.0
            end = 2.0
            keys = ["forward"]

            [[script]]
            start = 1.0
            end = 3.0
            keys = ["right", "boost"]
            "#,
        )
        .unwrap();
        assert_eq!(
            input_at(&config.script, 0.5),
            PhysicsInput { forward: true, ..Default::default() }
        );
        assert_eq!(
            input_at(&config.script, 1.5),
            PhysicsInput { forward: true, right: true, boost: true, ..Default::default() }
        );
        // Phases are half-open.
        assert!(!input_at(&config.script, 2.0).forward);
        assert!(input_at(&config.script, 3.0).is_idle());
    }

    #[test]
    fn events_parse_by_type_tag() {
        let config = parse_scenario(
            r#"
            [[events]]
            at = 1.5
            type = "exit_seat"

            [[events]]
            at = 0.5
            type = "enter_seat"
            seat = 0

            [[events]]
            at = 2.0
            type = "start_righting"
            "#,
        )
        .unwrap();
        let events = config.sorted_events();
        assert_eq!(events[0].action, VehicleEvent::EnterSeat { seat: 0 });
        assert_eq!(events[1].action, VehicleEvent::ExitSeat);
        assert_eq!(events[2].action, VehicleEvent::StartRighting);
    }

    #[test]
    fn rejects_unknown_fields_and_bad_values() {
        assert!(matches!(
            parse_scenario("[simulation]\nfps = 60"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            parse_scenario("[simulation]\ndt = 0.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse_scenario("occupied_seat = 3"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse_scenario("[vehicle]\nmass = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn events_reject_misspelt_and_stray_keys() {
        let typo = "[[events]]\nat = 0.5\ntype = \"enter_seat\"\nseet = 0\n";
        assert!(matches!(parse_scenario(typo), Err(ConfigError::Parse { .. })));

        let stray_seat = "[[events]]\nat = 0.5\ntype = \"exit_seat\"\nseat = 0\n";
        assert!(matches!(parse_scenario(stray_seat), Err(ConfigError::Parse { .. })));

        let unknown_type = "[[events]]\nat = 0.5\ntype = \"explode\"\n";
        assert!(matches!(parse_scenario(unknown_type), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn events_survive_a_dump() {
        let mut config = ScenarioConfig::default();
        config.events = vec![
            ScheduledEvent { at: 0.1, action: VehicleEvent::EnterSeat { seat: 0 } },
            ScheduledEvent { at: 0.2, action: VehicleEvent::Spawned },
        ];
        let config = parse_scenario(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config.events[0].action, VehicleEvent::EnterSeat { seat: 0 });
        assert_eq!(config.events[1].action, VehicleEvent::Spawned);
    }

    #[test]
    fn missing_files_are_reported_as_such() {
        let err = load_scenario(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn dumped_config_loads_back() {
        let dumped = ScenarioConfig::default().to_toml().unwrap();
        let config = parse_scenario(&dumped).unwrap();
        assert_eq!(config.vehicle.seats, ScenarioConfig::default().vehicle.seats);
        assert_eq!(config.simulation, SimulationConfig::default());
    }
}
