// moto_sim/src/error.rs

use std::path::PathBuf;
use thiserror::Error;

use moto_core::error::VehicleBuildError;

/// Failures while loading or validating a scenario file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("scenario file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to parse scenario {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },
    #[error("invalid scenario: {0}")]
    Invalid(String),
    #[error("failed to serialize scenario")]
    Serialize(#[from] toml::ser::Error),
}

/// Failures while setting up or running a scenario.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build the vehicle")]
    Build(#[from] VehicleBuildError),
}
