// moto_sim/src/lib.rs

//! Headless harness for the motorbike controller: a reference physics world,
//! TOML scenarios with scripted input, and a runner that steps them.

// This prelude is for convenience for other files WITHIN the moto_sim crate.
pub mod prelude;

pub mod cli;
pub mod error;
pub mod simulation;
