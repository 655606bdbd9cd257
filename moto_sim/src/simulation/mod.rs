// moto_sim/src/simulation/mod.rs

pub mod config;
pub mod physics;
pub mod render;
pub mod runner;
