// moto_core/src/lib.rs

// This file defines the public modules of the library.
pub mod abstractions;
pub mod builder;
pub mod control;
pub mod debug_vis;
pub mod error;
pub mod frames;
pub mod messages;
pub mod pose;
pub mod prelude;
pub mod serde_helpers;
pub mod settings;
pub mod types;
pub mod utils;
pub mod vehicle;

#[cfg(test)]
pub(crate) mod testing;
