// moto_sim/src/simulation/physics/mod.rs

//! The physics collaborator for headless runs: a rapier world with a flat
//! ground slab, adapted to the controller's `PhysicsWorld` interface.

pub mod vehicle;
pub mod world;

pub use vehicle::SimVehicle;
pub use world::FlatGroundWorld;
