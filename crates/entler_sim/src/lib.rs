//! # Entler Simulation
//!
//! A grid world built on the [`entler_core`] entity store:
//! - [`SimSchema`]: objects, properties, positions, bodies, sprites, energy
//! - [`Scene`]: a spatial index kept up to date as an observer
//! - [`Simulation`]: spawning, movement and stepping
//! - [`SimulationConfig`]: TOML configuration of a run

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod components;
pub mod config;
pub mod error;
pub mod math;
pub mod scene;
pub mod schema;
pub mod simulation;

pub use components::{Body, Energy, ObjectType, Position, PropertyType, Sprite};
pub use config::SimulationConfig;
pub use error::{ConfigError, SimError, SimResult};
pub use math::IVec3;
pub use scene::{Layer, Scene};
pub use schema::{ComponentType, SimSchema, SimTables};
pub use simulation::{AgentSpawn, RunReport, Simulation, StepReport};
