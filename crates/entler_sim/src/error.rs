//! # Simulation Error Types
//!
//! All errors that can occur while configuring or running a simulation.

use std::path::PathBuf;

use entler_core::{EntityId, StoreError};
use thiserror::Error;

use crate::math::IVec3;

/// Errors that can occur in the simulation.
#[derive(Error, Debug)]
pub enum SimError {
    /// A position lies outside the scene grid.
    #[error("position ({}, {}) is outside the {width}x{height} scene", .position.x, .position.y)]
    OutOfBounds {
        /// The rejected position.
        position: IVec3,
        /// Scene width.
        width: usize,
        /// Scene height.
        height: usize,
    },

    /// The target cell already holds an entity of the same layer.
    #[error("cell ({}, {}) is already occupied by {occupant}", .position.x, .position.y)]
    CellOccupied {
        /// The contested cell.
        position: IVec3,
        /// The entity already there.
        occupant: EntityId,
    },

    /// The entity is not a positioned object indexed by the scene.
    #[error("{0} is not an object in the scene")]
    NotAnObject(EntityId),

    /// The entity store rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while loading a [`SimulationConfig`](crate::SimulationConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for this schema.
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but its values are inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
