//! # Store Error Types
//!
//! All errors that can occur while operating an entity store.

use thiserror::Error;

use crate::ecs::EntityId;
use crate::memory::AllocError;

/// Errors that can occur in the entity store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The entity was never created by this store or has been removed.
    #[error("invalid entity reference: {0} does not exist or was removed")]
    InvalidEntity(EntityId),

    /// A handle was resolved while not linked to a live entity.
    #[error("invalid handle: not linked to a live entity")]
    InvalidHandle,

    /// A handle was resolved against a store that did not create it.
    #[error("handle belongs to a different store")]
    ForeignHandle,

    /// The entity does not own a component of the requested kind.
    #[error("{entity} has no {kind} component")]
    MissingComponent {
        /// The entity that was queried.
        entity: EntityId,
        /// Debug rendering of the missing kind.
        kind: String,
    },

    /// A kind passed at runtime is not declared by the store's schema.
    #[error("component kind {kind} is not declared in schema {schema}")]
    UnknownKind {
        /// Debug rendering of the rejected kind.
        kind: String,
        /// Name of the schema.
        schema: &'static str,
    },

    /// A table could not grow.
    #[error("allocation failed: {0}")]
    Allocation(#[from] AllocError),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
