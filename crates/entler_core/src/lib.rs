//! # Entler Core
//!
//! In-process entity-component store:
//! - Entities with a dynamic set of components drawn from a fixed schema
//! - Dense columnar component storage with mask-filtered iteration
//! - Weak, self-updating entity handles that survive compaction
//! - Scoped observers notified of every add and remove
//!
//! ## Example
//!
//! ```rust,ignore
//! use entler_core::{entity_schema, EntityStore};
//!
//! entity_schema! {
//!     pub struct DemoSchema<Kind> {
//!         tables: DemoTables,
//!         positions: Position = Kind::Position,
//!         tags: Tag = Kind::Tag,
//!     }
//! }
//!
//! let mut store = EntityStore::<DemoSchema>::new();
//! let id = store.add_entity((Position { x: 3, y: 4 }, Tag))?.id();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod ecs;
pub mod error;
pub mod memory;

pub use ecs::{
    Bundle, Column, Component, ComponentMask, ComponentTables, EntityHandle, EntityId,
    EntityMut, EntityObserver, EntityRef, EntityStore, Observer, Query, Schema, SlotArray,
    VacuumStats, MAX_KINDS,
};
pub use error::{StoreError, StoreResult};
pub use memory::{AllocError, Allocator, FixedAllocator, GlobalAllocator};
