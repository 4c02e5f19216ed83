//! # Entity Component Store
//!
//! A typed, single-owner entity database over a compile-time schema.
//!
//! ## Design Philosophy
//!
//! - The set of component kinds is closed and fixed by the schema
//! - Per-entity composition is a presence mask plus a fixed slot array
//! - Components live in dense, append-ordered columns, one per kind
//! - Handles and observers hold weak back-references only

mod component;
mod entity;
mod handle;
mod observer;
mod query;
pub mod schema;
mod storage;
mod store;

pub use component::{Bundle, Component};
pub use entity::{ComponentMask, EntityId};
pub use handle::EntityHandle;
pub use observer::{EntityObserver, Observer};
pub use query::Query;
pub use schema::{ComponentTables, Schema, SlotArray, MAX_KINDS};
pub use storage::Column;
pub use store::{EntityMut, EntityRef, EntityStore, VacuumStats};
