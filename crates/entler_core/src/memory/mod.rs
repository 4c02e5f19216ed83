//! # Memory Management
//!
//! Injectable growth policies for store tables.
//!
//! ## Design Philosophy
//!
//! The store owns its tables but never decides how much memory they take:
//! - Growth requests go through an [`Allocator`]
//! - Reservations happen before any state changes
//! - A refused reservation leaves the store untouched

mod allocator;

pub use allocator::{AllocError, Allocator, FixedAllocator, GlobalAllocator};

pub(crate) use allocator::reserve;
