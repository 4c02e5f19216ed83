//! # Component Storage
//!
//! Dense, append-ordered component columns.
//!
//! The storage uses a dense array strategy:
//! - One column per declared kind
//! - A component's slot number is its position in the column, assigned on append
//! - Slots are never reused, so a slot number stays valid for the column's lifetime

use crate::memory::{self, AllocError, Allocator};

/// Append-ordered storage for a single component type.
///
/// Columns only grow. Components of removed entities keep their slots until
/// the store is dropped; the entity table is what decides which slots are
/// still reachable.
///
/// # Type Parameters
///
/// * `C` - The component type to store
pub struct Column<C> {
    /// The dense array of components.
    values: Vec<C>,
}

impl<C> Column<C> {
    /// Creates an empty column.
    #[must_use]
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Returns the number of slots in use.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Checks whether no slot has been assigned yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of slots available without growing.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Gets a component by slot number.
    ///
    /// Slots of removed entities remain readable here; use the store's
    /// accessors to reach components through a live entity.
    #[inline]
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&C> {
        self.values.get(slot)
    }

    /// Returns a slice of every slot, in slot order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[C] {
        &self.values
    }

    /// Appends a component, returning its slot number.
    #[inline]
    pub(crate) fn push(&mut self, component: C) -> usize {
        let slot = self.values.len();
        self.values.push(component);
        slot
    }

    /// Makes room for `additional` components as directed by `allocator`.
    ///
    /// # Errors
    ///
    /// Returns the allocator's refusal; the column is left unchanged.
    pub fn reserve(
        &mut self,
        allocator: &dyn Allocator,
        additional: usize,
    ) -> Result<(), AllocError> {
        memory::reserve(&mut self.values, allocator, additional)
    }

    /// Component at a slot known to be valid.
    #[inline]
    pub(crate) fn at(&self, slot: usize) -> &C {
        &self.values[slot]
    }

    /// Mutable component at a slot known to be valid.
    #[inline]
    pub(crate) fn at_mut(&mut self, slot: usize) -> &mut C {
        &mut self.values[slot]
    }
}

impl<C> Default for Column<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FixedAllocator, GlobalAllocator};

    #[test]
    fn test_slots_follow_append_order() {
        let mut column = Column::new();
        assert!(column.is_empty());

        assert_eq!(column.push("a"), 0);
        assert_eq!(column.push("b"), 1);
        assert_eq!(column.len(), 2);
        assert_eq!(column.get(1), Some(&"b"));
        assert_eq!(column.get(2), None);
        assert_eq!(column.as_slice(), &["a", "b"]);
    }

    #[test]
    fn test_at_mut_writes_through() {
        let mut column = Column::new();
        let slot = column.push(10_u32);
        *column.at_mut(slot) += 5;
        assert_eq!(*column.at(slot), 15);
    }

    #[test]
    fn test_reserve_respects_allocator() {
        let mut column: Column<u64> = Column::new();
        let alloc = FixedAllocator::new(1);

        column.reserve(&alloc, 1).unwrap();
        column.push(7);
        assert!(column.reserve(&alloc, 1).is_err());
        assert_eq!(column.len(), 1);

        column.reserve(&GlobalAllocator, 1).unwrap();
        assert!(column.capacity() >= 2);
    }
}
