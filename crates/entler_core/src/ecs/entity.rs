//! # Entity Management
//!
//! Entities are identified by a monotonically increasing [`EntityId`] and
//! described by an [`EntityRecord`]:
//! - A presence mask over the schema's kinds
//! - One slot number per kind the entity owns
//! - The handles currently pointing at it

use std::fmt;

use super::handle::HandleList;
use super::schema::{Schema, SlotArray, MAX_KINDS};

/// Unique identifier for an entity.
///
/// Identifiers are handed out in strictly increasing order starting at 0 and
/// are never reused within the lifetime of a store. Unlike the position of
/// the entity's record in the entity table, the identifier never changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an entity ID from its raw value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Bit set over the dense kind indices of a schema.
///
/// Bit `i` is set iff the kind at index `i` is present.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// The mask with no kinds set.
    pub const EMPTY: Self = Self(0);

    /// Returns the mask containing only the kind at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= MAX_KINDS`.
    #[inline]
    #[must_use]
    pub const fn bit(index: usize) -> Self {
        assert!(index < MAX_KINDS, "kind index exceeds mask width");
        Self(1 << index)
    }

    /// Returns this mask with the kind at `index` added.
    #[inline]
    #[must_use]
    pub const fn with(self, index: usize) -> Self {
        Self(self.0 | Self::bit(index).0)
    }

    /// Returns the union of two masks.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Checks whether the kind at `index` is present.
    #[inline]
    #[must_use]
    pub const fn contains(self, index: usize) -> bool {
        index < MAX_KINDS && (self.0 >> index) & 1 == 1
    }

    /// Checks whether every kind of `other` is present (superset match).
    #[inline]
    #[must_use]
    pub const fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the number of kinds present.
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Checks whether no kind is present.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Iterates over the indices of the kinds present, in ascending order.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let index = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            Some(index)
        })
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMask({:#b})", self.0)
    }
}

/// One row of the entity table.
pub(crate) struct EntityRecord<S: Schema> {
    /// External identity of the entity.
    pub(crate) id: EntityId,
    /// Kinds owned by the entity.
    pub(crate) mask: ComponentMask,
    /// Slot number per kind; meaningful only where `mask` is set.
    pub(crate) slots: S::Slots,
    /// Cleared when the entity is removed.
    pub(crate) alive: bool,
    /// Handles attached to this record.
    pub(crate) handles: HandleList,
}

impl<S: Schema> EntityRecord<S> {
    /// Creates a live record owning no components yet.
    pub(crate) fn new(id: EntityId) -> Self {
        Self {
            id,
            mask: ComponentMask::EMPTY,
            slots: S::Slots::empty(),
            alive: true,
            handles: HandleList::default(),
        }
    }

    /// Returns the slot number of the kind at `index`, if owned.
    #[inline]
    pub(crate) fn slot(&self, index: usize) -> Option<usize> {
        if self.alive && self.mask.contains(index) {
            Some(self.slots.as_ref()[index])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_roundtrip() {
        let id = EntityId::from_raw(12345);
        assert_eq!(id.raw(), 12345);
        assert_eq!(id.to_string(), "entity#12345");
    }

    #[test]
    fn test_entity_id_ordering() {
        assert!(EntityId::from_raw(1) < EntityId::from_raw(2));
    }

    #[test]
    fn test_mask_bits() {
        let mask = ComponentMask::EMPTY.with(0).with(5);
        assert!(mask.contains(0));
        assert!(mask.contains(5));
        assert!(!mask.contains(1));
        assert!(!mask.contains(MAX_KINDS));
        assert_eq!(mask.len(), 2);
        assert_eq!(mask.indices().collect::<Vec<_>>(), vec![0, 5]);
    }

    #[test]
    fn test_mask_superset_match() {
        let entity = ComponentMask::bit(0).union(ComponentMask::bit(1));
        let query = ComponentMask::bit(1);
        assert!(entity.contains_all(query));
        assert!(!query.contains_all(entity));
        assert!(entity.contains_all(ComponentMask::EMPTY));
    }

    #[test]
    fn test_mask_with_is_idempotent() {
        let mask = ComponentMask::bit(3);
        assert_eq!(mask.with(3), mask);
        assert_eq!(mask.with(3).len(), 1);
    }

    #[test]
    #[should_panic(expected = "kind index exceeds mask width")]
    fn test_mask_bit_out_of_range() {
        let _ = ComponentMask::bit(MAX_KINDS);
    }
}
