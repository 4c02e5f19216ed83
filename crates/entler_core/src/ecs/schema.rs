//! # Component Schemas
//!
//! A schema is the closed, ordered set of component kinds one store
//! supports. It is fixed at compile time:
//!
//! - Every kind gets a dense index in `[0, kind_count)` from its position
//! - Every kind is bound to exactly one component type
//! - Duplicate kinds and oversized schemas are rejected by `const` assertions
//!
//! Schemas are declared with [`entity_schema!`](crate::entity_schema).

use std::fmt;

use super::entity::ComponentMask;
use crate::error::{StoreError, StoreResult};
use crate::memory::{AllocError, Allocator};

/// Maximum number of kinds in one schema (the width of [`ComponentMask`]).
pub const MAX_KINDS: usize = 64;

/// The compile-time description of a store's component universe.
///
/// Implemented by the zero-sized type generated by
/// [`entity_schema!`](crate::entity_schema); hand-written implementations
/// must keep `KINDS`, `Tables` and `Slots` consistent with each other.
pub trait Schema: Sized + 'static {
    /// The kind identifier type (usually a field-less enum).
    type Kind: Copy + Eq + fmt::Debug + 'static;

    /// One [`Column`](super::Column) per kind.
    type Tables: ComponentTables + 'static;

    /// Fixed-size slot number array with one entry per kind.
    type Slots: SlotArray;

    /// Human-readable schema name, used in diagnostics.
    const NAME: &'static str;

    /// The declared kinds in dense index order.
    const KINDS: &'static [Self::Kind];

    /// Returns the number of declared kinds.
    #[inline]
    #[must_use]
    fn kind_count() -> usize {
        Self::KINDS.len()
    }

    /// Returns the dense index of `kind`, or `None` if it is not declared.
    #[must_use]
    fn find_kind(kind: Self::Kind) -> Option<usize> {
        Self::KINDS.iter().position(|declared| *declared == kind)
    }

    /// Returns the kind at dense index `index`.
    #[inline]
    #[must_use]
    fn kind_at(index: usize) -> Option<Self::Kind> {
        Self::KINDS.get(index).copied()
    }

    /// Builds the presence mask of a runtime list of kinds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownKind`] if any kind is not declared.
    fn mask_of(kinds: &[Self::Kind]) -> StoreResult<ComponentMask> {
        kinds.iter().try_fold(ComponentMask::EMPTY, |mask, &kind| {
            Self::find_kind(kind)
                .map(|index| mask.with(index))
                .ok_or_else(|| StoreError::UnknownKind {
                    kind: format!("{kind:?}"),
                    schema: Self::NAME,
                })
        })
    }
}

/// The set of component columns owned by a store.
pub trait ComponentTables: Default {
    /// Returns the length of the column at dense kind index `index`.
    fn column_len(&self, index: usize) -> Option<usize>;

    /// Makes room for `additional` components in every column.
    ///
    /// # Errors
    ///
    /// Returns the first refusal of `allocator`.
    fn reserve_all(&mut self, allocator: &dyn Allocator, additional: usize)
        -> Result<(), AllocError>;
}

/// Per-record slot number storage, sized to the schema.
pub trait SlotArray: Copy + fmt::Debug + AsRef<[usize]> + AsMut<[usize]> + 'static {
    /// Returns an array with every slot set to zero.
    fn empty() -> Self;
}

impl<const N: usize> SlotArray for [usize; N] {
    #[inline]
    fn empty() -> Self {
        [0; N]
    }
}

/// Checks that a list of raw kind identifiers contains no duplicates.
#[doc(hidden)]
#[must_use]
pub const fn distinct_kind_ids(ids: &[u64]) -> bool {
    let mut i = 0;
    while i < ids.len() {
        let mut j = i + 1;
        while j < ids.len() {
            if ids[i] == ids[j] {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

/// Declares a schema: its kind list, component tables and component bindings.
///
/// Kinds must be castable with `as u64` (field-less enum variants or
/// integer constants). Each entry names the generated column field, the
/// component type stored in it, and the kind it is bound to.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// pub enum Kind { Position, Tag }
///
/// entler_core::entity_schema! {
///     /// Schema used by the demo.
///     pub struct DemoSchema<Kind> {
///         tables: DemoTables,
///         positions: Position = Kind::Position,
///         tags: Tag = Kind::Tag,
///     }
/// }
/// ```
///
/// A kind listed twice fails to compile:
///
/// ```rust,ignore
/// entler_core::entity_schema! {
///     pub struct Broken<Kind> {
///         tables: BrokenTables,
///         positions: Position = Kind::Position,
///         others: Other = Kind::Position, // error: duplicate component kind
///     }
/// }
/// ```
#[macro_export]
macro_rules! entity_schema {
    (@count $($field:ident)+) => {
        0 $(+ $crate::entity_schema!(@one $field))+
    };

    (@one $field:ident) => {
        1
    };

    (@components $schema:ident [$($counter:tt)*]) => {};

    (@components $schema:ident [$($counter:tt)*]
        $field:ident : $component:ty = $kind_value:expr
        $(, $rest_field:ident : $rest_component:ty = $rest_kind:expr)*
    ) => {
        impl $crate::Component<$schema> for $component {
            const KIND: <$schema as $crate::Schema>::Kind = $kind_value;
            const INDEX: usize = 0 $(+ $counter)*;

            #[inline]
            fn column(tables: &<$schema as $crate::Schema>::Tables) -> &$crate::Column<Self> {
                &tables.$field
            }

            #[inline]
            fn column_mut(
                tables: &mut <$schema as $crate::Schema>::Tables,
            ) -> &mut $crate::Column<Self> {
                &mut tables.$field
            }
        }

        $crate::entity_schema!(@components $schema [$($counter)* 1]
            $($rest_field : $rest_component = $rest_kind),*);
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $schema:ident < $kind:ty > {
            tables: $tables:ident,
            $($field:ident : $component:ty = $kind_value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        $vis struct $schema;

        #[doc = concat!("Component columns of [`", stringify!($schema), "`].")]
        #[derive(Default)]
        $vis struct $tables {
            $(
                #[doc = concat!("Dense column of `", stringify!($component), "` components.")]
                pub $field: $crate::Column<$component>,
            )+
        }

        impl $crate::ComponentTables for $tables {
            fn column_len(&self, index: usize) -> ::core::option::Option<usize> {
                let lengths = [$(self.$field.len()),+];
                lengths.get(index).copied()
            }

            fn reserve_all(
                &mut self,
                allocator: &dyn $crate::memory::Allocator,
                additional: usize,
            ) -> ::core::result::Result<(), $crate::memory::AllocError> {
                $(self.$field.reserve(allocator, additional)?;)+
                ::core::result::Result::Ok(())
            }
        }

        impl $crate::Schema for $schema {
            type Kind = $kind;
            type Tables = $tables;
            type Slots = [usize; $crate::entity_schema!(@count $($field)+)];

            const NAME: &'static str = stringify!($schema);
            const KINDS: &'static [$kind] = &[$($kind_value),+];
        }

        const _: () = {
            let ids: &[u64] = &[$(($kind_value) as u64),+];
            assert!(
                ids.len() <= $crate::MAX_KINDS,
                "entity schema declares more kinds than a component mask can hold"
            );
            assert!(
                $crate::ecs::schema::distinct_kind_ids(ids),
                "duplicate component kind in entity schema"
            );
        };

        $crate::entity_schema!(@components $schema []
            $($field : $component = $kind_value),+);
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Component;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Kind {
        Position,
        Velocity,
        Tag,
        Unused,
    }

    #[derive(Debug, PartialEq)]
    struct Position(i32);

    #[derive(Debug, PartialEq)]
    struct Velocity(i32);

    #[derive(Debug, PartialEq)]
    struct Tag;

    crate::entity_schema! {
        /// Schema under test.
        struct TestSchema<Kind> {
            tables: TestTables,
            positions: Position = Kind::Position,
            velocities: Velocity = Kind::Velocity,
            tags: Tag = Kind::Tag,
        }
    }

    #[test]
    fn test_kind_indices_follow_declaration_order() {
        assert_eq!(<Position as Component<TestSchema>>::INDEX, 0);
        assert_eq!(<Velocity as Component<TestSchema>>::INDEX, 1);
        assert_eq!(<Tag as Component<TestSchema>>::INDEX, 2);
        assert_eq!(<Tag as Component<TestSchema>>::KIND, Kind::Tag);
    }

    #[test]
    fn test_kind_lookup() {
        assert_eq!(TestSchema::kind_count(), 3);
        assert_eq!(TestSchema::find_kind(Kind::Velocity), Some(1));
        assert_eq!(TestSchema::find_kind(Kind::Unused), None);
        assert_eq!(TestSchema::kind_at(2), Some(Kind::Tag));
        assert_eq!(TestSchema::kind_at(3), None);
        assert_eq!(TestSchema::NAME, "TestSchema");
    }

    #[test]
    fn test_slot_array_matches_kind_count() {
        let slots = <TestSchema as Schema>::Slots::empty();
        assert_eq!(slots.as_ref().len(), TestSchema::kind_count());
        assert!(slots.as_ref().iter().all(|&slot| slot == 0));
    }

    #[test]
    fn test_mask_of_kinds() {
        let mask = TestSchema::mask_of(&[Kind::Tag, Kind::Position]).unwrap();
        assert!(mask.contains(0));
        assert!(mask.contains(2));
        assert_eq!(mask.len(), 2);

        assert_eq!(TestSchema::mask_of(&[]).unwrap(), ComponentMask::EMPTY);
    }

    #[test]
    fn test_mask_of_unknown_kind() {
        let err = TestSchema::mask_of(&[Kind::Position, Kind::Unused]).unwrap_err();
        assert_eq!(
            err,
            StoreError::UnknownKind {
                kind: "Unused".to_owned(),
                schema: "TestSchema",
            }
        );
    }

    #[test]
    fn test_generated_tables_report_lengths() {
        let tables = TestTables::default();
        assert_eq!(tables.column_len(0), Some(0));
        assert_eq!(tables.velocities.len(), 0);
        assert_eq!(tables.column_len(3), None);
    }

    #[test]
    fn test_generated_tables_reserve_every_column() {
        let mut tables = TestTables::default();
        tables
            .reserve_all(&crate::memory::FixedAllocator::new(16), 16)
            .unwrap();
        assert!(tables.positions.capacity() >= 16);
        assert!(tables.tags.capacity() >= 16);
    }

    #[test]
    fn test_distinct_kind_ids() {
        assert!(distinct_kind_ids(&[0, 1, 2]));
        assert!(!distinct_kind_ids(&[0, 1, 0]));
        assert!(distinct_kind_ids(&[]));
    }
}
