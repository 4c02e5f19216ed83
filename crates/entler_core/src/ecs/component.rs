//! # Component System
//!
//! Components are plain data bound to exactly one kind of a schema. The
//! binding is generated by [`entity_schema!`](crate::entity_schema), so the
//! kind index of every component type is a compile-time constant and
//! component access never goes through dynamic dispatch.

use super::entity::ComponentMask;
use super::schema::Schema;
use super::storage::Column;
use crate::error::StoreResult;
use crate::memory::Allocator;

/// Binds a component type to one kind of schema `S`.
///
/// Implementations are generated by [`entity_schema!`](crate::entity_schema).
pub trait Component<S: Schema>: Sized + 'static {
    /// The kind this component type is stored under.
    const KIND: S::Kind;

    /// Dense index of [`Self::KIND`] in `S::KINDS`.
    const INDEX: usize;

    /// Returns this component's column.
    fn column(tables: &S::Tables) -> &Column<Self>;

    /// Returns this component's column mutably.
    fn column_mut(tables: &mut S::Tables) -> &mut Column<Self>;
}

/// A tuple of component values added together as one entity.
///
/// Implemented for tuples of 1 to 8 components. The empty tuple is not a
/// bundle, and a bundle naming the same kind twice fails to compile when it
/// is first passed to [`EntityStore::add_entity`](super::EntityStore::add_entity).
///
/// # Example
///
/// ```rust,ignore
/// store.add_entity((Position { x: 3, y: 4 }, Tag))?;
/// store.add_entity((Position { x: 1, y: 2 },))?;
/// ```
pub trait Bundle<S: Schema>: Sized + 'static {
    /// Kinds contained in the bundle.
    const MASK: ComponentMask;

    /// Number of components in the bundle.
    const LEN: usize;

    /// Evaluates to `()` only if the bundle has no duplicate kinds.
    #[doc(hidden)]
    const VALID: ();

    /// Reserves one slot in every column the bundle touches.
    #[doc(hidden)]
    fn reserve(tables: &mut S::Tables, allocator: &dyn Allocator) -> StoreResult<()>;

    /// Appends every component, recording slot numbers in `slots`.
    #[doc(hidden)]
    fn insert(self, tables: &mut S::Tables, slots: &mut S::Slots);
}

macro_rules! impl_bundle {
    ($($name:ident),+) => {
        impl<S: Schema, $($name: Component<S>),+> Bundle<S> for ($($name,)+) {
            const MASK: ComponentMask =
                ComponentMask::EMPTY $(.with(<$name as Component<S>>::INDEX))+;

            const LEN: usize = [$(stringify!($name)),+].len();

            const VALID: () = assert!(
                Self::MASK.len() == Self::LEN,
                "component bundle contains the same kind more than once"
            );

            fn reserve(tables: &mut S::Tables, allocator: &dyn Allocator) -> StoreResult<()> {
                $(<$name as Component<S>>::column_mut(tables).reserve(allocator, 1)?;)+
                Ok(())
            }

            #[allow(non_snake_case)]
            fn insert(self, tables: &mut S::Tables, slots: &mut S::Slots) {
                let ($($name,)+) = self;
                $(
                    slots.as_mut()[<$name as Component<S>>::INDEX] =
                        <$name as Component<S>>::column_mut(tables).push($name);
                )+
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::schema::SlotArray;
    use crate::memory::GlobalAllocator;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Kind {
        Health,
        Armor,
        Name,
    }

    #[derive(Debug, PartialEq)]
    struct Health(u32);

    #[derive(Debug, PartialEq)]
    struct Armor(u32);

    #[derive(Debug, PartialEq)]
    struct Name(&'static str);

    crate::entity_schema! {
        /// Schema under test.
        struct TestSchema<Kind> {
            tables: TestTables,
            health: Health = Kind::Health,
            armor: Armor = Kind::Armor,
            names: Name = Kind::Name,
        }
    }

    #[test]
    fn test_bundle_mask_and_len() {
        type Pair = (Health, Name);
        assert_eq!(<Pair as Bundle<TestSchema>>::LEN, 2);
        let mask = <Pair as Bundle<TestSchema>>::MASK;
        assert!(mask.contains(0));
        assert!(!mask.contains(1));
        assert!(mask.contains(2));
    }

    #[test]
    fn test_bundle_insert_records_slots() {
        let mut tables = TestTables::default();
        let mut slots = <TestSchema as Schema>::Slots::empty();

        <(Armor,) as Bundle<TestSchema>>::reserve(&mut tables, &GlobalAllocator).unwrap();
        <(Armor,) as Bundle<TestSchema>>::insert((Armor(1),), &mut tables, &mut slots);

        let bundle = (Name("ogre"), Armor(5));
        <(Name, Armor) as Bundle<TestSchema>>::reserve(&mut tables, &GlobalAllocator).unwrap();
        <(Name, Armor) as Bundle<TestSchema>>::insert(bundle, &mut tables, &mut slots);

        assert_eq!(slots.as_ref()[1], 1);
        assert_eq!(slots.as_ref()[2], 0);
        assert_eq!(tables.armor.get(1), Some(&Armor(5)));
        assert_eq!(tables.names.get(0), Some(&Name("ogre")));
        assert!(tables.health.is_empty());
    }
}
