//! # Typed Queries
//!
//! A query is a tuple of component types. Matching is a superset test of the
//! entity's presence mask against the query mask; fetching reads each
//! component through the slot number stored in the entity record, so no
//! column is scanned.

use super::component::Component;
use super::entity::ComponentMask;
use super::schema::Schema;

/// A tuple of component types read together.
///
/// Implemented for tuples of 1 to 8 components.
///
/// # Example
///
/// ```rust,ignore
/// for (entity, (position, tag)) in store.query::<(Position, Tag)>() {
///     println!("{} at {position:?} tagged {tag:?}", entity.id());
/// }
/// ```
pub trait Query<S: Schema>: 'static {
    /// References to the fetched components.
    type Item<'a>;

    /// Kinds an entity must own to match.
    const MASK: ComponentMask;

    /// Fetches the components of a record that matches [`Self::MASK`].
    #[doc(hidden)]
    fn fetch<'a>(tables: &'a S::Tables, slots: &S::Slots) -> Self::Item<'a>;
}

macro_rules! impl_query {
    ($($name:ident),+) => {
        impl<S: Schema, $($name: Component<S>),+> Query<S> for ($($name,)+) {
            type Item<'a> = ($(&'a $name,)+);

            const MASK: ComponentMask =
                ComponentMask::EMPTY $(.with(<$name as Component<S>>::INDEX))+;

            #[inline]
            fn fetch<'a>(tables: &'a S::Tables, slots: &S::Slots) -> Self::Item<'a> {
                let slots = slots.as_ref();
                ($(
                    <$name as Component<S>>::column(tables)
                        .at(slots[<$name as Component<S>>::INDEX]),
                )+)
            }
        }
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);
impl_query!(A, B, C, D, E);
impl_query!(A, B, C, D, E, F);
impl_query!(A, B, C, D, E, F, G);
impl_query!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Kind {
        Position,
        Tag,
    }

    #[derive(Debug, PartialEq)]
    struct Position(i32, i32);

    #[derive(Debug, PartialEq)]
    struct Tag;

    crate::entity_schema! {
        /// Schema under test.
        struct TestSchema<Kind> {
            tables: TestTables,
            positions: Position = Kind::Position,
            tags: Tag = Kind::Tag,
        }
    }

    #[test]
    fn test_query_mask() {
        assert_eq!(
            <(Tag,) as Query<TestSchema>>::MASK,
            ComponentMask::bit(1)
        );
        assert_eq!(<(Position, Tag) as Query<TestSchema>>::MASK.len(), 2);
    }

    #[test]
    fn test_fetch_follows_slots() {
        let mut tables = TestTables::default();
        tables.positions.push(Position(1, 2));
        tables.positions.push(Position(3, 4));
        tables.tags.push(Tag);

        let slots = [1, 0];
        let (position, tag) = <(Position, Tag) as Query<TestSchema>>::fetch(&tables, &slots);
        assert_eq!(position, &Position(3, 4));
        assert_eq!(tag, &Tag);
    }
}
