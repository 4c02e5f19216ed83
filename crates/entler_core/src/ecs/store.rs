//! # Entity Store
//!
//! The central container for all entities and components of one schema.
//!
//! ## Layout
//!
//! ```text
//! records: [e0][e1][e2 †][e3]        († = tombstone)
//!           │    │         │
//! tables:   │    └──┐      │
//!   positions [p0][p1][p2][p3]      slot numbers live in the records
//!   tags          [t0]    [t1]
//! ```
//!
//! Removing an entity tombstones its record; component slots are never
//! reclaimed. [`EntityStore::vacuum`] drops tombstoned records from the
//! entity table and pushes the new positions of the moved records to their
//! handles.

use std::fmt;
use std::rc::Weak;

use tracing::{debug, trace};

use super::component::{Bundle, Component};
use super::entity::{ComponentMask, EntityId, EntityRecord};
use super::handle::{EntityHandle, StoreId};
use super::observer::{EntityObserver, Subscription};
use super::query::Query;
use super::schema::{ComponentTables, Schema};
use crate::error::{StoreError, StoreResult};
use crate::memory::{self, Allocator, GlobalAllocator};

/// Result of a [`EntityStore::vacuum`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VacuumStats {
    /// Tombstoned records dropped from the entity table.
    pub removed: usize,
    /// Live records that moved to a new position.
    pub relocated: usize,
}

#[derive(Clone, Copy, Debug)]
enum Notification {
    Added,
    Removed,
}

/// An entity-component store over the schema `S`.
///
/// The store exclusively owns the entity table and one column per kind.
/// Handles and observers only hold weak back-references to it.
///
/// # Example
///
/// ```rust,ignore
/// let mut store = EntityStore::<DemoSchema>::new();
///
/// let a = store.add_entity((Position { x: 1, y: 2 },))?.id();
/// let b = store.add_entity((Position { x: 3, y: 4 }, Tag))?.id();
///
/// let tagged: Vec<_> = store.query::<(Position, Tag)>().map(|(e, _)| e.id()).collect();
/// assert_eq!(tagged, vec![b]);
///
/// store.remove_entity(a)?;
/// assert_eq!(store.len(), 1);
/// ```
pub struct EntityStore<S: Schema> {
    /// Identity checked when resolving handles.
    id: StoreId,
    /// The entity table, ordered by entity id.
    records: Vec<EntityRecord<S>>,
    /// One column per kind.
    tables: S::Tables,
    /// Subscribed observers, in registration order.
    observers: Vec<Subscription<S>>,
    /// Growth policy for every table.
    allocator: Box<dyn Allocator>,
    /// Raw value of the next entity id.
    next_id: u64,
    /// Number of live records.
    alive_count: usize,
}

impl<S: Schema> EntityStore<S> {
    /// Creates an empty store growing on the process allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(Box::new(GlobalAllocator))
    }

    /// Creates an empty store using `allocator` for every table.
    ///
    /// The allocator's initial capacity is reserved for the entity table and
    /// every column before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Allocation`] if the initial reservation fails.
    pub fn with_allocator<A: Allocator + 'static>(allocator: A) -> StoreResult<Self> {
        let mut store = Self::from_parts(Box::new(allocator));
        let initial = store.allocator.initial_capacity();
        if initial > 0 {
            memory::reserve(&mut store.records, &*store.allocator, initial)?;
            store.tables.reserve_all(&*store.allocator, initial)?;
        }
        debug!(
            schema = S::NAME,
            allocator = ?store.allocator,
            initial,
            "entity store created"
        );
        Ok(store)
    }

    fn from_parts(allocator: Box<dyn Allocator>) -> Self {
        Self {
            id: StoreId::next(),
            records: Vec::new(),
            tables: S::Tables::default(),
            observers: Vec::new(),
            allocator,
            next_id: 0,
            alive_count: 0,
        }
    }

    // =========================================================================
    // Adding and removing
    // =========================================================================

    /// Adds an entity owning exactly the components of `bundle`.
    ///
    /// Observers are notified after the entity is fully in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Allocation`] if the allocator refuses to grow
    /// the entity table or a touched column. The store is left unchanged and
    /// no entity id is consumed.
    pub fn add_entity<B: Bundle<S>>(&mut self, bundle: B) -> StoreResult<EntityMut<'_, S>> {
        let () = B::VALID;

        if let Err(err) = self.reserve_for::<B>() {
            debug!(schema = S::NAME, error = %err, "entity add refused by allocator");
            return Err(err);
        }

        let id = EntityId::from_raw(self.next_id);
        self.next_id += 1;

        let mut record = EntityRecord::new(id);
        record.mask = B::MASK;
        bundle.insert(&mut self.tables, &mut record.slots);

        let index = self.records.len();
        self.records.push(record);
        self.alive_count += 1;
        trace!(entity = %id, kinds = B::LEN, "entity added");

        self.notify(index, Notification::Added);
        Ok(EntityMut { store: self, index })
    }

    fn reserve_for<B: Bundle<S>>(&mut self) -> StoreResult<()> {
        memory::reserve(&mut self.records, &*self.allocator, 1)?;
        B::reserve(&mut self.tables, &*self.allocator)
    }

    /// Removes a live entity.
    ///
    /// Observers see the entity before anything changes; then every handle
    /// pointing at it is unlinked and its record is tombstoned. Component
    /// slots are not reclaimed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidEntity`] if `id` is unknown or was
    /// already removed.
    pub fn remove_entity(&mut self, id: EntityId) -> StoreResult<()> {
        let index = self.index_of(id).ok_or(StoreError::InvalidEntity(id))?;
        self.remove_at(index);
        Ok(())
    }

    fn remove_at(&mut self, index: usize) -> EntityId {
        self.notify(index, Notification::Removed);

        let record = &mut self.records[index];
        record.handles.sever();
        record.alive = false;
        self.alive_count -= 1;
        trace!(entity = %record.id, "entity removed");
        record.id
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Gets a live entity by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidEntity`] if `id` is unknown or removed.
    pub fn entity(&self, id: EntityId) -> StoreResult<EntityRef<'_, S>> {
        let index = self.index_of(id).ok_or(StoreError::InvalidEntity(id))?;
        Ok(self.entity_at(index))
    }

    /// Gets a live entity by id, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidEntity`] if `id` is unknown or removed.
    pub fn entity_mut(&mut self, id: EntityId) -> StoreResult<EntityMut<'_, S>> {
        let index = self.index_of(id).ok_or(StoreError::InvalidEntity(id))?;
        Ok(self.entity_at_mut(index))
    }

    /// Checks whether `id` names a live entity.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.index_of(id).is_some()
    }

    /// Entity-table position of a live entity. Ids stay sorted across
    /// vacuums, so the table can be binary searched.
    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.records
            .binary_search_by_key(&id, |record| record.id)
            .ok()
            .filter(|&index| self.records[index].alive)
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    /// Iterates over every live entity in entity-table order.
    pub fn entities(&self) -> impl Iterator<Item = EntityRef<'_, S>> + '_ {
        self.live_indices(ComponentMask::EMPTY)
            .map(move |index| self.entity_at(index))
    }

    /// Visits every live entity in entity-table order.
    pub fn for_each_entity(&self, visit: impl FnMut(EntityRef<'_, S>)) {
        self.entities().for_each(visit);
    }

    /// Visits every live entity mutably, in entity-table order.
    ///
    /// The visitor may remove the entity it is given.
    pub fn for_each_entity_mut(&mut self, visit: impl FnMut(EntityMut<'_, S>)) {
        self.visit_mut(ComponentMask::EMPTY, visit);
    }

    /// Visits every live entity owning all of `kinds`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownKind`] before visiting anything if a
    /// kind is not declared by the schema.
    pub fn for_each_entity_with(
        &self,
        kinds: &[S::Kind],
        mut visit: impl FnMut(EntityRef<'_, S>),
    ) -> StoreResult<()> {
        let mask = S::mask_of(kinds)?;
        for index in self.live_indices(mask) {
            visit(self.entity_at(index));
        }
        Ok(())
    }

    /// Visits every live entity owning all of `kinds`, mutably.
    ///
    /// # Errors
    ///
    /// Same as [`EntityStore::for_each_entity_with`].
    pub fn for_each_entity_with_mut(
        &mut self,
        kinds: &[S::Kind],
        visit: impl FnMut(EntityMut<'_, S>),
    ) -> StoreResult<()> {
        let mask = S::mask_of(kinds)?;
        self.visit_mut(mask, visit);
        Ok(())
    }

    /// Iterates over every live entity owning all components of `Q`,
    /// together with references to those components.
    pub fn query<Q: Query<S>>(&self) -> impl Iterator<Item = (EntityRef<'_, S>, Q::Item<'_>)> + '_ {
        self.live_indices(Q::MASK).map(move |index| {
            let components = Q::fetch(&self.tables, &self.records[index].slots);
            (self.entity_at(index), components)
        })
    }

    /// Visits every live entity owning all components of `Q`, mutably.
    pub fn for_each_matching_mut<Q: Query<S>>(&mut self, visit: impl FnMut(EntityMut<'_, S>)) {
        self.visit_mut(Q::MASK, visit);
    }

    fn live_indices(&self, mask: ComponentMask) -> impl Iterator<Item = usize> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(move |(_, record)| record.alive && record.mask.contains_all(mask))
            .map(|(index, _)| index)
    }

    fn visit_mut(&mut self, mask: ComponentMask, mut visit: impl FnMut(EntityMut<'_, S>)) {
        for index in 0..self.records.len() {
            let record = &self.records[index];
            if record.alive && record.mask.contains_all(mask) {
                visit(self.entity_at_mut(index));
            }
        }
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Drops tombstoned records from the entity table.
    ///
    /// Live records keep their relative order; every handle of a record that
    /// moves receives its new position. Component columns are not compacted,
    /// so slot numbers are unchanged.
    pub fn vacuum(&mut self) -> VacuumStats {
        let before = self.records.len();
        let mut write = 0;
        let mut relocated = 0;

        for read in 0..before {
            if !self.records[read].alive {
                continue;
            }
            if read != write {
                self.records.swap(read, write);
                self.records[write].handles.relocate(write);
                relocated += 1;
            }
            write += 1;
        }
        self.records.truncate(write);

        let stats = VacuumStats {
            removed: before - write,
            relocated,
        };
        debug!(
            schema = S::NAME,
            removed = stats.removed,
            relocated = stats.relocated,
            "entity table vacuumed"
        );
        stats
    }

    // =========================================================================
    // Observers
    // =========================================================================

    pub(crate) fn subscribe(&mut self, observer: Subscription<S>) {
        self.observers.push(observer);
    }

    /// Returns the number of observers still subscribed.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers
            .iter()
            .filter(|observer| observer.strong_count() > 0)
            .count()
    }

    fn notify(&mut self, index: usize, notification: Notification) {
        self.observers.retain(|observer| observer.strong_count() > 0);

        let entity = EntityRef { store: self, index };
        for observer in self.observers.iter().filter_map(Weak::upgrade) {
            let Ok(mut guard) = observer.try_borrow_mut() else {
                panic!(
                    "observer of {} is borrowed during {notification:?} notification",
                    S::NAME
                );
            };
            match notification {
                Notification::Added => EntityObserver::entity_added(&mut *guard, entity),
                Notification::Removed => EntityObserver::entity_removed(&mut *guard, entity),
            }
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the number of live entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.alive_count
    }

    /// Checks whether the store holds no live entity.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alive_count == 0
    }

    /// Returns the number of records in the entity table, tombstones included.
    #[inline]
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Returns the number of tombstoned records awaiting a vacuum.
    #[inline]
    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.records.len() - self.alive_count
    }

    /// Returns the id the next added entity will receive.
    #[inline]
    #[must_use]
    pub fn next_id(&self) -> EntityId {
        EntityId::from_raw(self.next_id)
    }

    /// Returns the number of kinds declared by the schema.
    #[inline]
    #[must_use]
    pub fn kind_count(&self) -> usize {
        S::kind_count()
    }

    /// Returns the number of slots used in the column of `kind`.
    #[must_use]
    pub fn column_len(&self, kind: S::Kind) -> Option<usize> {
        S::find_kind(kind).and_then(|index| self.tables.column_len(index))
    }

    /// Returns the component columns.
    ///
    /// Columns also hold the components of removed entities; go through
    /// entities to read only live data.
    #[inline]
    #[must_use]
    pub fn tables(&self) -> &S::Tables {
        &self.tables
    }

    /// Returns the store's growth policy.
    #[must_use]
    pub fn allocator(&self) -> &dyn Allocator {
        &*self.allocator
    }

    // =========================================================================
    // Crate internals
    // =========================================================================

    pub(crate) fn store_id(&self) -> StoreId {
        self.id
    }

    pub(crate) fn record(&self, index: usize) -> &EntityRecord<S> {
        &self.records[index]
    }

    pub(crate) fn entity_at(&self, index: usize) -> EntityRef<'_, S> {
        EntityRef { store: self, index }
    }

    pub(crate) fn entity_at_mut(&mut self, index: usize) -> EntityMut<'_, S> {
        EntityMut { store: self, index }
    }
}

impl<S: Schema> Default for EntityStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Schema> Drop for EntityStore<S> {
    fn drop(&mut self) {
        for record in &self.records {
            record.handles.sever();
        }
    }
}

impl<S: Schema> fmt::Debug for EntityStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStore")
            .field("schema", &S::NAME)
            .field("alive", &self.alive_count)
            .field("records", &self.records.len())
            .field("next_id", &self.next_id)
            .field("observers", &self.observer_count())
            .field("allocator", &self.allocator)
            .finish()
    }
}

fn missing_component<S: Schema, C: Component<S>>(id: EntityId) -> StoreError {
    StoreError::MissingComponent {
        entity: id,
        kind: format!("{:?}", C::KIND),
    }
}

// =============================================================================
// Entity references
// =============================================================================

/// Shared access to one live entity.
pub struct EntityRef<'a, S: Schema> {
    store: &'a EntityStore<S>,
    index: usize,
}

impl<S: Schema> Clone for EntityRef<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Schema> Copy for EntityRef<'_, S> {}

impl<'a, S: Schema> EntityRef<'a, S> {
    #[inline]
    fn record(&self) -> &'a EntityRecord<S> {
        &self.store.records[self.index]
    }

    /// Returns the entity's id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.record().id
    }

    /// Returns the kinds the entity owns.
    #[inline]
    #[must_use]
    pub fn mask(&self) -> ComponentMask {
        self.record().mask
    }

    /// Checks whether the entity owns a `C`.
    #[inline]
    #[must_use]
    pub fn has_component<C: Component<S>>(&self) -> bool {
        self.record().mask.contains(C::INDEX)
    }

    /// Checks whether the entity owns a component of `kind`.
    ///
    /// Kinds not declared by the schema are never owned.
    #[must_use]
    pub fn has_kind(&self, kind: S::Kind) -> bool {
        S::find_kind(kind).is_some_and(|index| self.record().mask.contains(index))
    }

    /// Checks whether the entity owns every kind of `mask`.
    #[inline]
    #[must_use]
    pub fn has_components(&self, mask: ComponentMask) -> bool {
        self.record().mask.contains_all(mask)
    }

    /// Gets the entity's `C`.
    ///
    /// # Panics
    ///
    /// Panics if the entity does not own a `C`; check with
    /// [`EntityRef::has_component`] or use [`EntityRef::try_get_component`].
    #[must_use]
    pub fn get_component<C: Component<S>>(&self) -> &'a C {
        match self.try_get_component::<C>() {
            Ok(component) => component,
            Err(err) => panic!("{err}"),
        }
    }

    /// Gets the entity's `C`, if it owns one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingComponent`] if it does not.
    pub fn try_get_component<C: Component<S>>(&self) -> StoreResult<&'a C> {
        let record = self.record();
        let slot = record
            .slot(C::INDEX)
            .ok_or_else(|| missing_component::<S, C>(record.id))?;
        Ok(C::column(&self.store.tables).at(slot))
    }

    /// Gets every component of `Q`, if the entity owns them all.
    #[must_use]
    pub fn components<Q: Query<S>>(&self) -> Option<Q::Item<'a>> {
        let record = self.record();
        record
            .mask
            .contains_all(Q::MASK)
            .then(|| Q::fetch(&self.store.tables, &record.slots))
    }

    /// Creates a handle to this entity.
    #[must_use]
    pub fn handle(&self) -> EntityHandle<S> {
        EntityHandle::attach(self.store, self.index)
    }

    /// Returns the number of handles currently linked to this entity.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.record().handles.live_count()
    }

    pub(crate) fn store(&self) -> &'a EntityStore<S> {
        self.store
    }

    pub(crate) fn entity_index(&self) -> usize {
        self.index
    }
}

impl<S: Schema> fmt::Debug for EntityRef<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRef")
            .field("id", &self.id())
            .field("mask", &self.mask())
            .finish()
    }
}

/// Exclusive access to one live entity.
pub struct EntityMut<'a, S: Schema> {
    store: &'a mut EntityStore<S>,
    index: usize,
}

impl<'a, S: Schema> EntityMut<'a, S> {
    /// Returns shared access to the entity.
    #[inline]
    #[must_use]
    pub fn entity_ref(&self) -> EntityRef<'_, S> {
        EntityRef {
            store: self.store,
            index: self.index,
        }
    }

    /// Converts into shared access for the rest of the borrow.
    #[inline]
    #[must_use]
    pub fn into_ref(self) -> EntityRef<'a, S> {
        EntityRef {
            store: self.store,
            index: self.index,
        }
    }

    /// Returns the entity's id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.entity_ref().id()
    }

    /// Returns the kinds the entity owns.
    #[inline]
    #[must_use]
    pub fn mask(&self) -> ComponentMask {
        self.entity_ref().mask()
    }

    /// Checks whether the entity owns a `C`.
    #[inline]
    #[must_use]
    pub fn has_component<C: Component<S>>(&self) -> bool {
        self.entity_ref().has_component::<C>()
    }

    /// Checks whether the entity owns a component of `kind`.
    #[must_use]
    pub fn has_kind(&self, kind: S::Kind) -> bool {
        self.entity_ref().has_kind(kind)
    }

    /// Checks whether the entity owns every kind of `mask`.
    #[must_use]
    pub fn has_components(&self, mask: ComponentMask) -> bool {
        self.entity_ref().has_components(mask)
    }

    /// Gets the entity's `C`.
    ///
    /// # Panics
    ///
    /// Panics if the entity does not own a `C`.
    #[must_use]
    pub fn get_component<C: Component<S>>(&self) -> &C {
        self.entity_ref().get_component::<C>()
    }

    /// Gets the entity's `C`, if it owns one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingComponent`] if it does not.
    pub fn try_get_component<C: Component<S>>(&self) -> StoreResult<&C> {
        self.entity_ref().try_get_component::<C>()
    }

    /// Gets the entity's `C` mutably.
    ///
    /// # Panics
    ///
    /// Panics if the entity does not own a `C`.
    #[must_use]
    pub fn get_component_mut<C: Component<S>>(&mut self) -> &mut C {
        match self.try_get_component_mut::<C>() {
            Ok(component) => component,
            Err(err) => panic!("{err}"),
        }
    }

    /// Gets the entity's `C` mutably, if it owns one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingComponent`] if it does not.
    pub fn try_get_component_mut<C: Component<S>>(&mut self) -> StoreResult<&mut C> {
        let record = &self.store.records[self.index];
        let slot = record
            .slot(C::INDEX)
            .ok_or_else(|| missing_component::<S, C>(record.id))?;
        Ok(C::column_mut(&mut self.store.tables).at_mut(slot))
    }

    /// Gets every component of `Q`, if the entity owns them all.
    #[must_use]
    pub fn components<Q: Query<S>>(&self) -> Option<Q::Item<'_>> {
        self.entity_ref().components::<Q>()
    }

    /// Creates a handle to this entity.
    #[must_use]
    pub fn handle(&self) -> EntityHandle<S> {
        self.entity_ref().handle()
    }

    /// Removes the entity, returning its id.
    ///
    /// See [`EntityStore::remove_entity`].
    pub fn remove(self) -> EntityId {
        self.store.remove_at(self.index)
    }
}

impl<S: Schema> fmt::Debug for EntityMut<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.entity_ref(), f)
    }
}
