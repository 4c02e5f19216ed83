//! # Entity Handles
//!
//! Weak, self-updating references to entities.
//!
//! ```text
//! EntityRecord.handles ──weak──▶ HandleNode ◀──strong── EntityHandle
//!                                 link: Some((store, entity_index))
//! ```
//!
//! The record keeps weak links to the nodes of every handle attached to it.
//! The store pushes changes through those links:
//! - on removal every node is severed (`link = None`)
//! - on relocation every node receives the new entity index
//!
//! A handle therefore never reads a stale position and never resolves to a
//! removed entity. Dropping or resetting a handle detaches it in O(1); its
//! dead weak link is pruned the next time the record's list grows.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::schema::Schema;
use super::store::{EntityMut, EntityRef, EntityStore};
use crate::error::{StoreError, StoreResult};

/// Process-unique identity of one store instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct StoreId(u64);

impl StoreId {
    /// Allocates a fresh identity.
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where a linked handle points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Link {
    pub(crate) store: StoreId,
    pub(crate) entity_index: usize,
}

/// Shared state between a handle and the record it is attached to.
#[derive(Debug, Default)]
struct HandleNode {
    link: Cell<Option<Link>>,
}

impl HandleNode {
    /// Pushes a new entity-table position. The node must be linked.
    fn update_entity_index(&self, entity_index: usize) {
        let link = self.link.get();
        debug_assert!(link.is_some(), "relocating a detached handle");
        if let Some(link) = link {
            self.link.set(Some(Link {
                entity_index,
                ..link
            }));
        }
    }

    fn sever(&self) {
        self.link.set(None);
    }
}

/// The handles attached to one entity record.
#[derive(Default)]
pub(crate) struct HandleList {
    nodes: RefCell<Vec<Weak<HandleNode>>>,
}

impl HandleList {
    /// Attaches a node, pruning detached nodes when the list has to grow.
    fn attach(&self, node: &Rc<HandleNode>) {
        let mut nodes = self.nodes.borrow_mut();
        if nodes.len() == nodes.capacity() {
            nodes.retain(|weak| weak.strong_count() > 0);
        }
        nodes.push(Rc::downgrade(node));
    }

    /// Pushes `entity_index` to every attached handle.
    pub(crate) fn relocate(&self, entity_index: usize) {
        for node in self.nodes.borrow().iter().filter_map(Weak::upgrade) {
            node.update_entity_index(entity_index);
        }
    }

    /// Unlinks every attached handle and clears the list.
    pub(crate) fn sever(&self) {
        for node in self.nodes.borrow_mut().drain(..).filter_map(|weak| weak.upgrade()) {
            node.sever();
        }
    }

    /// Returns the number of handles still attached.
    pub(crate) fn live_count(&self) -> usize {
        self.nodes
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|node| node.link.get().is_some())
            .count()
    }
}

/// A weak reference to an entity that follows it through vacuums.
///
/// A handle is *linked* while its entity is alive. Removing the entity
/// unlinks every handle pointing at it; [`EntityStore::vacuum`] moves
/// records and updates every handle with the new position. Handles never
/// keep an entity or its components alive.
///
/// Handles are created from a live entity with [`EntityRef::handle`] or
/// [`EntityMut::handle`], and resolved against the store that created them.
/// `Default` yields an unlinked handle, so handles can be moved out of
/// containers with [`std::mem::take`].
///
/// # Example
///
/// ```rust,ignore
/// let handle = store.add_entity((Position { x: 1, y: 2 },))?.handle();
/// assert!(handle.is_linked());
///
/// store.remove_entity(handle.get(&store)?.id())?;
/// assert!(!handle.is_linked());
/// assert_eq!(handle.get(&store).unwrap_err(), StoreError::InvalidHandle);
/// ```
pub struct EntityHandle<S: Schema> {
    node: Rc<HandleNode>,
    _schema: PhantomData<fn() -> S>,
}

impl<S: Schema> EntityHandle<S> {
    /// Creates a handle that is not linked to any entity.
    #[must_use]
    pub fn unlinked() -> Self {
        Self {
            node: Rc::default(),
            _schema: PhantomData,
        }
    }

    /// Creates a handle attached to the record at `entity_index`.
    pub(crate) fn attach(store: &EntityStore<S>, entity_index: usize) -> Self {
        let node = Rc::new(HandleNode {
            link: Cell::new(Some(Link {
                store: store.store_id(),
                entity_index,
            })),
        });
        store.record(entity_index).handles.attach(&node);
        Self {
            node,
            _schema: PhantomData,
        }
    }

    /// Checks whether the handle is linked to a live entity.
    #[inline]
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.node.link.get().is_some()
    }

    /// Checks whether the handle points at `entity`.
    #[must_use]
    pub fn is_attached_to(&self, entity: &EntityRef<'_, S>) -> bool {
        self.node.link.get()
            == Some(Link {
                store: entity.store().store_id(),
                entity_index: entity.entity_index(),
            })
    }

    /// Resolves the handle to the entity it points at.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidHandle`] if the handle is unlinked and
    /// [`StoreError::ForeignHandle`] if `store` did not create it.
    pub fn get<'s>(&self, store: &'s EntityStore<S>) -> StoreResult<EntityRef<'s, S>> {
        let index = self.resolve(store)?;
        Ok(store.entity_at(index))
    }

    /// Resolves the handle to the entity it points at, mutably.
    ///
    /// # Errors
    ///
    /// Same as [`EntityHandle::get`].
    pub fn get_mut<'s>(&self, store: &'s mut EntityStore<S>) -> StoreResult<EntityMut<'s, S>> {
        let index = self.resolve(store)?;
        Ok(store.entity_at_mut(index))
    }

    /// Detaches the handle. Does nothing if it is already unlinked.
    pub fn reset(&mut self) {
        if self.is_linked() {
            self.node.sever();
            self.node = Rc::default();
        }
    }

    fn resolve(&self, store: &EntityStore<S>) -> StoreResult<usize> {
        let link = self.node.link.get().ok_or(StoreError::InvalidHandle)?;
        if link.store != store.store_id() {
            return Err(StoreError::ForeignHandle);
        }
        debug_assert!(store.record(link.entity_index).alive, "linked handle to a tombstone");
        Ok(link.entity_index)
    }
}

impl<S: Schema> Default for EntityHandle<S> {
    fn default() -> Self {
        Self::unlinked()
    }
}

impl<S: Schema> fmt::Debug for EntityHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node.link.get() {
            Some(link) => f
                .debug_struct("EntityHandle")
                .field("entity_index", &link.entity_index)
                .finish(),
            None => f.write_str("EntityHandle(unlinked)"),
        }
    }
}
