//! # Store Observers
//!
//! Synchronous add/remove notifications with scoped subscriptions.
//!
//! An [`Observer`] owns the observing value; the store only keeps a weak
//! link to it. Dropping the `Observer` ends the subscription, so no store
//! ever calls into a dead observer.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use super::schema::Schema;
use super::store::{EntityRef, EntityStore};

/// Receives notifications from an [`EntityStore`].
///
/// Both callbacks default to doing nothing. They run synchronously, in
/// registration order, before the triggering call returns.
pub trait EntityObserver<S: Schema> {
    /// Called after an entity has been added, with every component in place.
    fn entity_added(&mut self, entity: EntityRef<'_, S>) {
        let _ = entity;
    }

    /// Called before an entity is removed, while it is still fully valid.
    fn entity_removed(&mut self, entity: EntityRef<'_, S>) {
        let _ = entity;
    }
}

/// Weak link from a store to one subscribed observer.
pub(crate) type Subscription<S> = Weak<RefCell<dyn EntityObserver<S>>>;

/// A subscribed observer.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct Counter { added: usize }
///
/// impl EntityObserver<MySchema> for Counter {
///     fn entity_added(&mut self, _: EntityRef<'_, MySchema>) {
///         self.added += 1;
///     }
/// }
///
/// let counter = Observer::register(&mut store, Counter::default());
/// store.add_entity((Position { x: 0, y: 0 },))?;
/// assert_eq!(counter.borrow().added, 1);
/// drop(counter); // unsubscribed
/// ```
pub struct Observer<O> {
    inner: Rc<RefCell<O>>,
}

impl<O> Observer<O> {
    /// Wraps `value` and subscribes it to `store`.
    pub fn register<S>(store: &mut EntityStore<S>, value: O) -> Self
    where
        S: Schema,
        O: EntityObserver<S> + 'static,
    {
        let inner = Rc::new(RefCell::new(value));
        let erased: Rc<RefCell<dyn EntityObserver<S>>> = inner.clone();
        store.subscribe(Rc::downgrade(&erased));
        debug!(
            schema = S::NAME,
            observer = std::any::type_name::<O>(),
            "observer registered"
        );
        Self { inner }
    }

    /// Borrows the observer.
    ///
    /// # Panics
    ///
    /// Panics if the observer is mutably borrowed.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, O> {
        self.inner.borrow()
    }

    /// Borrows the observer mutably.
    ///
    /// # Panics
    ///
    /// Panics if the observer is already borrowed.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, O> {
        self.inner.borrow_mut()
    }
}

impl<O: fmt::Debug> fmt::Debug for Observer<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(value) => f.debug_tuple("Observer").field(&*value).finish(),
            Err(_) => f.write_str("Observer(<borrowed>)"),
        }
    }
}
