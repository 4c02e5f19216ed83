//! # Table Allocators
//!
//! Growth policies for the entity table and the component columns.
//!
//! A store never grows a table on its own. Every append first asks the
//! store's [`Allocator`] how far the table may grow, so a store can run on
//! the process allocator with geometric growth ([`GlobalAllocator`]) or inside
//! a fixed, pre-allocated budget ([`FixedAllocator`]).

use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

/// Errors raised when a table cannot grow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The allocator's element budget for a single table is used up.
    #[error("table capacity exhausted: limit {limit}, requested {requested}")]
    CapacityExhausted {
        /// Maximum number of elements per table.
        limit: usize,
        /// Number of elements the table would have held after growing.
        requested: usize,
    },

    /// The process allocator refused the reservation.
    #[error("out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
}

/// Growth policy for the tables of one store.
///
/// Implementations only decide sizes; the store performs the actual
/// reservation with [`Vec::try_reserve_exact`], so a refused request never
/// leaves a table half-grown.
///
/// # Example
///
/// ```rust,ignore
/// let store: EntityStore<MySchema> = EntityStore::with_allocator(FixedAllocator::new(4096));
/// ```
pub trait Allocator: fmt::Debug {
    /// Number of elements to reserve for every table when the store is created.
    fn initial_capacity(&self) -> usize {
        0
    }

    /// Returns the capacity a table should grow to.
    ///
    /// Called when `capacity - len < additional`, and on every reservation
    /// for tables of zero-sized elements (whose capacity is unbounded). The
    /// returned value must be at least `len + additional`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::CapacityExhausted`] when the policy refuses to
    /// provide room for `additional` more elements.
    fn grow(&self, len: usize, capacity: usize, additional: usize) -> Result<usize, AllocError>;
}

/// The default policy: grow on the process allocator, doubling capacity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlobalAllocator;

impl GlobalAllocator {
    /// Smallest non-zero capacity handed out.
    const MIN_CAPACITY: usize = 8;
}

impl Allocator for GlobalAllocator {
    #[inline]
    fn grow(&self, len: usize, capacity: usize, additional: usize) -> Result<usize, AllocError> {
        let required = len.saturating_add(additional);
        Ok(required
            .max(capacity.saturating_mul(2))
            .max(Self::MIN_CAPACITY))
    }
}

/// A fixed element budget per table, reserved in full at store creation.
///
/// After construction no table ever reallocates: appends fill the
/// pre-allocated slots and fail with [`AllocError::CapacityExhausted`] once
/// the budget is used up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedAllocator {
    /// Maximum number of elements per table.
    limit: usize,
}

impl FixedAllocator {
    /// Creates a policy allowing at most `limit` elements per table.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is zero.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        assert!(limit > 0, "Capacity must be greater than zero");
        Self { limit }
    }

    /// Returns the per-table element budget.
    #[inline]
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }
}

impl Allocator for FixedAllocator {
    fn initial_capacity(&self) -> usize {
        self.limit
    }

    fn grow(&self, len: usize, _capacity: usize, additional: usize) -> Result<usize, AllocError> {
        let requested = len.saturating_add(additional);
        if requested > self.limit {
            return Err(AllocError::CapacityExhausted {
                limit: self.limit,
                requested,
            });
        }
        Ok(self.limit)
    }
}

/// Makes room for `additional` elements in `table` as directed by `allocator`.
///
/// Zero-sized elements never need memory, but their tables still count
/// against the allocator's budget.
pub(crate) fn reserve<T>(
    table: &mut Vec<T>,
    allocator: &dyn Allocator,
    additional: usize,
) -> Result<(), AllocError> {
    let zero_sized = std::mem::size_of::<T>() == 0;
    if !zero_sized && table.capacity() - table.len() >= additional {
        return Ok(());
    }

    let target = allocator.grow(table.len(), table.capacity(), additional)?;
    table.try_reserve_exact(target.saturating_sub(table.len()))?;
    Ok(())
}
