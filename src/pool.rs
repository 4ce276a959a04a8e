//! A small pool recycling iterator cursor state.
//!
//! Each container owns one pool. `iter()` (and the key/value views built on
//! it) borrows a boxed cursor from the pool instead of allocating; when the
//! iterator is exhausted or dropped, the cursor goes back. The pool never
//! holds more than [`POOL_MAX_SIZE`] cursors, so a caller that leaks
//! iterators costs at most a bounded number of retained boxes and every
//! borrow past the bound simply allocates a transient cursor.
//!
//! Containers are single-threaded (see the crate docs); the pool relies on
//! that and uses a plain `RefCell`.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::RefCell;

/// Hard upper bound on retained cursors per pool.
pub(crate) const POOL_MAX_SIZE: usize = 8;

/// Cursor state shared by all slot-array iterators in this crate.
///
/// `pos` counts down; each container seeds it at borrow time (`slots + 1`
/// for the sentinel-keyed tables, `slots` for the Robin Hood tables).
#[derive(Default)]
pub(crate) struct Cursor {
    pub(crate) pos: usize,
}

pub(crate) struct IteratorPool<C> {
    free: RefCell<Vec<Box<C>>>,
}

impl<C: Default> IteratorPool<C> {
    pub(crate) fn new() -> Self {
        Self {
            free: RefCell::new(Vec::new()),
        }
    }

    /// Takes a cursor from the pool, allocating if the pool is empty.
    ///
    /// The returned cursor is in an unspecified state; the borrower
    /// initializes it.
    pub(crate) fn borrow(&self) -> Box<C> {
        self.free
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| Box::new(C::default()))
    }

    /// Returns a cursor to the pool, or drops it if the pool is full.
    pub(crate) fn release(&self, cursor: Box<C>) {
        let mut free = self.free.borrow_mut();
        if free.len() < POOL_MAX_SIZE {
            free.push(cursor);
        }
    }

    /// Number of cursors currently available for borrowing.
    pub(crate) fn available(&self) -> usize {
        self.free.borrow().len()
    }
}
