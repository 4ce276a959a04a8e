//! Shared sizing rules for the hash containers.
//!
//! All tables in this crate are backed by power-of-two buffers so that slot
//! selection is a mask instead of a modulo. The helpers here centralize the
//! three sizing decisions every container makes: the initial buffer length
//! for an expected element count, the next buffer length on growth, and the
//! assigned-count threshold at which growth is triggered.

use core::fmt;

use cfg_if::cfg_if;

/// Smallest buffer length ever allocated.
pub(crate) const MIN_CAPACITY: usize = 4;

/// Expected element count used when the caller does not provide one.
pub(crate) const DEFAULT_EXPECTED_ELEMENTS: usize = 8;

/// Largest supported buffer length. One slot must always stay empty, so a
/// table can never hold this many elements.
pub(crate) const MAX_HASH_ARRAY_LENGTH: usize = 1 << (usize::BITS - 2);

cfg_if! {
    if #[cfg(feature = "load-factor-ninety")] {
        pub(crate) const DEFAULT_LOAD_FACTOR: f32 = 0.90;
    } else {
        pub(crate) const DEFAULT_LOAD_FACTOR: f32 = 0.75;
    }
}

/// Buffer length for holding `elements` entries without growing, given the
/// load factor.
///
/// The result is bumped by one slot before rounding when the load factor
/// would make the buffer exactly full; together with [`expand_at_count`]
/// this guarantees that a table constructed for `n` expected elements never
/// reallocates during its first `n` inserts, even at a load factor of 1.0.
pub(crate) fn min_buffer_size(elements: usize, load_factor: f32) -> usize {
    debug_assert!(load_factor > 0.0 && load_factor <= 1.0);

    let mut length = (elements as f64 / load_factor as f64).ceil() as usize;
    if length == elements {
        length += 1;
    }
    length = length.max(MIN_CAPACITY).next_power_of_two();

    assert!(
        length <= MAX_HASH_ARRAY_LENGTH,
        "maximum buffer length exceeded: {} elements at load factor {}",
        elements,
        load_factor,
    );
    length
}

/// Buffer length after growing from `current`.
pub(crate) fn next_buffer_size(current: usize) -> usize {
    debug_assert!(current.is_power_of_two());
    assert!(
        current < MAX_HASH_ARRAY_LENGTH,
        "maximum buffer length exceeded: cannot grow past {} slots",
        current,
    );
    current << 1
}

/// Assigned-count threshold at which a buffer of length `capacity` grows.
///
/// Capped at `capacity - 1` so at least one slot is always empty; probe
/// loops rely on that empty slot to terminate.
pub(crate) fn expand_at_count(capacity: usize, load_factor: f32) -> usize {
    debug_assert!(capacity.is_power_of_two());
    ((capacity as f32 * load_factor) as usize).clamp(1, capacity - 1)
}

/// Error returned by the fallible reservation paths when the allocator
/// cannot provide the requested buffers.
///
/// The failing operation leaves the container in its pre-call state: new
/// buffers are allocated before any existing state is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferAllocationError {
    from: usize,
    to: usize,
}

impl BufferAllocationError {
    pub(crate) fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    /// Buffer length (in slots) at the time of the failed request.
    pub fn from_capacity(&self) -> usize {
        self.from
    }

    /// Buffer length (in slots) that could not be allocated.
    pub fn to_capacity(&self) -> usize {
        self.to
    }
}

impl fmt::Display for BufferAllocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "not enough memory to allocate buffers to grow from {} -> {} slots",
            self.from, self.to
        )
    }
}

impl core::error::Error for BufferAllocationError {}
