//! Memory allocation control
//!
//! Every container buffer owned by a [`Value`](crate::Value) (string bytes, array elements and
//! object slots) is allocated through an allocator handle of type `A: Allocator`. The handle is
//! stored next to the buffer, so a tree can live in an arena, a pool or behind a [`Budget`].
//!
//! An [`Allocator`] is an [`allocator_api2::alloc::Allocator`] that can be cloned cheaply plus a
//! propagation policy, i.e. whether assignment lets the destination adopt the allocator of the
//! source. The policy is fixed per allocator type.
//!
//! ```
//! use jsonslot::{Budget, Global};
//!
//! let roomy = Budget::new(Global, 4096);
//! let value = jsonslot::from_slice_in(b"[1, 2, 3]", &roomy).unwrap();
//! assert!(roomy.in_use() > 0);
//! drop(value);
//! assert_eq!(roomy.in_use(), 0);
//!
//! let tight = Budget::new(Global, 8);
//! assert!(jsonslot::from_slice_in(b"[1, 2, 3]", &tight).is_err());
//! ```

use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;

pub use allocator_api2::alloc::{AllocError, Global};
use allocator_api2::alloc::Allocator as RawAllocator;
use allocator_api2::vec::Vec;

/// An allocation strategy for JSON containers
///
/// Implement [`allocator_api2::alloc::Allocator`] for your type, then opt in with an empty
/// `impl Allocator for MyAlloc {}` or override the propagation constants.
pub trait Allocator: RawAllocator + Clone {
    /// Whether copy assignment makes the destination adopt the source's allocator.
    ///
    /// When `false` the destination keeps its own allocator and receives a deep copy allocated
    /// from it.
    const PROPAGATE_ON_COPY_ASSIGNMENT: bool = false;

    /// Whether move assignment makes the destination adopt the source's allocator.
    ///
    /// When `true` the buffer is transferred in O(1). When `false` the contents are copied into
    /// the destination's allocator and the source is reset to `Null`.
    const PROPAGATE_ON_MOVE_ASSIGNMENT: bool = true;
}

impl Allocator for Global {}

impl<'a, A: RawAllocator> Allocator for &'a Budget<A> {}

/// Reserves room for exactly `additional` more elements, reporting failure instead of aborting.
pub(crate) fn reserve_exact<T, A: RawAllocator>(
    vec: &mut Vec<T, A>,
    additional: usize,
) -> Result<(), AllocError> {
    vec.try_reserve_exact(additional).map_err(|_| AllocError)
}

/// Reserves room for at least `additional` more elements (amortized growth).
pub(crate) fn reserve<T, A: RawAllocator>(
    vec: &mut Vec<T, A>,
    additional: usize,
) -> Result<(), AllocError> {
    vec.try_reserve(additional).map_err(|_| AllocError)
}

/// Allocator adapter that refuses to hold more than `limit` bytes at once
///
/// Use a shared reference (`&Budget`) as the allocator handle; every clone of the handle draws
/// from the same budget. The counters are not synchronized: a budget belongs to one thread.
#[derive(Debug)]
pub struct Budget<A = Global> {
    inner: A,
    limit: usize,
    in_use: Cell<usize>,
    peak: Cell<usize>,
}

impl<A> Budget<A> {
    /// Creates a budget of `limit` bytes on top of `inner`.
    pub const fn new(inner: A, limit: usize) -> Self {
        Budget {
            inner,
            limit,
            in_use: Cell::new(0),
            peak: Cell::new(0),
        }
    }

    /// Maximum number of bytes that may be live at the same time.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes currently allocated through this budget.
    pub fn in_use(&self) -> usize {
        self.in_use.get()
    }

    /// Highest value `in_use` has reached.
    pub fn peak(&self) -> usize {
        self.peak.get()
    }

    /// Bytes that can still be allocated.
    pub fn remaining(&self) -> usize {
        self.limit - self.in_use.get()
    }
}

unsafe impl<A: RawAllocator> RawAllocator for Budget<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let size = layout.size();
        if size > self.remaining() {
            debug!(
                "budget exhausted: {=usize} requested, {=usize} left",
                size,
                self.remaining()
            );
            return Err(AllocError);
        }

        let block = self.inner.allocate(layout)?;
        let in_use = self.in_use.get() + size;
        self.in_use.set(in_use);
        if in_use > self.peak.get() {
            self.peak.set(in_use);
        }
        Ok(block)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.inner.deallocate(ptr, layout);
        self.in_use.set(self.in_use.get() - layout.size());
    }
}

#[cfg(test)]
mod tests {
    use allocator_api2::vec::Vec;

    use super::*;

    #[test]
    fn budget_tracks_usage() {
        let budget = Budget::new(Global, 1024);
        {
            let mut v: Vec<u8, &Budget> = Vec::new_in(&budget);
            reserve_exact(&mut v, 100).unwrap();
            assert_eq!(budget.in_use(), 100);
            assert_eq!(budget.remaining(), 924);
        }
        assert_eq!(budget.in_use(), 0);
        assert_eq!(budget.peak(), 100);
    }

    #[test]
    fn budget_refuses_overdraft() {
        let budget = Budget::new(Global, 16);
        let mut v: Vec<u8, &Budget> = Vec::new_in(&budget);
        assert!(reserve_exact(&mut v, 17).is_err());
        assert_eq!(budget.in_use(), 0);
        assert!(reserve_exact(&mut v, 16).is_ok());
        assert!(reserve(&mut v, 32).is_err());
    }

    #[test]
    fn default_propagation_policy() {
        assert!(!<Global as Allocator>::PROPAGATE_ON_COPY_ASSIGNMENT);
        assert!(<Global as Allocator>::PROPAGATE_ON_MOVE_ASSIGNMENT);
    }
}
