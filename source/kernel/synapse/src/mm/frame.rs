// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Physical frame allocator for early boot
//! OWNERS: @kernel-mm-team
//! PUBLIC API: FrameAllocator::{new, allocate, try_allocate}, PageAllocator
//! DEPENDS_ON: mm::{PhysAddr, PhysRange, PAGE_SIZE}
//! INVARIANTS: cursor only moves forward; returned ranges are page aligned,
//!             zero filled, inside the arena and pairwise disjoint
//!
//! Bump allocation with no reclamation. A reclaiming allocator is expected to
//! replace this once the kernel has one; callers should depend on
//! [`PageAllocator`] rather than the concrete type so the swap stays local.

use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;

use super::{PhysAddr, PhysRange, PAGE_SIZE};

/// Source of zeroed, page-aligned physical memory.
pub trait PageAllocator {
    /// Returns the base of `pages` fresh pages. Exhaustion is fatal.
    fn allocate(&mut self, pages: usize) -> PhysAddr;
}

/// Reason a frame request could not be satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// Requests must cover at least one page.
    ZeroPages,
    /// The request does not fit between the cursor and the arena end.
    OutOfMemory { requested: usize, available: usize },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPages => f.write_str("zero-page allocation requested"),
            Self::OutOfMemory { requested, available } => {
                write!(f, "out of memory: requested {requested} pages, {available} available")
            }
        }
    }
}

/// Bump allocator over a fixed physical arena.
///
/// The cursor is plain mutable state; the type is deliberately `!Sync` so a
/// shared reference cannot leak to another hart without an external lock.
pub struct FrameAllocator {
    arena: PhysRange,
    next: PhysAddr,
    _not_sync: PhantomData<Cell<()>>,
}

static_assertions::assert_not_impl_any!(FrameAllocator: Sync);

impl FrameAllocator {
    /// Takes ownership of `arena`.
    ///
    /// # Safety
    ///
    /// `arena` must be identity-mapped RAM that nothing else uses for as long
    /// as pages handed out by this allocator are alive.
    pub const unsafe fn new(arena: PhysRange) -> Self {
        Self { arena, next: arena.start(), _not_sync: PhantomData }
    }

    #[inline]
    pub const fn arena(&self) -> PhysRange {
        self.arena
    }

    /// Next address that will be handed out.
    #[inline]
    pub const fn next_free(&self) -> PhysAddr {
        self.next
    }

    #[inline]
    pub const fn remaining_pages(&self) -> usize {
        (self.arena.end().raw() - self.next.raw()) / PAGE_SIZE
    }

    /// Reserves and zeroes `pages` pages, or reports why it cannot.
    ///
    /// The cursor is left untouched on error.
    pub fn try_allocate(&mut self, pages: usize) -> Result<PhysAddr, AllocError> {
        if pages == 0 {
            return Err(AllocError::ZeroPages);
        }
        let available = self.remaining_pages();
        let exhausted = AllocError::OutOfMemory { requested: pages, available };
        let len = pages.checked_mul(PAGE_SIZE).ok_or(exhausted)?;
        let next = self.next.checked_add(len).ok_or(exhausted)?;
        if next > self.arena.end() {
            return Err(exhausted);
        }

        let base = self.next;
        self.next = next;
        // SAFETY: `[base, next)` lies inside the arena, which the constructor
        // contract hands to us exclusively, and the cursor never revisits it.
        unsafe {
            core::ptr::write_bytes(base.as_mut_ptr::<u8>(), 0, len);
        }
        Ok(base)
    }
}

impl PageAllocator for FrameAllocator {
    fn allocate(&mut self, pages: usize) -> PhysAddr {
        match self.try_allocate(pages) {
            Ok(base) => base,
            Err(err) => panic!("frame allocator: {err}"),
        }
    }
}

impl fmt::Debug for FrameAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameAllocator")
            .field("start", &self.arena.start())
            .field("next", &self.next)
            .field("end", &self.arena.end())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(4096))]
    #[derive(Clone, Copy)]
    struct Page([u8; PAGE_SIZE]);

    /// Host pages pre-filled with garbage.
    struct Arena(Vec<Page>);

    impl Arena {
        fn new(pages: usize) -> Self {
            Self(vec![Page([0xa5; PAGE_SIZE]); pages])
        }

        fn frames(&mut self) -> FrameAllocator {
            let start = PhysAddr::new(self.0.as_mut_ptr() as usize);
            let end = PhysAddr::new(start.raw() + self.0.len() * PAGE_SIZE);
            unsafe { FrameAllocator::new(PhysRange::new(start, end).unwrap()) }
        }
    }

    fn filled_with(base: PhysAddr, pages: usize, byte: u8) -> bool {
        let bytes = unsafe { core::slice::from_raw_parts(base.as_mut_ptr::<u8>(), pages * PAGE_SIZE) };
        bytes.iter().all(|&b| b == byte)
    }

    #[test]
    fn first_allocation_starts_at_arena_base() {
        let mut arena = Arena::new(4);
        let mut frames = arena.frames();
        assert_eq!(frames.allocate(1), frames.arena().start());
        assert_eq!(frames.remaining_pages(), 3);
    }

    #[test]
    fn allocations_are_contiguous_and_zeroed() {
        let mut arena = Arena::new(4);
        let mut frames = arena.frames();
        let a = frames.allocate(2);
        let b = frames.allocate(1);
        assert_eq!(b.raw(), a.raw() + 2 * PAGE_SIZE);
        assert!(filled_with(a, 2, 0));
        assert!(filled_with(b, 1, 0));
        // The untouched last page keeps its garbage.
        assert!(filled_with(frames.next_free(), 1, 0xa5));
    }

    #[test]
    fn whole_arena_can_be_taken() {
        let mut arena = Arena::new(2);
        let mut frames = arena.frames();
        let base = frames.allocate(2);
        assert_eq!(base, frames.arena().start());
        assert_eq!(frames.next_free(), frames.arena().end());
        assert_eq!(frames.remaining_pages(), 0);
    }

    #[test]
    #[should_panic(expected = "out of memory: requested 1 pages, 0 available")]
    fn request_past_a_full_arena_is_fatal() {
        let mut arena = Arena::new(2);
        let mut frames = arena.frames();
        frames.allocate(2);
        frames.allocate(1);
    }

    #[test]
    #[should_panic(expected = "zero-page allocation requested")]
    fn zero_pages_is_fatal() {
        let mut arena = Arena::new(1);
        arena.frames().allocate(0);
    }

    #[test]
    fn failed_request_leaves_cursor_in_place() {
        let mut arena = Arena::new(3);
        let mut frames = arena.frames();
        frames.allocate(1);
        let before = frames.next_free();
        assert_eq!(
            frames.try_allocate(3),
            Err(AllocError::OutOfMemory { requested: 3, available: 2 })
        );
        assert_eq!(frames.next_free(), before);
        assert_eq!(frames.try_allocate(2), Ok(before));
    }

    #[test]
    fn huge_request_does_not_overflow() {
        let mut arena = Arena::new(1);
        let mut frames = arena.frames();
        assert_eq!(
            frames.try_allocate(usize::MAX),
            Err(AllocError::OutOfMemory { requested: usize::MAX, available: 1 })
        );
    }
}
