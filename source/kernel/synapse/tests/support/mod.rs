// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for the host integration tests.

#![allow(dead_code)]

use std::alloc::{alloc, dealloc, Layout};

use synapse::mm::{FrameAllocator, PhysAddr, PhysRange, PAGE_SIZE};

/// Page-aligned host buffer standing in for the free-RAM arena. Filled with
/// a non-zero pattern so zero-fill is observable.
pub struct HostArena {
    base: *mut u8,
    pages: usize,
    layout: Layout,
}

impl HostArena {
    pub const POISON: u8 = 0xa5;

    /// `pages` may be zero; one page is still backed so the base is real.
    pub fn new(pages: usize) -> Self {
        let layout = Layout::from_size_align(pages.max(1) * PAGE_SIZE, PAGE_SIZE).unwrap();
        let base = unsafe { alloc(layout) };
        assert!(!base.is_null());
        unsafe { std::ptr::write_bytes(base, Self::POISON, layout.size()) };
        Self { base, pages, layout }
    }

    pub fn start(&self) -> PhysAddr {
        PhysAddr::new(self.base as usize)
    }

    pub fn end(&self) -> PhysAddr {
        PhysAddr::new(self.base as usize + self.pages * PAGE_SIZE)
    }

    pub fn frames(&self) -> FrameAllocator {
        let range = PhysRange::new(self.start(), self.end()).unwrap();
        // SAFETY: the buffer is owned by `self`; callers keep it alive.
        unsafe { FrameAllocator::new(range) }
    }

    pub fn bytes(&self, base: PhysAddr, pages: usize) -> &[u8] {
        unsafe { std::slice::from_raw_parts(base.as_mut_ptr::<u8>(), pages * PAGE_SIZE) }
    }
}

impl Drop for HostArena {
    fn drop(&mut self) {
        unsafe { dealloc(self.base, self.layout) };
    }
}
