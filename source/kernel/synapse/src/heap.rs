// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Kernel heap carved out of the frame allocator.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{self, NonNull};

use linked_list_allocator::Heap;
use spin::Mutex;

use crate::mm::{PageAllocator, PhysAddr, PAGE_SIZE};

/// Pages handed to the kernel heap during bring-up (256 KiB).
pub const HEAP_PAGES: usize = 64;

#[cfg(all(target_arch = "riscv64", target_os = "none", feature = "heap"))]
#[global_allocator]
static KERNEL_HEAP: KernelHeap = KernelHeap::empty();

/// First-fit heap behind a spin lock.
pub struct KernelHeap {
    inner: Mutex<Heap>,
}

impl KernelHeap {
    pub const fn empty() -> Self {
        Self { inner: Mutex::new(Heap::empty()) }
    }

    /// Hands `pages` pages starting at `base` to the heap.
    ///
    /// # Safety
    ///
    /// The pages must be unused, writable and never returned to their source.
    /// Must be called at most once.
    pub unsafe fn init(&self, base: PhysAddr, pages: usize) {
        unsafe {
            self.inner.lock().init(base.as_mut_ptr::<u8>(), pages * PAGE_SIZE);
        }
    }

    /// Bytes managed by the heap.
    pub fn size(&self) -> usize {
        self.inner.lock().size()
    }

    /// Bytes currently handed out.
    pub fn used(&self) -> usize {
        self.inner.lock().used()
    }
}

unsafe impl GlobalAlloc for KernelHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.inner
            .lock()
            .allocate_first_fit(layout)
            .map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if let Some(ptr) = NonNull::new(ptr) {
            unsafe { self.inner.lock().deallocate(ptr, layout) };
        }
    }
}

/// Takes `pages` pages from `frames` and gives them to `heap`.
///
/// # Safety
///
/// Same as [`KernelHeap::init`].
pub unsafe fn seed<A: PageAllocator + ?Sized>(heap: &KernelHeap, frames: &mut A, pages: usize) -> PhysAddr {
    let base = frames.allocate(pages);
    unsafe { heap.init(base, pages) };
    base
}

/// Installs the global kernel heap.
#[cfg(all(target_arch = "riscv64", target_os = "none", feature = "heap"))]
pub fn init<A: PageAllocator + ?Sized>(frames: &mut A) {
    // SAFETY: called once from `kmain`; the pages come straight from the
    // frame allocator and are never handed back.
    let base = unsafe { seed(&KERNEL_HEAP, frames, HEAP_PAGES) };
    log_info!(target: "heap", "heap: {} KiB at {}", KERNEL_HEAP.size() / 1024, base);
}
