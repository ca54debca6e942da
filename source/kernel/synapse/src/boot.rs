// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Kernel initialization after the boot trampoline
//! OWNERS: @kernel-team
//! PUBLIC API: early_boot_init(), kmain(), bring_up_memory(), demo_allocations(), idle()
//! DEPENDS_ON: layout, trap::install_trap_vector, mm::FrameAllocator, heap, sbi::base
//! INVARIANTS: .bss is zeroed before anything reads a static; stvec is set
//!             before any interrupt source is armed; kmain never returns

use crate::mm::{PageAllocator, PhysAddr};

/// Zeroes `.bss` and installs the trap vector.
///
/// # Safety
///
/// Must be invoked exactly once, on the boot hart, with a valid stack and
/// before any Rust code that relies on zero-initialised statics.
#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub unsafe fn early_boot_init() {
    // SAFETY: single hart, nothing has touched .bss yet.
    unsafe { crate::layout::zero_bss() };
    // SAFETY: privileged context, vector installed once.
    unsafe { crate::trap::install_trap_vector() };
    log_info!(target: "boot", "bss cleared, trap vector installed");
}

/// Kernel entry after [`early_boot_init`].
#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub fn kmain() -> ! {
    use crate::layout::MemoryLayout;
    use crate::mm::FrameAllocator;

    let layout = match MemoryLayout::linker() {
        Ok(layout) => layout,
        Err(err) => panic!("bad linker layout: {err}"),
    };

    #[cfg(feature = "boot_banner")]
    banner(&layout);

    // SAFETY: the linker reserves [__free_ram_start, __free_ram_end) for the
    // allocator and nothing else references it.
    let mut frames = unsafe { FrameAllocator::new(layout.free_ram) };

    bring_up_memory(&mut frames);

    #[cfg(feature = "selftest_trap")]
    {
        log_warn!(target: "boot", "selftest: raising illegal instruction");
        crate::arch::riscv::raise_illegal_instruction();
    }

    log_info!(target: "boot", "init complete, {} pages free", frames.remaining_pages());
    idle()
}

#[cfg(all(target_arch = "riscv64", target_os = "none", feature = "boot_banner"))]
fn banner(layout: &crate::layout::MemoryLayout) {
    use crate::sbi::{base::FirmwareInfo, Firmware};

    log_info!(target: "boot", "synapse {}", env!("CARGO_PKG_VERSION"));
    log_info!(target: "boot", "layout: {layout}");
    match FirmwareInfo::query(&Firmware) {
        Ok(info) => log_info!(
            target: "boot",
            "sbi: {} v{:#x}, spec {}, extensions {:?}",
            info.impl_name().unwrap_or("unknown"),
            info.impl_version,
            info.spec,
            info.extensions
        ),
        Err(err) => log_warn!(target: "boot", "sbi: base extension unavailable: {err}"),
    }
}

/// Runs the boot-time consumers of the frame allocator.
///
/// The demo allocations go first so they start at the arena base; the heap,
/// when enabled, is carved out after them.
pub fn bring_up_memory<A: PageAllocator + ?Sized>(frames: &mut A) -> Option<[PhysAddr; 2]> {
    #[cfg(feature = "selftest_alloc")]
    let demo = Some(demo_allocations(frames));
    #[cfg(not(feature = "selftest_alloc"))]
    let demo = None;

    #[cfg(all(target_arch = "riscv64", target_os = "none", feature = "heap"))]
    crate::heap::init(frames);

    demo
}

/// Two bring-up allocations: two pages, then one.
pub fn demo_allocations<A: PageAllocator + ?Sized>(frames: &mut A) -> [PhysAddr; 2] {
    let first = frames.allocate(2);
    let second = frames.allocate(1);
    log_info!(target: "mm", "alloc_pages test: paddr0={first}");
    log_info!(target: "mm", "alloc_pages test: paddr1={second}");
    [first, second]
}

/// Parks the hart between interrupts forever.
pub fn idle() -> ! {
    loop {
        crate::arch::riscv::wait_for_interrupt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::PAGE_SIZE;

    struct Recorder {
        next: usize,
        requests: Vec<usize>,
    }

    impl PageAllocator for Recorder {
        fn allocate(&mut self, pages: usize) -> PhysAddr {
            self.requests.push(pages);
            let base = self.next;
            self.next += pages * PAGE_SIZE;
            PhysAddr::new(base)
        }
    }

    #[test]
    fn demo_takes_two_pages_then_one() {
        let mut frames = Recorder { next: 0x8023_4000, requests: Vec::new() };
        let [first, second] = demo_allocations(&mut frames);
        assert_eq!(frames.requests, [2, 1]);
        assert_eq!(first.raw(), 0x8023_4000);
        assert_eq!(second.raw(), 0x8023_6000);
    }

    #[test]
    #[cfg(feature = "selftest_alloc")]
    fn demo_allocations_start_at_arena_base() {
        use crate::mm::{FrameAllocator, PhysRange};

        #[repr(C, align(4096))]
        struct Pages([u8; 4 * PAGE_SIZE]);

        let mut pages = Box::new(Pages([0xa5; 4 * PAGE_SIZE]));
        let start = PhysAddr::new(pages.0.as_mut_ptr() as usize);
        let end = PhysAddr::new(start.raw() + 4 * PAGE_SIZE);
        let mut frames = unsafe { FrameAllocator::new(PhysRange::new(start, end).unwrap()) };

        let [first, second] = bring_up_memory(&mut frames).unwrap();
        assert_eq!(first, start);
        assert_eq!(second.raw(), start.raw() + 2 * PAGE_SIZE);
        assert_eq!(frames.remaining_pages(), 1);
    }
}
