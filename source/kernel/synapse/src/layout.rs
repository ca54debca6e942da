// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Linker-provided memory layout.
//!
//! The symbols are defined by `synapse-boot/kernel.ld`; only their addresses
//! carry meaning.

use core::fmt;

use crate::mm::{LayoutError, PhysAddr, PhysRange};

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
extern "C" {
    static mut __bss_start: u8;
    static mut __bss_end: u8;
    static __stack_top: u8;
    static __free_ram_start: u8;
    static __free_ram_end: u8;
}

/// Addresses the kernel needs from its link-time image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryLayout {
    pub bss_start: PhysAddr,
    pub bss_end: PhysAddr,
    pub stack_top: PhysAddr,
    pub free_ram: PhysRange,
}

impl MemoryLayout {
    /// Validates raw symbol addresses.
    pub fn new(
        bss_start: usize,
        bss_end: usize,
        stack_top: usize,
        free_start: usize,
        free_end: usize,
    ) -> Result<Self, LayoutError> {
        if bss_end < bss_start {
            return Err(LayoutError::Inverted { start: bss_start, end: bss_end });
        }
        if stack_top % 16 != 0 {
            return Err(LayoutError::Unaligned { addr: stack_top });
        }
        if free_start < stack_top {
            return Err(LayoutError::Inverted { start: stack_top, end: free_start });
        }
        let free_ram = PhysRange::new(PhysAddr::new(free_start), PhysAddr::new(free_end))?;
        Ok(Self {
            bss_start: PhysAddr::new(bss_start),
            bss_end: PhysAddr::new(bss_end),
            stack_top: PhysAddr::new(stack_top),
            free_ram,
        })
    }

    /// Reads the layout from the linker symbols.
    #[cfg(all(target_arch = "riscv64", target_os = "none"))]
    pub fn linker() -> Result<Self, LayoutError> {
        use core::ptr::{addr_of, addr_of_mut};
        // SAFETY: only the addresses of the symbols are taken.
        unsafe {
            Self::new(
                addr_of_mut!(__bss_start) as usize,
                addr_of_mut!(__bss_end) as usize,
                addr_of!(__stack_top) as usize,
                addr_of!(__free_ram_start) as usize,
                addr_of!(__free_ram_end) as usize,
            )
        }
    }

    #[inline]
    pub const fn bss_len(&self) -> usize {
        self.bss_end.raw() - self.bss_start.raw()
    }
}

impl fmt::Display for MemoryLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bss [{}, {}) stack_top {} free [{}, {}) {} pages",
            self.bss_start,
            self.bss_end,
            self.stack_top,
            self.free_ram.start(),
            self.free_ram.end(),
            self.free_ram.pages()
        )
    }
}

/// Zeroes `.bss`.
///
/// # Safety
///
/// Must run once, before any Rust code reads a zero-initialised static.
#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub unsafe fn zero_bss() {
    use core::ptr::addr_of_mut;
    unsafe { crate::arch::riscv::clear_bss(addr_of_mut!(__bss_start), addr_of_mut!(__bss_end)) };
}

#[cfg(test)]
mod tests {
    use super::*;

    const QEMU: [usize; 5] = [0x8021_0000, 0x8021_4000, 0x8023_4000, 0x8023_4000, 0x8423_4000];

    #[test]
    fn accepts_linker_layout() {
        let [a, b, c, d, e] = QEMU;
        let layout = MemoryLayout::new(a, b, c, d, e).unwrap();
        assert_eq!(layout.free_ram.pages(), 16384);
        assert_eq!(layout.bss_len(), 0x4000);
        assert_eq!(
            layout.to_string(),
            "bss [0x80210000, 0x80214000) stack_top 0x80234000 free [0x80234000, 0x84234000) 16384 pages"
        );
    }

    #[test]
    fn rejects_unaligned_free_ram() {
        let [a, b, c, _, e] = QEMU;
        assert_eq!(
            MemoryLayout::new(a, b, c, 0x8023_4010, e),
            Err(LayoutError::Unaligned { addr: 0x8023_4010 })
        );
    }

    #[test]
    fn rejects_free_ram_overlapping_stack() {
        let [a, b, c, _, e] = QEMU;
        assert_eq!(
            MemoryLayout::new(a, b, c, 0x8022_0000, e),
            Err(LayoutError::Inverted { start: c, end: 0x8022_0000 })
        );
    }

    #[test]
    fn rejects_inverted_bss() {
        let [a, b, c, d, e] = QEMU;
        assert!(MemoryLayout::new(b, a, c, d, e).is_err());
    }

    #[test]
    fn rejects_misaligned_stack() {
        let [a, b, _, d, e] = QEMU;
        assert_eq!(
            MemoryLayout::new(a, b, 0x8023_3ff8, d, e),
            Err(LayoutError::Unaligned { addr: 0x8023_3ff8 })
        );
    }
}
