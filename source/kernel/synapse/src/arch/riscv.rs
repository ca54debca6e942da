// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! RISC-V supervisor helpers used across the SYNAPSE kernel.
//!
//! Every helper has a host fallback so that the logic built on top of it can
//! be exercised by `cargo test` without a RISC-V machine.

/// Zeroes `[start, end)` one byte at a time.
///
/// # Safety
///
/// The range must be writable memory that no live Rust value refers to.
#[inline]
pub unsafe fn clear_bss(start: *mut u8, end: *mut u8) {
    let mut ptr = start;
    while ptr < end {
        // SAFETY: `ptr` stays inside `[start, end)` per the caller contract.
        unsafe {
            core::ptr::write_volatile(ptr, 0);
            ptr = ptr.add(1);
        }
    }
}

/// Points `stvec` at `trap_vector` in direct mode and clears `sscratch`.
///
/// # Safety
///
/// `trap_vector` must be the 4-byte aligned address of a routine that follows
/// the supervisor trap entry protocol.
#[inline]
pub unsafe fn configure_traps(trap_vector: usize) {
    #[cfg(all(target_arch = "riscv64", target_os = "none"))]
    unsafe {
        riscv::register::sscratch::write(0);
        riscv::register::stvec::write(trap_vector, riscv::register::mtvec::TrapMode::Direct);
    }
    #[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
    {
        let _ = trap_vector;
    }
}

/// Reads the raw `scause`, `stval` and `sepc` CSRs, in that order.
#[inline]
pub fn read_trap_csrs() -> (usize, usize, usize) {
    #[cfg(all(target_arch = "riscv64", target_os = "none"))]
    {
        (
            riscv::register::scause::read().bits(),
            riscv::register::stval::read(),
            riscv::register::sepc::read(),
        )
    }
    #[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
    {
        (0, 0, 0)
    }
}

/// Masks supervisor interrupts globally (`sstatus.SIE = 0`).
#[inline]
pub fn disable_interrupts() {
    #[cfg(all(target_arch = "riscv64", target_os = "none"))]
    unsafe {
        riscv::register::sstatus::clear_sie();
    }
}

/// Issues a WFI instruction or spins on the host.
#[inline]
pub fn wait_for_interrupt() {
    #[cfg(all(target_arch = "riscv64", target_os = "none"))]
    unsafe {
        core::arch::asm!("wfi", options(nomem, nostack, preserves_flags));
    }
    #[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
    {
        core::hint::spin_loop();
    }
}

/// Executes `unimp`, raising an illegal-instruction exception.
#[cfg(all(target_arch = "riscv64", target_os = "none"))]
#[inline(never)]
pub fn raise_illegal_instruction() {
    unsafe {
        core::arch::asm!("unimp", options(nostack));
    }
}
