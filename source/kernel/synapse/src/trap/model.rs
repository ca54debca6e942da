// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Host model of the trap vector.
//!
//! [`Hart::enter_trap`] and [`Hart::leave_trap`] perform the same stores and
//! loads as `__synapse_trap_entry`, slot by slot from [`SAVE_ORDER`], against
//! real memory at the modelled stack pointer. Layout changes therefore show up
//! in host tests before they reach hardware.

use super::frame::{offset_of, Reg, TrapFrame, FRAME_SLOTS, SAVE_ORDER, TRAP_FRAME_BYTES};

/// Integer register file and `sscratch` of one hart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hart {
    /// `x[0]` is hardwired to zero and never written.
    pub x: [usize; 32],
    pub sscratch: usize,
}

impl Hart {
    #[inline]
    pub fn reg(&self, reg: Reg) -> usize {
        self.x[reg.index()]
    }

    #[inline]
    pub fn set_reg(&mut self, reg: Reg, value: usize) {
        self.x[reg.index()] = value;
    }

    /// Runs the vector's enter sequence and returns the frame it built, as
    /// `a0` would hand it to the dispatcher.
    ///
    /// # Safety
    ///
    /// `sp` must point just past at least [`TRAP_FRAME_BYTES`] of writable,
    /// 16-byte aligned memory.
    pub unsafe fn enter_trap(&mut self) -> *mut TrapFrame {
        // csrw sscratch, sp ; addi sp, sp, -frame_bytes
        self.sscratch = self.reg(Reg::Sp);
        self.set_reg(Reg::Sp, self.reg(Reg::Sp) - TRAP_FRAME_BYTES);
        let base = self.reg(Reg::Sp);

        for reg in &SAVE_ORDER[..FRAME_SLOTS - 1] {
            unsafe { store(base, offset_of(*reg), self.reg(*reg)) };
        }

        // csrr a0, sscratch ; sd a0, off_sp(sp)
        self.set_reg(Reg::A0, self.sscratch);
        unsafe { store(base, offset_of(Reg::Sp), self.reg(Reg::A0)) };

        // mv a0, sp
        self.set_reg(Reg::A0, base);
        base as *mut TrapFrame
    }

    /// Runs the vector's leave sequence from the frame at the current `sp`.
    ///
    /// # Safety
    ///
    /// `sp` must still point at a frame produced by [`Hart::enter_trap`].
    pub unsafe fn leave_trap(&mut self) {
        let base = self.reg(Reg::Sp);
        for reg in SAVE_ORDER[..FRAME_SLOTS - 1].iter().rev() {
            let value = unsafe { load(base, offset_of(*reg)) };
            self.set_reg(*reg, value);
        }
        let sp = unsafe { load(base, offset_of(Reg::Sp)) };
        self.set_reg(Reg::Sp, sp);
    }
}

unsafe fn store(base: usize, offset: usize, value: usize) {
    unsafe { core::ptr::write((base + offset) as *mut usize, value) }
}

unsafe fn load(base: usize, offset: usize) -> usize {
    unsafe { core::ptr::read((base + offset) as *const usize) }
}
