// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Trap frame layout shared by the assembly vector and Rust
//! OWNERS: @kernel-team
//! PUBLIC API: Reg, SAVE_ORDER, offset_of(), TrapFrame, TRAP_FRAME_BYTES
//! DEPENDS_ON: static_assertions
//! INVARIANTS: SAVE_ORDER fixes every slot offset; `sp` is the last slot;
//!             the vector saves and restores through offset_of() only
//!
//! | slot | reg | slot | reg | slot | reg |
//! |------|-----|------|-----|------|-----|
//! | 0    | ra  | 11   | a1  | 22   | s4  |
//! | 1    | gp  | 12   | a2  | 23   | s5  |
//! | 2    | tp  | 13   | a3  | 24   | s6  |
//! | 3    | t0  | 14   | a4  | 25   | s7  |
//! | 4    | t1  | 15   | a5  | 26   | s8  |
//! | 5    | t2  | 16   | a6  | 27   | s9  |
//! | 6    | t3  | 17   | a7  | 28   | s10 |
//! | 7    | t4  | 18   | s0  | 29   | s11 |
//! | 8    | t5  | 19   | s1  | 30   | sp  |
//! | 9    | t6  | 20   | s2  |      |     |
//! | 10   | a0  | 21   | s3  |      |     |
//!
//! Byte offset of slot `n` is `n * WORD`.

use core::fmt;
use core::mem::size_of;

use static_assertions::{const_assert, const_assert_eq};

/// Bytes per saved register.
pub const WORD: usize = size_of::<usize>();

/// Number of registers captured per trap (x1..x31).
pub const FRAME_SLOTS: usize = 31;

/// Stack space reserved by the vector, rounded to the 16-byte ABI alignment.
pub const TRAP_FRAME_BYTES: usize = (size_of::<TrapFrame>() + 15) & !15;

/// Integer registers by ABI name; the discriminant is the `x` index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum Reg {
    Ra = 1,
    Sp = 2,
    Gp = 3,
    Tp = 4,
    T0 = 5,
    T1 = 6,
    T2 = 7,
    S0 = 8,
    S1 = 9,
    A0 = 10,
    A1 = 11,
    A2 = 12,
    A3 = 13,
    A4 = 14,
    A5 = 15,
    A6 = 16,
    A7 = 17,
    S2 = 18,
    S3 = 19,
    S4 = 20,
    S5 = 21,
    S6 = 22,
    S7 = 23,
    S8 = 24,
    S9 = 25,
    S10 = 26,
    S11 = 27,
    T3 = 28,
    T4 = 29,
    T5 = 30,
    T6 = 31,
}

impl Reg {
    /// Architectural register number (`x<n>`).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Reg::Ra => "ra",
            Reg::Sp => "sp",
            Reg::Gp => "gp",
            Reg::Tp => "tp",
            Reg::T0 => "t0",
            Reg::T1 => "t1",
            Reg::T2 => "t2",
            Reg::S0 => "s0",
            Reg::S1 => "s1",
            Reg::A0 => "a0",
            Reg::A1 => "a1",
            Reg::A2 => "a2",
            Reg::A3 => "a3",
            Reg::A4 => "a4",
            Reg::A5 => "a5",
            Reg::A6 => "a6",
            Reg::A7 => "a7",
            Reg::S2 => "s2",
            Reg::S3 => "s3",
            Reg::S4 => "s4",
            Reg::S5 => "s5",
            Reg::S6 => "s6",
            Reg::S7 => "s7",
            Reg::S8 => "s8",
            Reg::S9 => "s9",
            Reg::S10 => "s10",
            Reg::S11 => "s11",
            Reg::T3 => "t3",
            Reg::T4 => "t4",
            Reg::T5 => "t5",
            Reg::T6 => "t6",
        }
    }
}

/// Slot order of the trap frame. The vector stores in this order and loads
/// in reverse, with `sp` last in both directions.
pub const SAVE_ORDER: [Reg; FRAME_SLOTS] = [
    Reg::Ra,
    Reg::Gp,
    Reg::Tp,
    Reg::T0,
    Reg::T1,
    Reg::T2,
    Reg::T3,
    Reg::T4,
    Reg::T5,
    Reg::T6,
    Reg::A0,
    Reg::A1,
    Reg::A2,
    Reg::A3,
    Reg::A4,
    Reg::A5,
    Reg::A6,
    Reg::A7,
    Reg::S0,
    Reg::S1,
    Reg::S2,
    Reg::S3,
    Reg::S4,
    Reg::S5,
    Reg::S6,
    Reg::S7,
    Reg::S8,
    Reg::S9,
    Reg::S10,
    Reg::S11,
    Reg::Sp,
];

/// Slot index of `reg` in [`SAVE_ORDER`].
pub const fn slot_of(reg: Reg) -> usize {
    let mut slot = 0;
    while slot < FRAME_SLOTS {
        if SAVE_ORDER[slot] as usize == reg as usize {
            return slot;
        }
        slot += 1;
    }
    panic!("register missing from trap frame layout");
}

/// Byte offset of `reg` from the frame base.
pub const fn offset_of(reg: Reg) -> usize {
    slot_of(reg) * WORD
}

/// Every x1..x31 appears exactly once.
const fn layout_is_complete() -> bool {
    let mut seen = [false; 32];
    let mut slot = 0;
    while slot < FRAME_SLOTS {
        let x = SAVE_ORDER[slot] as usize;
        if x == 0 || seen[x] {
            return false;
        }
        seen[x] = true;
        slot += 1;
    }
    true
}

const_assert!(layout_is_complete());
const_assert_eq!(SAVE_ORDER[FRAME_SLOTS - 1] as usize, Reg::Sp as usize);
const_assert_eq!(size_of::<TrapFrame>(), FRAME_SLOTS * WORD);
const_assert_eq!(TRAP_FRAME_BYTES % 16, 0);
const_assert!(TRAP_FRAME_BYTES < 2048);
const_assert_eq!(offset_of(Reg::Ra), 0);
const_assert_eq!(offset_of(Reg::A0), 10 * WORD);
const_assert_eq!(offset_of(Reg::S0), 18 * WORD);
const_assert_eq!(offset_of(Reg::Sp), 30 * WORD);

/// Register state captured by the trap vector.
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    slots: [usize; FRAME_SLOTS],
}

impl TrapFrame {
    #[inline]
    pub fn get(&self, reg: Reg) -> usize {
        self.slots[slot_of(reg)]
    }

    #[inline]
    pub fn set(&mut self, reg: Reg, value: usize) {
        self.slots[slot_of(reg)] = value;
    }

    /// Stack pointer of the interrupted context.
    #[inline]
    pub fn sp(&self) -> usize {
        self.get(Reg::Sp)
    }

    /// Return address register of the interrupted context.
    #[inline]
    pub fn ra(&self) -> usize {
        self.get(Reg::Ra)
    }

    /// Argument register `a<n>`, `n` in `0..8`.
    #[inline]
    pub fn arg(&self, n: usize) -> usize {
        debug_assert!(n < 8, "a{n} is not an argument register");
        self.slots[slot_of(Reg::A0) + n]
    }
}

impl fmt::Debug for TrapFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for reg in SAVE_ORDER {
            map.entry(&reg.name(), &format_args!("{:#x}", self.get(reg)));
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_match_save_order() {
        for (slot, reg) in SAVE_ORDER.iter().enumerate() {
            assert_eq!(slot_of(*reg), slot);
            assert_eq!(offset_of(*reg), slot * WORD);
        }
    }

    #[test]
    fn field_addresses_follow_offsets() {
        let mut frame = TrapFrame::default();
        let base = &frame as *const TrapFrame as usize;
        for reg in SAVE_ORDER {
            frame.set(reg, reg.index());
            let addr = base + offset_of(reg);
            assert_eq!(unsafe { *(addr as *const usize) }, reg.index());
        }
    }

    #[test]
    fn argument_registers_are_contiguous() {
        let mut frame = TrapFrame::default();
        let args = [Reg::A0, Reg::A1, Reg::A2, Reg::A3, Reg::A4, Reg::A5, Reg::A6, Reg::A7];
        for (n, reg) in args.iter().enumerate() {
            frame.set(*reg, 0x100 + n);
        }
        for n in 0..8 {
            assert_eq!(frame.arg(n), 0x100 + n);
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "a8 is not an argument register")]
    fn argument_index_past_a7_is_rejected() {
        let mut frame = TrapFrame::default();
        frame.set(Reg::S0, 0x5050);
        frame.arg(8);
    }

    #[test]
    fn reserved_space_is_aligned_and_covers_frame() {
        assert!(TRAP_FRAME_BYTES >= size_of::<TrapFrame>());
        assert_eq!(TRAP_FRAME_BYTES % 16, 0);
    }

    #[test]
    fn debug_lists_registers_by_name() {
        let mut frame = TrapFrame::default();
        frame.set(Reg::Sp, 0x8020_f000);
        let out = format!("{frame:?}");
        assert!(out.contains("\"sp\": 0x8020f000"));
        assert!(out.starts_with("{\"ra\""));
    }
}
