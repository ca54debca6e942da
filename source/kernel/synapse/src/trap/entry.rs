// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Supervisor trap vector (enter/leave)
//! OWNERS: @kernel-team
//! PUBLIC API: __synapse_trap_entry (installed in stvec)
//! DEPENDS_ON: trap::frame::{offset_of, TRAP_FRAME_BYTES}, trap::trap_entry_rust
//! INVARIANTS: stores and loads use offset_of() exclusively; nothing touches
//!             memory below the old sp before the frame is reserved; sp is
//!             restored last
//!
//! Enter: copy `sp` to `sscratch`, reserve the frame on the interrupted stack,
//! store x1..x31 except `sp`, then recover the old `sp` through `sscratch`
//! (using the already-saved `a0` as scratch) and store it into its slot.
//! Dispatch: `a0` = frame base, `call trap_entry_rust`.
//! Leave: load every register in reverse slot order, `sp` last, then `sret`.
//!
//! The frame is addressed through `sp`, which the callee preserves per the
//! calling convention, so the dispatcher may clobber anything else.

use super::frame::{offset_of, Reg, TRAP_FRAME_BYTES};

core::arch::global_asm!(
    r#"
    .pushsection .text.trap_entry, "ax", @progbits
    .globl __synapse_trap_entry
    .balign 4
__synapse_trap_entry:
    csrw sscratch, sp
    addi sp, sp, -{frame_bytes}
    sd   ra,  {off_ra}(sp)
    sd   gp,  {off_gp}(sp)
    sd   tp,  {off_tp}(sp)
    sd   t0,  {off_t0}(sp)
    sd   t1,  {off_t1}(sp)
    sd   t2,  {off_t2}(sp)
    sd   t3,  {off_t3}(sp)
    sd   t4,  {off_t4}(sp)
    sd   t5,  {off_t5}(sp)
    sd   t6,  {off_t6}(sp)
    sd   a0,  {off_a0}(sp)
    sd   a1,  {off_a1}(sp)
    sd   a2,  {off_a2}(sp)
    sd   a3,  {off_a3}(sp)
    sd   a4,  {off_a4}(sp)
    sd   a5,  {off_a5}(sp)
    sd   a6,  {off_a6}(sp)
    sd   a7,  {off_a7}(sp)
    sd   s0,  {off_s0}(sp)
    sd   s1,  {off_s1}(sp)
    sd   s2,  {off_s2}(sp)
    sd   s3,  {off_s3}(sp)
    sd   s4,  {off_s4}(sp)
    sd   s5,  {off_s5}(sp)
    sd   s6,  {off_s6}(sp)
    sd   s7,  {off_s7}(sp)
    sd   s8,  {off_s8}(sp)
    sd   s9,  {off_s9}(sp)
    sd   s10, {off_s10}(sp)
    sd   s11, {off_s11}(sp)

    csrr a0, sscratch
    sd   a0,  {off_sp}(sp)

    mv   a0, sp
    call {dispatch}

    ld   s11, {off_s11}(sp)
    ld   s10, {off_s10}(sp)
    ld   s9,  {off_s9}(sp)
    ld   s8,  {off_s8}(sp)
    ld   s7,  {off_s7}(sp)
    ld   s6,  {off_s6}(sp)
    ld   s5,  {off_s5}(sp)
    ld   s4,  {off_s4}(sp)
    ld   s3,  {off_s3}(sp)
    ld   s2,  {off_s2}(sp)
    ld   s1,  {off_s1}(sp)
    ld   s0,  {off_s0}(sp)
    ld   a7,  {off_a7}(sp)
    ld   a6,  {off_a6}(sp)
    ld   a5,  {off_a5}(sp)
    ld   a4,  {off_a4}(sp)
    ld   a3,  {off_a3}(sp)
    ld   a2,  {off_a2}(sp)
    ld   a1,  {off_a1}(sp)
    ld   a0,  {off_a0}(sp)
    ld   t6,  {off_t6}(sp)
    ld   t5,  {off_t5}(sp)
    ld   t4,  {off_t4}(sp)
    ld   t3,  {off_t3}(sp)
    ld   t2,  {off_t2}(sp)
    ld   t1,  {off_t1}(sp)
    ld   t0,  {off_t0}(sp)
    ld   tp,  {off_tp}(sp)
    ld   gp,  {off_gp}(sp)
    ld   ra,  {off_ra}(sp)
    ld   sp,  {off_sp}(sp)
    sret
    .popsection
"#,
    frame_bytes = const TRAP_FRAME_BYTES,
    off_ra = const offset_of(Reg::Ra),
    off_gp = const offset_of(Reg::Gp),
    off_tp = const offset_of(Reg::Tp),
    off_t0 = const offset_of(Reg::T0),
    off_t1 = const offset_of(Reg::T1),
    off_t2 = const offset_of(Reg::T2),
    off_t3 = const offset_of(Reg::T3),
    off_t4 = const offset_of(Reg::T4),
    off_t5 = const offset_of(Reg::T5),
    off_t6 = const offset_of(Reg::T6),
    off_a0 = const offset_of(Reg::A0),
    off_a1 = const offset_of(Reg::A1),
    off_a2 = const offset_of(Reg::A2),
    off_a3 = const offset_of(Reg::A3),
    off_a4 = const offset_of(Reg::A4),
    off_a5 = const offset_of(Reg::A5),
    off_a6 = const offset_of(Reg::A6),
    off_a7 = const offset_of(Reg::A7),
    off_s0 = const offset_of(Reg::S0),
    off_s1 = const offset_of(Reg::S1),
    off_s2 = const offset_of(Reg::S2),
    off_s3 = const offset_of(Reg::S3),
    off_s4 = const offset_of(Reg::S4),
    off_s5 = const offset_of(Reg::S5),
    off_s6 = const offset_of(Reg::S6),
    off_s7 = const offset_of(Reg::S7),
    off_s8 = const offset_of(Reg::S8),
    off_s9 = const offset_of(Reg::S9),
    off_s10 = const offset_of(Reg::S10),
    off_s11 = const offset_of(Reg::S11),
    off_sp = const offset_of(Reg::Sp),
    dispatch = sym super::trap_entry_rust,
);

extern "C" {
    /// Trap vector entry point; never called directly.
    pub fn __synapse_trap_entry();
}
