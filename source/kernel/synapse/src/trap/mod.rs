// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Trap dispatch: cause decoding and fatal escalation
//! OWNERS: @kernel-team
//! PUBLIC API: install_trap_vector(), handle_trap(), TrapInfo, TrapCause, TrapCategory
//! DEPENDS_ON: trap::entry (OS target), arch::riscv CSR reads, panic
//! INVARIANTS: Dispatcher returns to the vector or panics; no context switch;
//!             a trap taken while another is being handled is fatal
//!
//! Hardware clears `sstatus.SIE` on entry and nothing here sets it again, so
//! only a synchronous fault inside the handler can nest. [`TrapDepth`] catches
//! that case before the half-built outer frame can be resumed.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

pub mod frame;

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
mod entry;

#[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
pub mod model;

pub use frame::{Reg, TrapFrame};

const INTERRUPT_FLAG: usize = usize::MAX - (usize::MAX >> 1);

/// Hardware-reported trap metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrapInfo {
    pub scause: usize,
    pub stval: usize,
    pub sepc: usize,
}

impl TrapInfo {
    /// Snapshot of `scause`, `stval` and `sepc`.
    #[inline]
    pub fn read() -> Self {
        let (scause, stval, sepc) = crate::arch::riscv::read_trap_csrs();
        Self { scause, stval, sepc }
    }

    #[inline]
    pub const fn cause(&self) -> TrapCause {
        TrapCause::from_scause(self.scause)
    }
}

impl fmt::Display for TrapInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scause={:#x} ({}), stval={:#x}, sepc={:#x}",
            self.scause,
            self.cause().name(),
            self.stval,
            self.sepc
        )
    }
}

/// Decoded `scause`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapCause {
    SoftwareInterrupt,
    TimerInterrupt,
    ExternalInterrupt,
    UnknownInterrupt(usize),
    InstructionMisaligned,
    InstructionAccessFault,
    IllegalInstruction,
    Breakpoint,
    LoadMisaligned,
    LoadAccessFault,
    StoreMisaligned,
    StoreAccessFault,
    UserEnvCall,
    SupervisorEnvCall,
    InstructionPageFault,
    LoadPageFault,
    StorePageFault,
    UnknownException(usize),
}

impl TrapCause {
    pub const fn from_scause(scause: usize) -> Self {
        let code = scause & !INTERRUPT_FLAG;
        if scause & INTERRUPT_FLAG != 0 {
            match code {
                1 => Self::SoftwareInterrupt,
                5 => Self::TimerInterrupt,
                9 => Self::ExternalInterrupt,
                other => Self::UnknownInterrupt(other),
            }
        } else {
            match code {
                0 => Self::InstructionMisaligned,
                1 => Self::InstructionAccessFault,
                2 => Self::IllegalInstruction,
                3 => Self::Breakpoint,
                4 => Self::LoadMisaligned,
                5 => Self::LoadAccessFault,
                6 => Self::StoreMisaligned,
                7 => Self::StoreAccessFault,
                8 => Self::UserEnvCall,
                9 => Self::SupervisorEnvCall,
                12 => Self::InstructionPageFault,
                13 => Self::LoadPageFault,
                15 => Self::StorePageFault,
                other => Self::UnknownException(other),
            }
        }
    }

    pub const fn is_interrupt(self) -> bool {
        matches!(
            self,
            Self::SoftwareInterrupt
                | Self::TimerInterrupt
                | Self::ExternalInterrupt
                | Self::UnknownInterrupt(_)
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::SoftwareInterrupt => "supervisor software interrupt",
            Self::TimerInterrupt => "supervisor timer interrupt",
            Self::ExternalInterrupt => "supervisor external interrupt",
            Self::UnknownInterrupt(_) => "interrupt",
            Self::InstructionMisaligned => "instruction address misaligned",
            Self::InstructionAccessFault => "instruction access fault",
            Self::IllegalInstruction => "illegal instruction",
            Self::Breakpoint => "breakpoint",
            Self::LoadMisaligned => "load address misaligned",
            Self::LoadAccessFault => "load access fault",
            Self::StoreMisaligned => "store/AMO address misaligned",
            Self::StoreAccessFault => "store/AMO access fault",
            Self::UserEnvCall => "environment call from U-mode",
            Self::SupervisorEnvCall => "environment call from S-mode",
            Self::InstructionPageFault => "instruction page fault",
            Self::LoadPageFault => "load page fault",
            Self::StorePageFault => "store/AMO page fault",
            Self::UnknownException(_) => "exception",
        }
    }

    pub const fn category(self) -> TrapCategory {
        match self {
            Self::TimerInterrupt => TrapCategory::Timer,
            Self::ExternalInterrupt => TrapCategory::External,
            Self::SoftwareInterrupt | Self::UnknownInterrupt(_) => TrapCategory::OtherInterrupt,
            Self::InstructionPageFault | Self::LoadPageFault | Self::StorePageFault => {
                TrapCategory::PageFault
            }
            Self::IllegalInstruction => TrapCategory::IllegalInstruction,
            Self::UserEnvCall | Self::SupervisorEnvCall => TrapCategory::EnvironmentCall,
            Self::InstructionMisaligned
            | Self::InstructionAccessFault
            | Self::Breakpoint
            | Self::LoadMisaligned
            | Self::LoadAccessFault
            | Self::StoreMisaligned
            | Self::StoreAccessFault
            | Self::UnknownException(_) => TrapCategory::Fault,
        }
    }
}

/// Routing classes for the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapCategory {
    Timer,
    External,
    OtherInterrupt,
    PageFault,
    IllegalInstruction,
    EnvironmentCall,
    Fault,
}

/// Tracks whether a trap is currently being handled.
pub struct TrapDepth {
    active: AtomicBool,
}

impl TrapDepth {
    pub const fn new() -> Self {
        Self { active: AtomicBool::new(false) }
    }

    /// Marks a trap as in progress; `None` if one already is.
    pub fn enter(&self) -> Option<TrapDepthGuard<'_>> {
        if self.active.swap(true, Ordering::Acquire) {
            None
        } else {
            Some(TrapDepthGuard { depth: self })
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

impl Default for TrapDepth {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the in-trap mark when the dispatcher returns.
pub struct TrapDepthGuard<'a> {
    depth: &'a TrapDepth,
}

impl Drop for TrapDepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.active.store(false, Ordering::Release);
    }
}

#[cfg_attr(not(all(target_arch = "riscv64", target_os = "none")), allow(dead_code))]
static TRAP_DEPTH: TrapDepth = TrapDepth::new();

/// Routes a trap. Returning resumes the interrupted context from `frame`.
///
/// No category has a handler yet, so every trap is fatal.
pub fn handle_trap(frame: &mut TrapFrame, info: TrapInfo) {
    match info.cause().category() {
        TrapCategory::Timer
        | TrapCategory::External
        | TrapCategory::OtherInterrupt
        | TrapCategory::PageFault
        | TrapCategory::IllegalInstruction
        | TrapCategory::EnvironmentCall
        | TrapCategory::Fault => unexpected_trap(frame, info),
    }
}

#[cold]
fn unexpected_trap(frame: &TrapFrame, info: TrapInfo) -> ! {
    panic!("unexpected trap: {info}, ra={:#x}, sp={:#x}", frame.ra(), frame.sp())
}

#[cold]
#[cfg_attr(not(all(target_arch = "riscv64", target_os = "none")), allow(dead_code))]
fn nested_trap(info: TrapInfo) -> ! {
    panic!("nested trap: {info}")
}

/// Called by the vector with the frame it just built.
#[cfg_attr(not(all(target_arch = "riscv64", target_os = "none")), allow(dead_code))]
extern "C" fn trap_entry_rust(frame: &mut TrapFrame) {
    let info = TrapInfo::read();
    let Some(_guard) = TRAP_DEPTH.enter() else {
        nested_trap(info);
    };
    handle_trap(frame, info);
}

/// Points `stvec` at the trap vector. Call once during early boot, before
/// any interrupt source is enabled.
///
/// # Safety
///
/// Privileged; the kernel stack must be valid since traps run on it.
#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub unsafe fn install_trap_vector() {
    unsafe { crate::arch::riscv::configure_traps(entry::__synapse_trap_entry as usize) };
}
