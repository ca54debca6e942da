// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Supervisor call gateway into SBI firmware
//! OWNERS: @kernel-team
//! PUBLIC API: SbiCall, SbiRet, SbiError, Ecall, Firmware, call(), console_putchar()
//! DEPENDS_ON: core::arch::asm (OS target)
//! INVARIANTS: a0..a5 = args, a6 = fid, a7 = eid; result is (a0, a1) verbatim
//!
//! The gateway never interprets the firmware's answer. [`SbiRet::into_result`]
//! is offered to callers that want the standard error taxonomy applied.

use core::fmt;

pub mod base;

/// Legacy extension: write one character to the debug console.
pub const EID_CONSOLE_PUTCHAR: usize = 0x01;
/// Base extension: firmware identity and extension probing.
pub const EID_BASE: usize = 0x10;

/// Number of generic argument registers (`a0..=a5`).
pub const ARG_COUNT: usize = 6;

const SBI_SUCCESS: isize = 0;
const SBI_ERR_FAILED: isize = -1;
const SBI_ERR_NOT_SUPPORTED: isize = -2;
const SBI_ERR_INVALID_PARAM: isize = -3;
const SBI_ERR_DENIED: isize = -4;
const SBI_ERR_INVALID_ADDRESS: isize = -5;
const SBI_ERR_ALREADY_AVAILABLE: isize = -6;
const SBI_ERR_ALREADY_STARTED: isize = -7;
const SBI_ERR_ALREADY_STOPPED: isize = -8;

/// Argument registers `a0..=a7` exactly as loaded before `ecall`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArgRegs(pub [usize; 8]);

/// The `a0`/`a1` pair written back by the firmware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetRegs {
    pub a0: usize,
    pub a1: usize,
}

/// Issues the privileged call instruction.
///
/// The kernel implementation is [`Firmware`]; tests substitute a recorder.
pub trait Ecall {
    /// Loads `args` into `a0..=a7`, traps into the firmware and returns `a0`/`a1`.
    fn ecall(&self, args: ArgRegs) -> RetRegs;
}

/// A supervisor call request: six generic arguments plus function and
/// extension identifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SbiCall {
    pub args: [usize; ARG_COUNT],
    pub fid: usize,
    pub eid: usize,
}

impl SbiCall {
    /// Creates a request for `eid`/`fid` with all arguments zero.
    pub const fn new(eid: usize, fid: usize) -> Self {
        Self { args: [0; ARG_COUNT], fid, eid }
    }

    /// Sets argument `index` (0 maps to `a0`). Indices past `a5` trip a debug
    /// assertion and are ignored in release builds; `fid`/`eid` are not arguments.
    pub const fn arg(mut self, index: usize, value: usize) -> Self {
        debug_assert!(index < ARG_COUNT, "sbi argument index past a5");
        if index < ARG_COUNT {
            self.args[index] = value;
        }
        self
    }

    /// Register image for this request, indexed `a0..=a7`.
    pub const fn registers(&self) -> ArgRegs {
        let a = &self.args;
        ArgRegs([a[0], a[1], a[2], a[3], a[4], a[5], self.fid, self.eid])
    }
}

/// Firmware result record `{error, value}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SbiRet {
    pub error: isize,
    pub value: usize,
}

impl SbiRet {
    /// Decodes the two result registers without interpretation.
    pub const fn from_registers(ret: RetRegs) -> Self {
        Self { error: ret.a0 as isize, value: ret.a1 }
    }

    /// Returns `true` when the firmware reported `SBI_SUCCESS`.
    pub const fn is_ok(&self) -> bool {
        self.error == SBI_SUCCESS
    }

    /// Applies the standard SBI error taxonomy.
    pub fn into_result(self) -> Result<usize, SbiError> {
        match SbiError::from_code(self.error) {
            None => Ok(self.value),
            Some(err) => Err(err),
        }
    }
}

/// Standard SBI error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SbiError {
    Failed,
    NotSupported,
    InvalidParam,
    Denied,
    InvalidAddress,
    AlreadyAvailable,
    AlreadyStarted,
    AlreadyStopped,
    /// Vendor or future error code.
    Other(isize),
}

impl SbiError {
    /// Maps an `error` register value; `SBI_SUCCESS` yields `None`.
    pub const fn from_code(code: isize) -> Option<Self> {
        Some(match code {
            SBI_SUCCESS => return None,
            SBI_ERR_FAILED => Self::Failed,
            SBI_ERR_NOT_SUPPORTED => Self::NotSupported,
            SBI_ERR_INVALID_PARAM => Self::InvalidParam,
            SBI_ERR_DENIED => Self::Denied,
            SBI_ERR_INVALID_ADDRESS => Self::InvalidAddress,
            SBI_ERR_ALREADY_AVAILABLE => Self::AlreadyAvailable,
            SBI_ERR_ALREADY_STARTED => Self::AlreadyStarted,
            SBI_ERR_ALREADY_STOPPED => Self::AlreadyStopped,
            other => Self::Other(other),
        })
    }

    /// Raw error register value.
    pub const fn code(self) -> isize {
        match self {
            Self::Failed => SBI_ERR_FAILED,
            Self::NotSupported => SBI_ERR_NOT_SUPPORTED,
            Self::InvalidParam => SBI_ERR_INVALID_PARAM,
            Self::Denied => SBI_ERR_DENIED,
            Self::InvalidAddress => SBI_ERR_INVALID_ADDRESS,
            Self::AlreadyAvailable => SBI_ERR_ALREADY_AVAILABLE,
            Self::AlreadyStarted => SBI_ERR_ALREADY_STARTED,
            Self::AlreadyStopped => SBI_ERR_ALREADY_STOPPED,
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for SbiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed => f.write_str("failed"),
            Self::NotSupported => f.write_str("not supported"),
            Self::InvalidParam => f.write_str("invalid parameter"),
            Self::Denied => f.write_str("denied"),
            Self::InvalidAddress => f.write_str("invalid address"),
            Self::AlreadyAvailable => f.write_str("already available"),
            Self::AlreadyStarted => f.write_str("already started"),
            Self::AlreadyStopped => f.write_str("already stopped"),
            Self::Other(code) => write!(f, "sbi error {code}"),
        }
    }
}

/// The SBI firmware reached through `ecall`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Firmware;

impl Ecall for Firmware {
    #[inline]
    fn ecall(&self, args: ArgRegs) -> RetRegs {
        #[cfg(all(target_arch = "riscv64", target_os = "none"))]
        {
            let [a0, a1, a2, a3, a4, a5, a6, a7] = args.0;
            let error: usize;
            let value: usize;
            // SAFETY: SBI calls clobber only a0/a1; the firmware owns any memory
            // it touches on our behalf.
            unsafe {
                core::arch::asm!(
                    "ecall",
                    inlateout("a0") a0 => error,
                    inlateout("a1") a1 => value,
                    in("a2") a2,
                    in("a3") a3,
                    in("a4") a4,
                    in("a5") a5,
                    in("a6") a6,
                    in("a7") a7,
                    options(nostack)
                );
            }
            RetRegs { a0: error, a1: value }
        }
        #[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
        {
            let _ = args;
            RetRegs { a0: SBI_ERR_NOT_SUPPORTED as usize, a1: 0 }
        }
    }
}

/// Places `request` into the call registers, traps and decodes the result.
#[inline]
pub fn call<E: Ecall + ?Sized>(firmware: &E, request: &SbiCall) -> SbiRet {
    SbiRet::from_registers(firmware.ecall(request.registers()))
}

/// Legacy Console Putchar (eid 1, fid 0): emits `byte` on the debug console.
#[inline]
pub fn console_putchar<E: Ecall + ?Sized>(firmware: &E, byte: u8) -> SbiRet {
    call(firmware, &SbiCall::new(EID_CONSOLE_PUTCHAR, 0).arg(0, byte as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct Recorder {
        seen: Cell<ArgRegs>,
        reply: RetRegs,
    }

    impl Ecall for Recorder {
        fn ecall(&self, args: ArgRegs) -> RetRegs {
            self.seen.set(args);
            self.reply
        }
    }

    #[test]
    fn putchar_places_char_in_a0() {
        let fw = Recorder { seen: Cell::new(ArgRegs::default()), reply: RetRegs::default() };
        let ret = console_putchar(&fw, b'A');
        assert_eq!(fw.seen.get(), ArgRegs([0x41, 0, 0, 0, 0, 0, 0, 1]));
        assert!(ret.is_ok());
    }

    #[test]
    fn fid_and_eid_land_in_a6_a7() {
        let fw = Recorder { seen: Cell::new(ArgRegs::default()), reply: RetRegs::default() };
        call(&fw, &SbiCall::new(0x5449_4d45, 3).arg(5, 9));
        assert_eq!(fw.seen.get().0, [0, 0, 0, 0, 0, 9, 3, 0x5449_4d45]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "sbi argument index past a5")]
    fn arg_index_six_is_not_fid() {
        let _ = SbiCall::new(1, 0).arg(6, 7);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn arg_out_of_range_is_ignored_in_release() {
        assert_eq!(SbiCall::new(1, 0).arg(6, 7), SbiCall::new(1, 0));
    }

    #[test]
    fn error_register_is_reported_verbatim() {
        let fw = Recorder {
            seen: Cell::new(ArgRegs::default()),
            reply: RetRegs { a0: -2isize as usize, a1: 0x55 },
        };
        let ret = call(&fw, &SbiCall::new(EID_BASE, 3));
        assert_eq!(ret, SbiRet { error: -2, value: 0x55 });
        assert_eq!(ret.into_result(), Err(SbiError::NotSupported));
    }

    #[test]
    fn error_codes_roundtrip() {
        for code in -9isize..=0 {
            match SbiError::from_code(code) {
                None => assert_eq!(code, 0),
                Some(err) => assert_eq!(err.code(), code),
            }
        }
        assert_eq!(SbiError::from_code(-100), Some(SbiError::Other(-100)));
    }

    #[test]
    fn host_firmware_reports_not_supported() {
        let ret = console_putchar(&Firmware, b'x');
        assert_eq!(ret.into_result(), Err(SbiError::NotSupported));
    }
}
