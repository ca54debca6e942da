// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! SBI Base extension queries used by the boot banner.

use core::fmt;

use bitflags::bitflags;

use super::{call, Ecall, SbiCall, SbiError, EID_BASE, EID_CONSOLE_PUTCHAR};

const FID_SPEC_VERSION: usize = 0;
const FID_IMPL_ID: usize = 1;
const FID_IMPL_VERSION: usize = 2;
const FID_PROBE_EXTENSION: usize = 3;

const EID_TIME: usize = 0x5449_4d45;
const EID_IPI: usize = 0x0073_5049;
const EID_RFENCE: usize = 0x5246_4e43;
const EID_HSM: usize = 0x0048_534d;
const EID_SRST: usize = 0x5352_5354;
const EID_DBCN: usize = 0x4442_434e;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    /// Extensions the firmware reported as available.
    pub struct Extensions: u32 {
        const CONSOLE_PUTCHAR = 1 << 0;
        const TIME = 1 << 1;
        const IPI = 1 << 2;
        const RFENCE = 1 << 3;
        const HSM = 1 << 4;
        const SRST = 1 << 5;
        const DBCN = 1 << 6;
    }
}

const PROBED: [(Extensions, usize); 7] = [
    (Extensions::CONSOLE_PUTCHAR, EID_CONSOLE_PUTCHAR),
    (Extensions::TIME, EID_TIME),
    (Extensions::IPI, EID_IPI),
    (Extensions::RFENCE, EID_RFENCE),
    (Extensions::HSM, EID_HSM),
    (Extensions::SRST, EID_SRST),
    (Extensions::DBCN, EID_DBCN),
];

/// SBI specification version as `major.minor`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpecVersion {
    pub major: usize,
    pub minor: usize,
}

impl SpecVersion {
    /// Decodes bits `[30:24]` (major) and `[23:0]` (minor).
    pub const fn from_raw(raw: usize) -> Self {
        Self { major: (raw >> 24) & 0x7f, minor: raw & 0x00ff_ffff }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Identity of the running SBI implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FirmwareInfo {
    pub spec: SpecVersion,
    pub impl_id: usize,
    pub impl_version: usize,
    pub extensions: Extensions,
}

impl FirmwareInfo {
    /// Queries the Base extension. Fails only if the Base extension itself fails.
    pub fn query<E: Ecall + ?Sized>(firmware: &E) -> Result<Self, SbiError> {
        let spec = SpecVersion::from_raw(base_call(firmware, FID_SPEC_VERSION, 0)?);
        let impl_id = base_call(firmware, FID_IMPL_ID, 0)?;
        let impl_version = base_call(firmware, FID_IMPL_VERSION, 0)?;
        Ok(Self { spec, impl_id, impl_version, extensions: probe_all(firmware) })
    }

    /// Well-known implementation name, if registered.
    pub const fn impl_name(&self) -> Option<&'static str> {
        Some(match self.impl_id {
            0 => "Berkeley Boot Loader",
            1 => "OpenSBI",
            2 => "Xvisor",
            3 => "KVM",
            4 => "RustSBI",
            5 => "Diosix",
            6 => "Coffer",
            7 => "Xen",
            8 => "PolarFire HSS",
            _ => return None,
        })
    }
}

/// Probes a single extension id; `Ok(false)` means absent.
pub fn probe_extension<E: Ecall + ?Sized>(firmware: &E, eid: usize) -> Result<bool, SbiError> {
    base_call(firmware, FID_PROBE_EXTENSION, eid).map(|value| value != 0)
}

fn probe_all<E: Ecall + ?Sized>(firmware: &E) -> Extensions {
    PROBED
        .iter()
        .filter(|(_, eid)| matches!(probe_extension(firmware, *eid), Ok(true)))
        .fold(Extensions::empty(), |acc, (flag, _)| acc | *flag)
}

fn base_call<E: Ecall + ?Sized>(firmware: &E, fid: usize, arg0: usize) -> Result<usize, SbiError> {
    call(firmware, &SbiCall::new(EID_BASE, fid).arg(0, arg0)).into_result()
}
