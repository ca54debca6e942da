// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! SYNAPSE: minimal RISC-V supervisor kernel core.
//!
//! Boot handoff, the trap context switch and dispatcher, the physical frame
//! allocator, and the SBI call gateway. Everything except the raw
//! instructions builds on the host so the register layout, allocator and
//! marshaling logic run under `cargo test`.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), forbid(clippy::unwrap_used))]

#[macro_use]
pub mod log;

pub mod arch;
pub mod boot;
pub mod console;
pub mod heap;
pub mod layout;
pub mod mm;
pub mod panic;
pub mod sbi;
pub mod trap;

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub use boot::{early_boot_init, kmain};
