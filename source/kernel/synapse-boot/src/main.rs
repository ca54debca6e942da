// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Boot wrapper for the SYNAPSE kernel. `_start` is the first instruction
//! executed after firmware hands over: it sets up the stack and global
//! pointer and jumps into `start_rust`, which runs early init and `kmain`.
#![cfg_attr(target_os = "none", no_std, no_main)]

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
core::arch::global_asm!(
    r#"
    .pushsection .text.boot, "ax", @progbits
    .globl _start
    .align 4
_start:
    la   sp, __stack_top
    .option push
    .option norelax
    la   gp, __global_pointer$
    .option pop
    j    start_rust
    .popsection
"#
);

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
#[no_mangle]
pub extern "C" fn start_rust() -> ! {
    // SAFETY: sole hart, stack just set up by `_start`, nothing else has run.
    unsafe { synapse::early_boot_init() };
    synapse::kmain()
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("synapse-boot only runs on riscv64gc-unknown-none-elf");
}
