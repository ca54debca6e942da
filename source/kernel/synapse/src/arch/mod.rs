// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: ISA glue for the supervisor kernel
//! OWNERS: @kernel-arch-team
//! PUBLIC API: arch::riscv (CSR access, wfi, bss clearing)
//! INVARIANTS: Raw instructions live here only; every helper builds on the host

pub mod riscv;
