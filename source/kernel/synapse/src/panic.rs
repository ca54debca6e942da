// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Kernel panic path: one diagnostic line, then halt
//! OWNERS: @kernel-team
//! PUBLIC API: panic handler (no_std), write_report(), halt()
//! DEPENDS_ON: console::raw_writer(), arch::riscv
//! INVARIANTS: No allocation; no console lock; never returns

use core::fmt::{self, Write};
use core::panic::Location;

/// Formats `PANIC: <file>:<line>: <message>` followed by a newline.
pub fn write_report<W: Write>(
    w: &mut W,
    location: Option<&Location<'_>>,
    message: impl fmt::Display,
) -> fmt::Result {
    w.write_str("PANIC: ")?;
    if let Some(location) = location {
        write!(w, "{}:{}: ", location.file(), location.line())?;
    }
    writeln!(w, "{message}")
}

/// Masks interrupts and parks the hart forever.
pub fn halt() -> ! {
    crate::arch::riscv::disable_interrupts();
    loop {
        crate::arch::riscv::wait_for_interrupt();
    }
}

#[cfg(all(target_os = "none", not(test)))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo<'_>) -> ! {
    // The console mutex may be held by the code that faulted.
    let mut w = crate::console::raw_writer();
    let _ = write_report(&mut w, info.location(), info.message());
    halt()
}
