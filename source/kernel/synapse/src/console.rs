// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Debug console on top of the SBI Console Putchar call.

use core::fmt::{self, Write};
use spin::Mutex;

use crate::sbi::{self, Ecall, Firmware};

/// Global console used for boot logs.
static CONSOLE: Mutex<SbiConsole<Firmware>> = Mutex::new(SbiConsole::new(Firmware));

/// Byte-at-a-time console writer with `\n` to `\r\n` translation.
#[derive(Clone, Copy)]
pub struct SbiConsole<E> {
    firmware: E,
}

impl<E: Ecall> SbiConsole<E> {
    /// Creates a console that emits through `firmware`.
    pub const fn new(firmware: E) -> Self {
        Self { firmware }
    }

    /// Emits one byte; the firmware's error code is intentionally dropped.
    #[inline]
    pub fn put_byte(&self, byte: u8) {
        let _ = sbi::console_putchar(&self.firmware, byte);
    }
}

impl<E: Ecall> Write for SbiConsole<E> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &byte in s.as_bytes() {
            if byte == b'\n' {
                self.put_byte(b'\r');
            }
            self.put_byte(byte);
        }
        Ok(())
    }
}

/// Returns a guard for the console singleton.
pub fn lock() -> spin::MutexGuard<'static, SbiConsole<Firmware>> {
    CONSOLE.lock()
}

/// Lock-free writer for trap/panic contexts where the mutex may already be held.
pub fn raw_writer() -> SbiConsole<Firmware> {
    SbiConsole::new(Firmware)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sbi::{ArgRegs, RetRegs, EID_CONSOLE_PUTCHAR};
    use core::cell::RefCell;

    #[derive(Default)]
    struct Tape(RefCell<Vec<u8>>);

    impl Ecall for &Tape {
        fn ecall(&self, args: ArgRegs) -> RetRegs {
            assert_eq!(args.0[7], EID_CONSOLE_PUTCHAR);
            assert_eq!(args.0[6], 0);
            self.0.borrow_mut().push(args.0[0] as u8);
            RetRegs::default()
        }
    }

    #[test]
    fn one_call_per_byte_with_crlf() {
        let tape = Tape::default();
        let mut console = SbiConsole::new(&tape);
        write!(console, "ok {}\n", 7).unwrap();
        assert_eq!(tape.0.borrow().as_slice(), b"ok 7\r\n");
    }
}
