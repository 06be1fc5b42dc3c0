//! The kernel's text output. Bytes go to the QEMU/Bochs debug console port, which the emulator
//! can redirect to a file or stdio with `-debugcon`.

use core::fmt::{Error, Write};

use crate::arch::PortIo;
#[cfg(target_arch = "x86")]
use crate::arch::x86::{HardwarePorts, I386};
#[cfg(target_arch = "x86")]
use crate::sync::IrqMutex;

/// Port the `-debugcon` device listens on.
pub const DEBUG_CONSOLE_PORT: u16 = 0xE9;

/// Shared by tasks and interrupt handlers, so it masks interrupts while held.
#[cfg(target_arch = "x86")]
pub static CONSOLE: IrqMutex<Console<HardwarePorts>, I386> =
    IrqMutex::new(Console::new(HardwarePorts, DEBUG_CONSOLE_PORT));

pub struct Console<P: PortIo> {
    io: P,
    port: u16,
}

impl<P: PortIo> Console<P> {
    pub const fn new(io: P, port: u16) -> Console<P> {
        Console { io, port }
    }

    pub fn write_byte(&mut self, byte: u8) {
        // SAFETY: the debug console port accepts any byte and has no other side effects.
        unsafe { self.io.write_u8(self.port, byte) };
    }

    /// Prints a string as-is. Non-ASCII characters are passed through as their UTF-8 bytes.
    pub fn print(&mut self, text: &str) {
        for byte in text.bytes() {
            self.write_byte(byte);
        }
    }
}

impl<P: PortIo> Write for Console<P> {
    fn write_str(&mut self, s: &str) -> Result<(), Error> {
        self.print(s);
        Ok(())
    }
}
