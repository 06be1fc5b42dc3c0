//! The pair of cascaded 8259 Programmable Interrupt Controllers.
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │   PIC 1     │     │   PIC 2     │
//! │  (Master)   │◀────│  (Slave)    │
//! │ IRQ 0-7     │     │ IRQ 8-15    │
//! └─────────────┘     └─────────────┘
//!       │
//!       ▼
//!      CPU
//! ```
//!
//! Out of reset both chips deliver on vectors that collide with CPU exceptions, so
//! `initialize` moves them to `PIC_1_OFFSET` and `PIC_2_OFFSET`.

use crate::arch::PortIo;
use crate::config::{PIC_1_OFFSET, PIC_2_OFFSET};

const MASTER_COMMAND: u16 = 0x20;
const MASTER_DATA: u16 = 0x21;
const SLAVE_COMMAND: u16 = 0xA0;
const SLAVE_DATA: u16 = 0xA1;

/// Writing anything here takes long enough for the PIC to settle between init words.
const WAIT_PORT: u16 = 0x80;

const ICW1_INIT: u8 = 0x10;
const ICW1_ICW4: u8 = 0x01;
const ICW4_8086: u8 = 0x01;
const END_OF_INTERRUPT: u8 = 0x20;

/// The slave hangs off master line 2.
const CASCADE_LINE: u8 = 2;

pub const TIMER_LINE: u8 = 0;
pub const KEYBOARD_LINE: u8 = 1;

/// Anything that must be told when a hardware interrupt has been serviced.
pub trait InterruptController {
    /// Re-arms `line` (0-15). Until this is called the line will not fire again.
    fn end_of_interrupt(&mut self, line: u8);
}

#[cfg(target_arch = "x86")]
pub static PICS: spin::Mutex<ChainedPics<crate::arch::x86::HardwarePorts>> = spin::Mutex::new(
    ChainedPics::new(crate::arch::x86::HardwarePorts, PIC_1_OFFSET, PIC_2_OFFSET),
);

pub struct ChainedPics<P: PortIo> {
    io: P,
    master_offset: u8,
    slave_offset: u8,
}

impl<P: PortIo> ChainedPics<P> {
    pub const fn new(io: P, master_offset: u8, slave_offset: u8) -> ChainedPics<P> {
        ChainedPics {
            io,
            master_offset,
            slave_offset,
        }
    }

    /// Vector a given IRQ line is delivered on after `initialize`.
    pub fn vector(&self, line: u8) -> u8 {
        if line < 8 {
            self.master_offset + line
        } else {
            self.slave_offset + (line - 8)
        }
    }

    /// Remaps both chips and unmasks only the timer and keyboard lines.
    ///
    /// ## Safety
    ///
    /// Must run with interrupts disabled, and handlers must be installed on the remapped timer
    /// and keyboard vectors before interrupts are enabled.
    pub unsafe fn initialize(&mut self) {
        self.write(MASTER_COMMAND, ICW1_INIT | ICW1_ICW4);
        self.write(SLAVE_COMMAND, ICW1_INIT | ICW1_ICW4);

        self.write(MASTER_DATA, self.master_offset);
        self.write(SLAVE_DATA, self.slave_offset);

        self.write(MASTER_DATA, 1 << CASCADE_LINE);
        self.write(SLAVE_DATA, CASCADE_LINE);

        self.write(MASTER_DATA, ICW4_8086);
        self.write(SLAVE_DATA, ICW4_8086);

        let master_mask = !((1 << TIMER_LINE) | (1 << KEYBOARD_LINE));
        self.io.write_u8(MASTER_DATA, master_mask);
        self.io.write_u8(SLAVE_DATA, 0xFF);
    }

    unsafe fn write(&mut self, port: u16, value: u8) {
        self.io.write_u8(port, value);
        self.io.write_u8(WAIT_PORT, 0);
    }
}

impl<P: PortIo> InterruptController for ChainedPics<P> {
    fn end_of_interrupt(&mut self, line: u8) {
        debug_assert!(line < 16, "IRQ line {} out of range", line);

        // SAFETY: writing EOI to the command ports only acknowledges the in-service interrupt.
        unsafe {
            if line >= 8 {
                self.io.write_u8(SLAVE_COMMAND, END_OF_INTERRUPT);
            }
            self.io.write_u8(MASTER_COMMAND, END_OF_INTERRUPT);
        }
    }
}

/// Locks the controller only for the duration of the acknowledgement, so a handler that goes on
/// to switch tasks does not carry the lock with it.
impl<P: PortIo> InterruptController for &spin::Mutex<ChainedPics<P>> {
    fn end_of_interrupt(&mut self, line: u8) {
        self.lock().end_of_interrupt(line);
    }
}
