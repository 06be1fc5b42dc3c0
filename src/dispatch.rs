//! What each interrupt vector does, independent of how the CPU got there.
//!
//! The x86 entry stubs in `arch::x86::interrupt::handler` only save registers and call into the
//! functions here with the real PIC, keyboard and scheduler. Keeping the bodies generic lets the
//! ordering rules be tested on the host: a hardware line is always acknowledged before anything
//! that might switch tasks.

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicU64, Ordering};

use crate::arch::x86::interrupt::handler::InterruptStackFrame;
use crate::arch::x86::pic::{InterruptController, KEYBOARD_LINE, TIMER_LINE};

/// Text the software test vector prints.
pub const TEST_INTERRUPT_MESSAGE: &str = "INT 0x80 fired!\n";

/// Counts timer interrupts since boot. Only the timer handler writes it.
pub struct TickCounter(AtomicU64);

impl TickCounter {
    pub const fn new() -> TickCounter {
        TickCounter(AtomicU64::new(0))
    }

    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

pub static TICKS: TickCounter = TickCounter::new();

/// Timer interrupts since boot.
pub fn ticks() -> u64 {
    TICKS.get()
}

/// Consumer of keyboard interrupts. It must only move data out of the hardware.
pub trait KeyboardSink {
    fn handle_interrupt(&self);
}

/// IRQ0: count the tick, re-arm the line, then let the scheduler switch if it wants to. The
/// acknowledgement comes first because `preempt` may not return until this task runs again.
pub fn timer_tick<P, F>(ticks: &TickCounter, pic: &mut P, preempt: F)
where
    P: InterruptController,
    F: FnOnce(),
{
    ticks.tick();
    pic.end_of_interrupt(TIMER_LINE);
    preempt();
}

/// IRQ1: hand the scan code to the keyboard, then re-arm the line.
pub fn keyboard_data<P, K>(keyboard: &K, pic: &mut P)
where
    P: InterruptController,
    K: KeyboardSink + ?Sized,
{
    keyboard.handle_interrupt();
    pic.end_of_interrupt(KEYBOARD_LINE);
}

/// The software test vector. It only proves the table and the stubs work end to end.
pub fn test_interrupt<W: Write>(terminal: &mut W) -> fmt::Result {
    terminal.write_str(TEST_INTERRUPT_MESSAGE)
}

/// Describes a fault nothing can recover from. The caller halts afterwards.
pub fn report_fault<W: Write>(
    terminal: &mut W,
    name: &str,
    frame: &InterruptStackFrame,
    error_code: Option<u32>,
) -> fmt::Result {
    write!(terminal, "\nEXCEPTION: {}", name)?;
    if let Some(code) = error_code {
        write!(terminal, " (error code {:#x})", code)?;
    }
    writeln!(terminal)?;
    writeln!(terminal, "{:#x?}", frame)
}
