//! Architecture seams.
//!
//! The scheduler and the IDT builder only ever talk to the CPU through the traits in this
//! module. `x86` holds the real 32-bit implementations; tests substitute recording ones.

pub mod x86;

#[cfg(all(test, target_arch = "x86_64", target_os = "linux"))]
pub mod host;

use x86::interrupt::idt::IdtPointer;

/// Privileged table-management operations.
pub trait Cpu {
    /// Makes the table described by `pointer` authoritative for every following interrupt.
    ///
    /// ## Safety
    ///
    /// The table must stay at `pointer.base()` for as long as interrupts can be delivered, and
    /// every present gate in it must point at a valid entry stub.
    unsafe fn load_idt(&self, pointer: &IdtPointer);

    /// The selector of the code segment the kernel is currently executing in.
    fn code_selector(&self) -> u16;
}

/// A fixed-ABI routine that saves the running task's callee-saved registers on its own stack,
/// stores the resulting stack pointer into `*from`, loads `to` as the stack pointer, pops the
/// incoming task's callee-saved registers and returns into it.
///
/// The stack image built for a new task must match exactly what `switch` pops: first
/// `SAVED_REGISTERS` register-width slots, then the return address, which for a new task is
/// `task_start_address()`.
///
/// ## Safety
///
/// Implementations must save and restore precisely `SAVED_REGISTERS` registers, and must not
/// touch any other task state.
pub unsafe trait ContextSwitch {
    /// Number of register-width slots `switch` pops before returning.
    const SAVED_REGISTERS: usize;

    /// ## Safety
    ///
    /// `from` must be valid for a write and `to` must be a stack pointer produced either by an
    /// earlier `switch` or by stack synthesis for this same implementation. Must be called with
    /// re-entry excluded (interrupts masked on a single core).
    unsafe fn switch(from: *mut usize, to: usize);

    /// Where the first switch into a task returns to. It runs with the stack pointer on the
    /// task's entry address, enables interrupts where the target has them, and returns into
    /// the entry function.
    fn task_start_address() -> usize;

    /// Where a task lands if its entry function returns.
    fn task_return_address() -> usize;
}

/// The local interrupt-enable flag.
pub trait InterruptFlag {
    /// Masks interrupts and returns whether they were enabled before.
    fn save_and_disable() -> bool;

    /// Enables interrupts again if `were_enabled`, undoing one `save_and_disable`.
    fn restore(were_enabled: bool);
}

/// Byte-wide access to the I/O port space.
pub trait PortIo {
    /// ## Safety
    ///
    /// Reading a port can have side effects on the device behind it.
    unsafe fn read_u8(&mut self, port: u16) -> u8;

    /// ## Safety
    ///
    /// Writing a port can have arbitrary side effects on the device behind it.
    unsafe fn write_u8(&mut self, port: u16, value: u8);
}
