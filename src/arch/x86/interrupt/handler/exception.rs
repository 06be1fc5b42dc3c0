use crate::arch::x86::instructions::interrupts::halt_forever;
use crate::console::CONSOLE;
use crate::dispatch::report_fault;
use crate::interrupt_error;

use super::InterruptStackFrame;

/// Prints what we know about the fault and stops the machine.
fn fatal(name: &str, frame: &InterruptStackFrame, error_code: Option<u32>) -> ! {
    // SAFETY: the faulting code may have held the console lock, and it is never resuming.
    unsafe { CONSOLE.force_unlock() };
    let _ = report_fault(&mut *CONSOLE.lock(), name, frame, error_code);
    crate::kerror!("flags at fault: {:?}", frame.eflags());

    halt_forever()
}

interrupt_error!(general_protection_fault, |stack_frame, error_code| {
    fatal("GENERAL PROTECTION FAULT", stack_frame, Some(error_code))
});

interrupt_error!(double_fault, |stack_frame, error_code| {
    // Double faults are not allowed to return. The error code is always zero.
    fatal("DOUBLE FAULT", stack_frame, Some(error_code))
});
