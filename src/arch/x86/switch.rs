//! The cdecl context-switch routine.
//!
//! `cpu_switch(from, to)` pushes EBP, EBX, ESI and EDI, stores ESP into `*from`, loads `to` into
//! ESP, pops the same four registers and returns. A suspended task's stack therefore looks like
//! this, lowest address first:
//!
//! ```text
//!   saved ESP -> | EDI | ESI | EBX | EBP | return EIP | ...
//! ```
//!
//! For a task that has never run, the return EIP is `davos_task_start`, which turns interrupts
//! on and returns into the task's entry function.

use core::arch::global_asm;

use crate::arch::ContextSwitch;

global_asm!(
    ".global cpu_switch",
    "cpu_switch:",
    "mov eax, [esp + 4]",
    "mov edx, [esp + 8]",
    "push ebp",
    "push ebx",
    "push esi",
    "push edi",
    "mov [eax], esp",
    "mov esp, edx",
    "pop edi",
    "pop esi",
    "pop ebx",
    "pop ebp",
    "ret",
    "",
    // A new task is first entered from inside the timer gate, where IF is clear.
    ".global davos_task_start",
    "davos_task_start:",
    "sti",
    "ret",
);

extern "C" {
    fn cpu_switch(from: *mut usize, to: usize);
    fn davos_task_start();
}

pub struct I386Switch;

// SAFETY: cpu_switch saves and restores exactly the four cdecl callee-saved registers.
unsafe impl ContextSwitch for I386Switch {
    const SAVED_REGISTERS: usize = 4;

    unsafe fn switch(from: *mut usize, to: usize) {
        cpu_switch(from, to);
    }

    fn task_start_address() -> usize {
        davos_task_start as usize
    }

    fn task_return_address() -> usize {
        task_returned as usize
    }
}

/// A task whose entry function returned ends up here. There is no task destruction, so it parks
/// and keeps giving its time slices away.
extern "C" fn task_returned() -> ! {
    let id = crate::task::current_task_id();
    crate::kwarn!("task {:?} returned from its entry point, parking it", id);

    super::instructions::interrupts::enable();
    loop {
        super::instructions::interrupts::hlt();
    }
}
