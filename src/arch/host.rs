//! A System V x86_64 switch primitive so the scheduler can perform real context switches inside
//! `cargo test` on a development machine.

use core::arch::global_asm;

use super::ContextSwitch;

global_asm!(
    ".global davos_host_switch",
    "davos_host_switch:",
    "push rbp",
    "push rbx",
    "push r12",
    "push r13",
    "push r14",
    "push r15",
    "mov [rdi], rsp",
    "mov rsp, rsi",
    "pop r15",
    "pop r14",
    "pop r13",
    "pop r12",
    "pop rbx",
    "pop rbp",
    "ret",
    "",
    ".global davos_host_task_start",
    "davos_host_task_start:",
    "ret",
);

extern "C" {
    fn davos_host_switch(from: *mut usize, to: usize);
    fn davos_host_task_start();
}

pub struct HostSwitch;

// SAFETY: davos_host_switch saves and restores exactly the six SysV callee-saved registers.
unsafe impl ContextSwitch for HostSwitch {
    const SAVED_REGISTERS: usize = 6;

    unsafe fn switch(from: *mut usize, to: usize) {
        davos_host_switch(from, to);
    }

    fn task_start_address() -> usize {
        davos_host_task_start as usize
    }

    fn task_return_address() -> usize {
        task_returned as usize
    }
}

extern "C" fn task_returned() -> ! {
    std::process::abort()
}
