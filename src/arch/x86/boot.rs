//! Multiboot entry. GRUB or `qemu -kernel` jumps to `_start` in 32-bit protected mode with a flat
//! GDT, paging off and interrupts disabled.

use core::arch::global_asm;

use crate::config::BOOT_STACK_SIZE;

const MULTIBOOT_MAGIC: u32 = 0x1BAD_B002;
/// Page-align modules and provide a memory map.
const MULTIBOOT_FLAGS: u32 = 0b11;

#[repr(C, align(16))]
struct BootStack([u8; BOOT_STACK_SIZE]);

static mut BOOT_STACK: BootStack = BootStack([0; BOOT_STACK_SIZE]);

global_asm!(
    ".section .multiboot, \"a\"",
    ".align 4",
    ".long {magic}",
    ".long {flags}",
    ".long -({magic} + {flags})",
    "",
    ".section .text",
    ".global _start",
    "_start:",
    "lea esp, [{stack} + {stack_size}]",
    "xor ebp, ebp",
    "push 0",
    "popfd",
    "call {main}",
    "2:",
    "cli",
    "hlt",
    "jmp 2b",
    magic = const MULTIBOOT_MAGIC,
    flags = const MULTIBOOT_FLAGS,
    stack = sym BOOT_STACK,
    stack_size = const BOOT_STACK_SIZE,
    main = sym crate::kernel_main,
);
