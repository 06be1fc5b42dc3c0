use core::arch::asm;

use super::super::interrupt::idt::IdtPointer;

/// Loads the IDT register.
///
/// ## Safety
///
/// `pointer` must describe a table that outlives every interrupt delivered through it.
pub unsafe fn lidt(pointer: &IdtPointer) {
    asm!("lidt [{}]", in(reg) pointer, options(readonly, nostack, preserves_flags));
}

/// Reads back the IDT register.
pub fn sidt() -> IdtPointer {
    let mut bytes = [0u8; 6];
    // SAFETY: sidt only writes the 6 bytes it is pointed at.
    unsafe {
        asm!("sidt [{}]", in(reg) bytes.as_mut_ptr(), options(nostack, preserves_flags));
    }
    IdtPointer::unpack(bytes)
}
