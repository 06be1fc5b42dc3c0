use core::arch::asm;

/// ## Safety
///
/// Reading a port can have side effects on the device behind it.
pub unsafe fn inb(port: u16) -> u8 {
    let value: u8;
    asm!("in al, dx", out("al") value, in("dx") port, options(nomem, nostack, preserves_flags));
    value
}

/// ## Safety
///
/// Writing a port can have arbitrary side effects on the device behind it.
pub unsafe fn outb(port: u16, value: u8) {
    asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
}
