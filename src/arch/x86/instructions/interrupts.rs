use core::arch::asm;

const INTERRUPT_FLAG: u32 = 1 << 9;

pub fn enable() {
    // SAFETY: handlers for every unmasked line are installed before the kernel calls this.
    unsafe { asm!("sti", options(nomem, nostack)) };
}

pub fn disable() {
    unsafe { asm!("cli", options(nomem, nostack)) };
}

pub fn are_enabled() -> bool {
    let flags: u32;
    unsafe { asm!("pushfd", "pop {}", out(reg) flags, options(nomem, preserves_flags)) };
    flags & INTERRUPT_FLAG != 0
}

/// Halts until the next interrupt arrives.
pub fn hlt() {
    unsafe { asm!("hlt", options(nomem, nostack, preserves_flags)) };
}

/// Runs `f` with interrupts masked, restoring the previous interrupt flag afterwards.
pub fn without_interrupts<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let were_enabled = are_enabled();
    if were_enabled {
        disable();
    }

    let result = f();

    if were_enabled {
        enable();
    }
    result
}

/// Masks interrupts and halts forever.
pub fn halt_forever() -> ! {
    loop {
        disable();
        hlt();
    }
}
