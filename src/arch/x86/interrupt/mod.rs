//! The interrupt descriptor table the kernel boots with.
//!
//! | Vector | Source                   | Handler                    |
//! |--------|--------------------------|----------------------------|
//! | 0x08   | Double fault (#DF)       | `double_fault`             |
//! | 0x0D   | General protection (#GP) | `general_protection_fault` |
//! | 0x20   | IRQ0, PIT                | `timer`                    |
//! | 0x21   | IRQ1, PS/2 keyboard      | `keyboard`                 |
//! | 0x80   | `int 0x80`               | `test_vector`              |

pub mod handler;
pub mod idt;

use idt::{GateFlags, Idt};

use crate::config::PIC_1_OFFSET;

pub mod vector {
    use super::PIC_1_OFFSET;

    pub const DOUBLE_FAULT: u8 = 0x08;
    pub const GENERAL_PROTECTION: u8 = 0x0D;
    pub const TIMER: u8 = PIC_1_OFFSET;
    pub const KEYBOARD: u8 = PIC_1_OFFSET + 1;
    pub const TEST: u8 = 0x80;
}

/// Entry stub addresses for every vector installed at boot.
#[derive(Copy, Clone, Debug)]
pub struct BootHandlers {
    pub double_fault: u32,
    pub general_protection: u32,
    pub timer: u32,
    pub keyboard: u32,
    pub test: u32,
}

/// Fills `idt` with the boot vectors. Fault handlers go in first so that anything going wrong
/// while the rest is wired up is at least reported; the test vector goes in last.
pub fn install_boot_vectors(idt: &mut Idt, selector: u16, handlers: &BootHandlers) {
    let flags = GateFlags::interrupt();

    idt.install(vector::DOUBLE_FAULT, handlers.double_fault, selector, flags);
    idt.install(vector::GENERAL_PROTECTION, handlers.general_protection, selector, flags);
    idt.install(vector::TIMER, handlers.timer, selector, flags);
    idt.install(vector::KEYBOARD, handlers.keyboard, selector, flags);
    idt.install(vector::TEST, handlers.test, selector, flags);
}

#[cfg(target_arch = "x86")]
pub use kernel::*;

#[cfg(target_arch = "x86")]
mod kernel {
    use core::arch::asm;

    use lazy_static::lazy_static;
    use spin::Mutex;

    use super::handler::{exception, irq, InterruptHandler};
    use super::idt::Idt;
    use super::{install_boot_vectors, BootHandlers};
    use crate::arch::x86::instructions::tables::sidt;
    use crate::arch::Cpu;
    use crate::{kdebug, kinfo};

    lazy_static! {
        pub static ref IDT: Mutex<Idt> = {
            kdebug!("Making idt...");
            Mutex::new(Idt::new())
        };
    }

    /// Builds the boot table and loads it. Must run before interrupts are enabled.
    pub fn init_idt<C: Cpu>(cpu: &C) {
        let handlers = BootHandlers {
            double_fault: exception::double_fault.address(),
            general_protection: exception::general_protection_fault.address(),
            timer: irq::timer.address(),
            keyboard: irq::keyboard.address(),
            test: irq::test_vector.address(),
        };

        let mut idt = IDT.lock();
        install_boot_vectors(&mut idt, cpu.code_selector(), &handlers);

        // SAFETY: IDT is a static, so the table outlives every interrupt.
        unsafe { idt.load(cpu) };

        let loaded = sidt();
        kinfo!(
            "idt: loaded, limit={:#x} base={:#x}",
            loaded.limit(),
            loaded.base()
        );
    }

    /// Raises the software test vector to check the table end to end.
    pub fn trigger_test_interrupt() {
        // SAFETY: vector 0x80 is installed by init_idt and returns normally.
        unsafe { asm!("int 0x80") };
    }
}
