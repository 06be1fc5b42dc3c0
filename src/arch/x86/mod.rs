#[cfg(all(target_arch = "x86", not(test)))]
mod boot;
#[cfg(target_arch = "x86")]
pub mod instructions;
pub mod interrupt;
pub mod pic;
pub mod pit;
#[cfg(target_arch = "x86")]
pub mod switch;

#[cfg(target_arch = "x86")]
pub use switch::I386Switch;

#[cfg(target_arch = "x86")]
use super::{Cpu, InterruptFlag, PortIo};
#[cfg(target_arch = "x86")]
use interrupt::idt::IdtPointer;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum PrivilegeLevel {
    RingZero = 0,
    RingOne = 1,
    RingTwo = 2,
    RingThree = 3,
}

impl PrivilegeLevel {
    /// Decodes the two low bits of `bits`.
    pub fn from_bits(bits: u8) -> PrivilegeLevel {
        match bits & 0b11 {
            0 => PrivilegeLevel::RingZero,
            1 => PrivilegeLevel::RingOne,
            2 => PrivilegeLevel::RingTwo,
            _ => PrivilegeLevel::RingThree,
        }
    }
}

/// The processor the kernel runs on.
#[cfg(target_arch = "x86")]
pub struct I386;

#[cfg(target_arch = "x86")]
impl Cpu for I386 {
    unsafe fn load_idt(&self, pointer: &IdtPointer) {
        instructions::tables::lidt(pointer);
    }

    fn code_selector(&self) -> u16 {
        instructions::segmentation::cs()
    }
}

#[cfg(target_arch = "x86")]
impl InterruptFlag for I386 {
    fn save_and_disable() -> bool {
        let were_enabled = instructions::interrupts::are_enabled();
        if were_enabled {
            instructions::interrupts::disable();
        }
        were_enabled
    }

    fn restore(were_enabled: bool) {
        if were_enabled {
            instructions::interrupts::enable();
        }
    }
}

/// The real I/O port space.
#[cfg(target_arch = "x86")]
#[derive(Copy, Clone, Default)]
pub struct HardwarePorts;

#[cfg(target_arch = "x86")]
impl PortIo for HardwarePorts {
    unsafe fn read_u8(&mut self, port: u16) -> u8 {
        instructions::port::inb(port)
    }

    unsafe fn write_u8(&mut self, port: u16, value: u8) {
        instructions::port::outb(port, value)
    }
}

/// Brings up interrupt delivery: the IDT, the PIC and the PIT. Interrupts stay masked until the
/// caller enables them.
#[cfg(target_arch = "x86")]
pub fn arch_init() {
    interrupt::init_idt(&I386);

    unsafe { pic::PICS.lock().initialize() };
    pit::Pit::new(HardwarePorts).set_frequency(crate::config::TIMER_HZ);
}
