/// This module is for x86 exception handling without using too much magic like the 'x86-interrupt'
/// calling convention. Entry stubs are emitted as global assembly by the macros below.
#[cfg(target_arch = "x86")]
pub mod exception;
#[cfg(target_arch = "x86")]
pub mod irq;

use bitflags::bitflags;

/// A handler whose address can be placed in a gate.
///
/// ## Safety
///
/// The address must be an entry stub that saves every register it touches, keeps the stack
/// aligned for the Rust code it calls, and returns with `iretd` (or never returns).
pub unsafe trait InterruptHandler {
    fn address(&self) -> u32;
}

/// A transparent wrapper around an interrupt entry stub that is used to typecheck interrupts.
/// This way, you shouldn't be able to pass a random function as an interrupt handler.
///
/// This should only be constructed by the `interrupt` macro, which ensures the calling
/// convention is correct.
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct StandardHandler(pub(crate) unsafe extern "C" fn());

// SAFETY: Only the interrupt! macro builds these.
unsafe impl InterruptHandler for StandardHandler {
    fn address(&self) -> u32 {
        self.0 as usize as u32
    }
}

/// Like `StandardHandler`, but for vectors on which the CPU pushes an error code. Built by
/// `interrupt_error`.
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct HandlerWithError(pub(crate) unsafe extern "C" fn());

// SAFETY: Only the interrupt_error! macro builds these.
unsafe impl InterruptHandler for HandlerWithError {
    fn address(&self) -> u32 {
        self.0 as usize as u32
    }
}

/// What the CPU pushes when an interrupt arrives without a privilege change.
#[derive(Debug)]
#[repr(C)]
pub struct InterruptStackFrame {
    pub instruction_pointer: u32,
    pub code_segment: u32,
    pub flags: u32,
}

impl InterruptStackFrame {
    pub fn eflags(&self) -> EFlags {
        EFlags::from_bits_truncate(self.flags)
    }
}

bitflags! {
    pub struct EFlags: u32 {
        const CARRY = 1 << 0;
        const PARITY = 1 << 2;
        const ZERO = 1 << 6;
        const SIGN = 1 << 7;
        const TRAP = 1 << 8;
        const INTERRUPT_ENABLE = 1 << 9;
        const DIRECTION = 1 << 10;
        const OVERFLOW = 1 << 11;
    }
}

/// Defines an interrupt handler.
///
/// The stub saves all general purpose registers with `pushad`, aligns the stack to 16 bytes,
/// passes a pointer to the CPU-pushed frame to the body, then restores everything and returns
/// with `iretd`. EBP holds the pre-alignment stack pointer across the call; the body may switch
/// tasks, and the switch primitive preserves EBP.
#[macro_export]
macro_rules! interrupt {
    ($handler:ident, |$stack_frame:ident| $code:block) => {
        paste::item! {
            extern "C" fn [<__interrupt_body_ $handler>](
                $stack_frame: &$crate::arch::x86::interrupt::handler::InterruptStackFrame,
            ) {
                $code
            }

            core::arch::global_asm!(
                concat!(".global __interrupt_entry_", stringify!($handler)),
                concat!("__interrupt_entry_", stringify!($handler), ":"),
                "pushad",
                "cld",
                "mov ebp, esp",
                "and esp, -16",
                "sub esp, 12",
                "lea eax, [ebp + 32]", // frame sits above the 8 saved registers
                "push eax",
                "call {body}",
                "mov esp, ebp",
                "popad",
                "iretd",
                body = sym [<__interrupt_body_ $handler>],
            );

            extern "C" {
                fn [<__interrupt_entry_ $handler>]();
            }

            #[allow(non_upper_case_globals)]
            pub const $handler: $crate::arch::x86::interrupt::handler::StandardHandler =
                $crate::arch::x86::interrupt::handler::StandardHandler(
                    [<__interrupt_entry_ $handler>],
                );
        }
    };
}

/// Defines a handler for a vector that pushes an error code. The body receives the code and
/// must never return; the stub has no path back to the interrupted code.
#[macro_export]
macro_rules! interrupt_error {
    ($handler:ident, |$stack_frame:ident, $error_code:ident| $code:block) => {
        paste::item! {
            extern "C" fn [<__interrupt_body_ $handler>](
                $stack_frame: &$crate::arch::x86::interrupt::handler::InterruptStackFrame,
                $error_code: u32,
            ) -> ! {
                $code
            }

            core::arch::global_asm!(
                concat!(".global __interrupt_entry_", stringify!($handler)),
                concat!("__interrupt_entry_", stringify!($handler), ":"),
                "pushad",
                "cld",
                "mov ebp, esp",
                "and esp, -16",
                "sub esp, 8",
                "push dword ptr [ebp + 32]", // error code
                "lea eax, [ebp + 36]",       // frame sits above the error code
                "push eax",
                "call {body}",
                "ud2",
                body = sym [<__interrupt_body_ $handler>],
            );

            extern "C" {
                fn [<__interrupt_entry_ $handler>]();
            }

            #[allow(non_upper_case_globals)]
            pub const $handler: $crate::arch::x86::interrupt::handler::HandlerWithError =
                $crate::arch::x86::interrupt::handler::HandlerWithError(
                    [<__interrupt_entry_ $handler>],
                );
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use core::mem::size_of;

    #[test]
    fn frame_layout() {
        assert_eq!(size_of::<InterruptStackFrame>(), 12);
    }

    #[test]
    fn eflags_decoding() {
        let frame = InterruptStackFrame {
            instruction_pointer: 0,
            code_segment: 0x08,
            flags: 0x0000_0246,
        };
        let flags = frame.eflags();
        assert!(flags.contains(EFlags::INTERRUPT_ENABLE | EFlags::ZERO | EFlags::PARITY));
        assert!(!flags.contains(EFlags::CARRY));
    }
}
