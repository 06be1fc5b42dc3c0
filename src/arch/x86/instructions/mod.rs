//! Thin wrappers around the privileged instructions the kernel needs. Only built for 32-bit x86.

pub mod interrupts;
pub mod port;
pub mod segmentation;
pub mod tables;

#[macro_export]
macro_rules! define_read_reg_func {
    ($register:tt, $width:tt) => {
        pub fn $register() -> $width {
            let seg: $width;
            unsafe {
                core::arch::asm!(
                    concat!("mov {:x}, ", stringify!($register)),
                    out(reg) seg,
                    options(nomem, nostack, preserves_flags)
                )
            };
            seg
        }
    };
}
