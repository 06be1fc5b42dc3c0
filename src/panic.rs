use core::panic::PanicInfo;

use crate::println;

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo<'_>) -> ! {
    println!("{}", info);

    #[cfg(target_arch = "x86")]
    crate::arch::x86::instructions::interrupts::halt_forever();

    #[cfg(not(target_arch = "x86"))]
    loop {}
}
