#![cfg_attr(not(test), no_std)]
#![cfg_attr(test, allow(unused_imports))]

pub mod arch;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod keyboard;
pub mod log;
mod panic;
mod print;
pub mod sync;
pub mod task;

#[cfg(target_arch = "x86")]
use arch::x86::instructions::interrupts;

/// Entered from `_start` on the boot stack with interrupts disabled.
#[cfg(target_arch = "x86")]
#[no_mangle]
pub extern "C" fn kernel_main() -> ! {
    kinfo!("DavOS booting");

    // Run architecture specific initialization code
    arch::x86::arch_init();

    arch::x86::interrupt::trigger_test_interrupt();
    println!("Back from int 0x80");

    task::init();
    #[cfg(feature = "demo-tasks")]
    demo::spawn_all();

    interrupts::enable();
    kinfo!("interrupts enabled, timer at {} Hz", config::TIMER_HZ);

    print!("\nDavOS> ");
    loop {
        let key = keyboard::KEYBOARD.read_key();
        print!("{}", key);
        if key == '\n' {
            print!("DavOS> ");
        }
    }
}

/// Two tasks that report every few hundred ticks, so preemption is visible on the console.
#[cfg(all(target_arch = "x86", feature = "demo-tasks"))]
mod demo {
    use crate::arch::x86::instructions::interrupts;
    use crate::dispatch::ticks;
    use crate::task::{self, TaskEntry};
    use crate::{kdebug, kinfo, kwarn};

    const REPORT_EVERY: u64 = 500;

    pub fn spawn_all() {
        let entries: [TaskEntry; 2] = [worker, worker];
        for &entry in entries.iter() {
            match task::spawn(entry) {
                Ok(id) => kinfo!("demo: spawned task {}", id),
                Err(err) => kwarn!("demo: could not spawn task: {}", err),
            }
        }
    }

    extern "C" fn worker() {
        let mut last = ticks();
        loop {
            let now = ticks();
            if now - last >= REPORT_EVERY {
                kdebug!("task {:?} alive at tick {}", task::current_task_id(), now);
                last = now;
                task::yield_now();
            } else {
                interrupts::hlt();
            }
        }
    }
}
