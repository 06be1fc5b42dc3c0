use crate::arch::x86::pic::PICS;
use crate::console::CONSOLE;
use crate::dispatch::{self, TICKS};
use crate::interrupt;
use crate::keyboard::KEYBOARD;
use crate::task;

interrupt!(timer, |_stack_frame| {
    dispatch::timer_tick(&TICKS, &mut &PICS, task::schedule);
});

interrupt!(keyboard, |_stack_frame| {
    dispatch::keyboard_data(&KEYBOARD, &mut &PICS);
});

interrupt!(test_vector, |_stack_frame| {
    let _ = dispatch::test_interrupt(&mut *CONSOLE.lock());
});
