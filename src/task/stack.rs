//! Per-task stacks and the image a never-run task is resumed from.

use core::mem::size_of;

use crate::config::{STACK_ALIGN, TASK_STACK_SIZE};

const WORD: usize = size_of::<usize>();

#[repr(C, align(16))]
pub struct TaskStack([u8; TASK_STACK_SIZE]);

impl TaskStack {
    pub const fn new() -> TaskStack {
        TaskStack([0; TASK_STACK_SIZE])
    }

    /// Lowest address of the buffer.
    pub fn base(&self) -> usize {
        self.0.as_ptr() as usize
    }

    /// One past the highest address of the buffer.
    pub fn end(&self) -> usize {
        self.base() + TASK_STACK_SIZE
    }

    pub fn contains(&self, address: usize) -> bool {
        address >= self.base() && address < self.end()
    }

    /// Reads the register-width word stored at `address`, which must lie inside this stack.
    pub fn word_at(&self, address: usize) -> usize {
        let offset = address - self.base();
        let mut bytes = [0u8; WORD];
        bytes.copy_from_slice(&self.0[offset..offset + WORD]);
        usize::from_ne_bytes(bytes)
    }

    fn write_word(&mut self, address: usize, value: usize) {
        let offset = address - self.base();
        self.0[offset..offset + WORD].copy_from_slice(&value.to_ne_bytes());
    }
}

/// Builds the stack a switch primitive resumes into the first time a task runs, and returns the
/// stack pointer to hand it.
///
/// From the aligned top downwards the image holds `return_address`, `entry`, `start_address`,
/// then `saved_registers` zeroed slots. The primitive pops the zeroed slots and returns into
/// `start_address`, which sets up the task's interrupt state and returns into `entry`. The entry
/// function then sees `return_address` as its caller with the stack aligned the way the C ABI
/// expects at a function's first instruction.
pub fn synthesize(
    stack: &mut TaskStack,
    entry: usize,
    start_address: usize,
    return_address: usize,
    saved_registers: usize,
) -> usize {
    let mut sp = stack.end() & !(STACK_ALIGN - 1);

    let mut push = |stack: &mut TaskStack, value: usize| {
        sp -= WORD;
        stack.write_word(sp, value);
    };

    push(stack, return_address);
    push(stack, entry);
    push(stack, start_address);
    for _ in 0..saved_registers {
        push(stack, 0);
    }

    debug_assert!(stack.contains(sp));
    sp
}
