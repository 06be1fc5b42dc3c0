//! Compile-time kernel configuration.
//!
//! There is no configuration file or command line at this stage of boot, so every tunable is a
//! constant. Cargo features select between the few alternatives that exist.

use crate::log::Level;

/// Hard ceiling on the number of tasks, bootstrap task included.
pub const MAX_TASKS: usize = 16;

/// Size of the stack owned by every task slot.
pub const TASK_STACK_SIZE: usize = 4096;

/// Alignment applied to the top of a freshly synthesized task stack.
pub const STACK_ALIGN: usize = 16;

/// Stack used by `_start` until the bootstrap task takes over.
pub const BOOT_STACK_SIZE: usize = 16 * 1024;

/// Frequency the PIT is programmed to. Every tick is a preemption point.
pub const TIMER_HZ: u32 = 100;

/// Vector the master PIC delivers IRQ0 on after remapping.
pub const PIC_1_OFFSET: u8 = 0x20;

/// Vector the slave PIC delivers IRQ8 on after remapping.
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

#[cfg(feature = "verbose")]
pub const DEFAULT_LOG_LEVEL: Level = Level::Debug;

#[cfg(not(feature = "verbose"))]
pub const DEFAULT_LOG_LEVEL: Level = Level::Info;
