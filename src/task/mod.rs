//! Preemptive multitasking over a fixed pool of kernel tasks sharing one address space.

pub mod scheduler;
pub mod stack;

use core::fmt;

pub use scheduler::{preempt, Scheduler, Switch};
use stack::TaskStack;

/// Signature of a task's first function. It runs on the task's own stack and starts with
/// interrupts enabled, even when the switch into it happened inside the timer interrupt.
pub type TaskEntry = extern "C" fn();

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TaskId(u32);

impl TaskId {
    /// The thread of control that was already running when the scheduler was initialized.
    pub const BOOTSTRAP: TaskId = TaskId(0);

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TaskState {
    Runnable,
    Running,
    /// Not eligible to run. Nothing in the kernel enters this state yet; it is reserved for
    /// blocking primitives.
    Waiting,
}

pub struct Task {
    id: TaskId,
    /// Saved top of stack while the task is not running. Stale while it is.
    stack_pointer: usize,
    state: TaskState,
    stack: TaskStack,
}

impl Task {
    const EMPTY: Task = Task {
        id: TaskId::BOOTSTRAP,
        stack_pointer: 0,
        state: TaskState::Runnable,
        stack: TaskStack::new(),
    };

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack_pointer
    }

    pub fn stack(&self) -> &TaskStack {
        &self.stack
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SchedulerError {
    /// Every slot of the pool is taken.
    PoolFull,
    /// `initialize` has not been called.
    Uninitialized,
    UnknownTask(TaskId),
    /// The operation cannot be applied to the running task.
    TaskRunning(TaskId),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::PoolFull => write!(f, "task pool is full"),
            SchedulerError::Uninitialized => write!(f, "scheduler is not initialized"),
            SchedulerError::UnknownTask(id) => write!(f, "no task {}", id),
            SchedulerError::TaskRunning(id) => write!(f, "task {} is running", id),
        }
    }
}

#[cfg(target_arch = "x86")]
pub use kernel::*;

/// The process-wide scheduler. Every access outside the timer interrupt masks interrupts while
/// it holds the lock, so the timer can never find it locked on this single core.
#[cfg(target_arch = "x86")]
mod kernel {
    use spin::Mutex;

    use super::{Scheduler, SchedulerError, TaskEntry, TaskId};
    use crate::arch::x86::instructions::interrupts::without_interrupts;
    use crate::arch::x86::I386Switch;
    use crate::kdebug;

    pub type KernelScheduler = Scheduler<I386Switch>;

    // Const-initialized so the pool is placed in .bss instead of being built on the boot stack.
    static SCHEDULER: Mutex<KernelScheduler> = Mutex::new(Scheduler::new());

    /// Turns the running thread of control into the bootstrap task. Call exactly once.
    pub fn init() {
        without_interrupts(|| SCHEDULER.lock().initialize());
    }

    /// Adds a task to the rotation. It first runs at the next preemption point that reaches it.
    pub fn spawn(entry: TaskEntry) -> Result<TaskId, SchedulerError> {
        let id = without_interrupts(|| SCHEDULER.lock().create_task(entry))?;
        kdebug!("scheduler: created task {}", id);
        Ok(id)
    }

    /// The preemption point. Called from the timer interrupt, with interrupts masked.
    pub fn schedule() {
        // SAFETY: SCHEDULER is static, and we are either in an interrupt gate or inside
        // `yield_now`, so interrupts are masked.
        unsafe { super::preempt(&SCHEDULER) };
    }

    /// Gives up the rest of the current time slice.
    pub fn yield_now() {
        without_interrupts(schedule);
    }

    pub fn current_task_id() -> Option<TaskId> {
        without_interrupts(|| SCHEDULER.lock().current_task_id())
    }
}

#[cfg(all(test, target_arch = "x86_64", target_os = "linux"))]
mod test {
    use core::sync::atomic::{AtomicUsize, Ordering};
    use spin::Mutex;

    use super::*;
    use crate::arch::host::HostSwitch;

    static SCHEDULER: Mutex<Scheduler<HostSwitch>> = Mutex::new(Scheduler::new());
    static RESUMES: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn worker() {
        loop {
            RESUMES.fetch_add(1, Ordering::SeqCst);
            unsafe { preempt(&SCHEDULER) };
        }
    }

    #[test]
    fn switches_into_a_fresh_task_and_back() {
        SCHEDULER.lock().initialize();
        let id = SCHEDULER.lock().create_task(worker).unwrap();

        // Into the synthesized image: `worker` runs from its first instruction and switches back.
        unsafe { preempt(&SCHEDULER) };
        assert_eq!(RESUMES.load(Ordering::SeqCst), 1);
        assert_eq!(SCHEDULER.lock().current_task_id(), Some(TaskId::BOOTSTRAP));

        // Into a stack saved by the switch itself: `worker` continues its loop.
        unsafe { preempt(&SCHEDULER) };
        assert_eq!(RESUMES.load(Ordering::SeqCst), 2);

        let scheduler = SCHEDULER.lock();
        assert_eq!(scheduler.current_task_id(), Some(TaskId::BOOTSTRAP));
        assert_eq!(scheduler.task(id).unwrap().state(), TaskState::Runnable);
        assert!(scheduler
            .task(id)
            .unwrap()
            .stack()
            .contains(scheduler.task(id).unwrap().stack_pointer()));
    }
}
