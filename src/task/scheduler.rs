//! Round-robin scheduling over a fixed pool of tasks.
//!
//! The pool is append-only: slots are filled in creation order and never freed, and that order
//! is the round-robin order. The scheduler only does the bookkeeping; transferring control is
//! the job of a [`ContextSwitch`] implementation.

use core::marker::PhantomData;

use spin::Mutex;

use super::stack::synthesize;
use super::{SchedulerError, Task, TaskEntry, TaskId, TaskState};
use crate::arch::ContextSwitch;
use crate::config::MAX_TASKS;

pub struct Scheduler<C: ContextSwitch> {
    tasks: [Task; MAX_TASKS],
    count: usize,
    /// Slot of the running task, `None` until `initialize`.
    current: Option<usize>,
    next_id: u32,
    _switch: PhantomData<fn() -> C>,
}

/// A context switch that has been decided on but not yet performed.
///
/// Splitting the decision from the transfer lets the caller release whatever guards the
/// scheduler before the outgoing task is suspended.
#[must_use]
pub struct Switch<C: ContextSwitch> {
    from: *mut usize,
    to: usize,
    _switch: PhantomData<fn() -> C>,
}

impl<C: ContextSwitch> Switch<C> {
    /// Slot that receives the outgoing task's stack pointer.
    pub fn from(&self) -> *mut usize {
        self.from
    }

    /// Stack pointer the incoming task resumes from.
    pub fn to(&self) -> usize {
        self.to
    }

    /// Transfers control to the incoming task. Returns once something switches back.
    ///
    /// ## Safety
    ///
    /// The scheduler this came from must not have moved, and re-entry must be excluded (interrupts
    /// masked) until the switch completes.
    pub unsafe fn perform(self) {
        C::switch(self.from, self.to);
    }
}

impl<C: ContextSwitch> Scheduler<C> {
    pub const fn new() -> Self {
        Self {
            tasks: [Task::EMPTY; MAX_TASKS],
            count: 0,
            current: None,
            next_id: 1,
            _switch: PhantomData,
        }
    }

    /// Resets the pool to a single task standing for the thread of control that is already
    /// running. It needs no stack image, since it is suspended by a real switch before it is ever
    /// resumed.
    pub fn initialize(&mut self) {
        let bootstrap = &mut self.tasks[0];
        bootstrap.id = TaskId::BOOTSTRAP;
        bootstrap.state = TaskState::Running;
        bootstrap.stack_pointer = 0;

        self.count = 1;
        self.current = Some(0);
        self.next_id = TaskId::BOOTSTRAP.0 + 1;
    }

    /// Adds a task that will start at `entry` the first time it is scheduled.
    pub fn create_task(&mut self, entry: TaskEntry) -> Result<TaskId, SchedulerError> {
        if self.current.is_none() {
            return Err(SchedulerError::Uninitialized);
        }
        if self.count >= MAX_TASKS {
            return Err(SchedulerError::PoolFull);
        }

        let id = TaskId(self.next_id);
        self.next_id += 1;

        let task = &mut self.tasks[self.count];
        task.id = id;
        task.state = TaskState::Runnable;
        task.stack_pointer = synthesize(
            &mut task.stack,
            entry as usize,
            C::task_start_address(),
            C::task_return_address(),
            C::SAVED_REGISTERS,
        );
        self.count += 1;
        Ok(id)
    }

    /// Picks the next runnable task after the current one in pool order and updates the states
    /// as if the switch had happened. Returns `None` when there is nothing else to run.
    pub fn pick_next(&mut self) -> Option<Switch<C>> {
        let current = self.current?;
        if self.count < 2 {
            return None;
        }

        let count = self.count;
        let next = (1..count)
            .map(|step| (current + step) % count)
            .find(|&slot| self.tasks[slot].state == TaskState::Runnable)?;

        self.tasks[current].state = TaskState::Runnable;
        self.tasks[next].state = TaskState::Running;
        self.current = Some(next);

        Some(Switch {
            from: &mut self.tasks[current].stack_pointer as *mut usize,
            to: self.tasks[next].stack_pointer,
            _switch: PhantomData,
        })
    }

    /// Preemption point: switches to the next runnable task, if there is one.
    ///
    /// ## Safety
    ///
    /// `self` must not move while any task it switched away from is suspended, and nothing may
    /// re-enter the scheduler until the switch completes.
    pub unsafe fn schedule(&mut self) {
        if let Some(switch) = self.pick_next() {
            switch.perform();
        }
    }

    pub fn current_task_id(&self) -> Option<TaskId> {
        self.current.map(|slot| self.tasks[slot].id)
    }

    pub fn task_count(&self) -> usize {
        self.count
    }

    /// Live tasks in pool order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks[..self.count]
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks().iter().find(|task| task.id == id)
    }

    /// Takes a task out of the rotation until `mark_runnable` is called for it. This is the hook
    /// for blocking primitives; the running task cannot be parked this way.
    pub fn mark_waiting(&mut self, id: TaskId) -> Result<(), SchedulerError> {
        self.set_idle_state(id, TaskState::Waiting)
    }

    pub fn mark_runnable(&mut self, id: TaskId) -> Result<(), SchedulerError> {
        self.set_idle_state(id, TaskState::Runnable)
    }

    fn set_idle_state(&mut self, id: TaskId, state: TaskState) -> Result<(), SchedulerError> {
        let slot = self.tasks[..self.count]
            .iter()
            .position(|task| task.id == id)
            .ok_or(SchedulerError::UnknownTask(id))?;

        if Some(slot) == self.current {
            return Err(SchedulerError::TaskRunning(id));
        }

        self.tasks[slot].state = state;
        Ok(())
    }
}

/// Runs the preemption point on a scheduler behind a lock, releasing the lock before control
/// leaves the current task. If the lock is already held the tick is skipped.
///
/// ## Safety
///
/// Interrupts must be masked, and every other user of `scheduler` must mask them while holding
/// the lock.
pub unsafe fn preempt<C: ContextSwitch>(scheduler: &'static Mutex<Scheduler<C>>) {
    let switch = match scheduler.try_lock() {
        Some(mut guard) => guard.pick_next(),
        None => return,
    };

    if let Some(switch) = switch {
        // The task pool lives in `scheduler`, which is 'static, so `from` stays valid.
        switch.perform();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::boxed::Box;
    use std::cell::RefCell;
    use std::vec::Vec;

    thread_local! {
        static SWITCHES: RefCell<Vec<(usize, usize)>> = RefCell::new(Vec::new());
    }

    /// Records the switches it is asked to perform instead of performing them.
    struct RecordingSwitch;

    unsafe impl ContextSwitch for RecordingSwitch {
        const SAVED_REGISTERS: usize = 4;

        unsafe fn switch(from: *mut usize, to: usize) {
            SWITCHES.with(|switches| switches.borrow_mut().push((from as usize, to)));
        }

        fn task_start_address() -> usize {
            0x5747_0000
        }

        fn task_return_address() -> usize {
            0xDEAD_0000
        }
    }

    fn switches() -> Vec<(usize, usize)> {
        SWITCHES.with(|switches| switches.borrow().clone())
    }

    extern "C" fn entry() {}

    fn scheduler() -> Box<Scheduler<RecordingSwitch>> {
        SWITCHES.with(|switches| switches.borrow_mut().clear());
        let mut scheduler = Box::new(Scheduler::new());
        scheduler.initialize();
        scheduler
    }

    fn state(scheduler: &Scheduler<RecordingSwitch>, id: TaskId) -> TaskState {
        scheduler.task(id).unwrap().state()
    }

    #[test]
    fn nothing_before_initialize() {
        let mut scheduler: Box<Scheduler<RecordingSwitch>> = Box::new(Scheduler::new());
        assert_eq!(scheduler.current_task_id(), None);
        assert_eq!(scheduler.create_task(entry), Err(SchedulerError::Uninitialized));
        assert!(scheduler.pick_next().is_none());
    }

    #[test]
    fn initialize_creates_the_running_bootstrap_task() {
        let scheduler = scheduler();
        assert_eq!(scheduler.task_count(), 1);
        assert_eq!(scheduler.current_task_id(), Some(TaskId::BOOTSTRAP));
        assert_eq!(state(&scheduler, TaskId::BOOTSTRAP), TaskState::Running);
    }

    #[test]
    fn initialize_resets_the_pool() {
        let mut scheduler = scheduler();
        scheduler.create_task(entry).unwrap();
        scheduler.create_task(entry).unwrap();

        scheduler.initialize();
        assert_eq!(scheduler.task_count(), 1);
        assert_eq!(scheduler.create_task(entry), Ok(TaskId(1)));
    }

    #[test]
    fn create_until_full() {
        let mut scheduler = scheduler();

        let mut last = TaskId::BOOTSTRAP;
        for _ in 1..MAX_TASKS {
            let id = scheduler.create_task(entry).unwrap();
            assert!(id > last);
            assert_eq!(state(&scheduler, id), TaskState::Runnable);
            last = id;
        }
        assert_eq!(scheduler.task_count(), MAX_TASKS);

        let before: Vec<(TaskId, TaskState, usize)> = scheduler
            .tasks()
            .iter()
            .map(|task| (task.id(), task.state(), task.stack_pointer()))
            .collect();

        assert_eq!(scheduler.create_task(entry), Err(SchedulerError::PoolFull));

        let after: Vec<(TaskId, TaskState, usize)> = scheduler
            .tasks()
            .iter()
            .map(|task| (task.id(), task.state(), task.stack_pointer()))
            .collect();
        assert_eq!(scheduler.task_count(), MAX_TASKS);
        assert_eq!(before, after);
    }

    #[test]
    fn new_task_stack_resumes_at_entry() {
        let mut scheduler = scheduler();
        let id = scheduler.create_task(entry).unwrap();

        let task = scheduler.task(id).unwrap();
        let sp = task.stack_pointer();
        let word = core::mem::size_of::<usize>();
        assert!(task.stack().contains(sp));
        assert_eq!(task.stack().word_at(sp + 4 * word), 0x5747_0000);
        assert_eq!(task.stack().word_at(sp + 5 * word), entry as usize);
        assert_eq!(task.stack().word_at(sp + 6 * word), 0xDEAD_0000);
    }

    #[test]
    fn skips_waiting_tasks() {
        let mut scheduler = scheduler();
        let a = TaskId::BOOTSTRAP;
        let b = scheduler.create_task(entry).unwrap();
        let c = scheduler.create_task(entry).unwrap();
        scheduler.mark_waiting(c).unwrap();

        let b_sp = scheduler.task(b).unwrap().stack_pointer();
        unsafe { scheduler.schedule() };

        assert_eq!(scheduler.current_task_id(), Some(b));
        assert_eq!(state(&scheduler, a), TaskState::Runnable);
        assert_eq!(state(&scheduler, b), TaskState::Running);
        assert_eq!(state(&scheduler, c), TaskState::Waiting);

        let recorded = switches();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].1, b_sp);
        assert_eq!(
            recorded[0].0,
            &scheduler.tasks()[0].stack_pointer as *const usize as usize
        );
    }

    #[test]
    fn single_task_is_a_no_op() {
        let mut scheduler = scheduler();
        unsafe { scheduler.schedule() };

        assert_eq!(scheduler.current_task_id(), Some(TaskId::BOOTSTRAP));
        assert_eq!(state(&scheduler, TaskId::BOOTSTRAP), TaskState::Running);
        assert!(switches().is_empty());
    }

    #[test]
    fn all_others_waiting_is_a_no_op() {
        let mut scheduler = scheduler();
        for _ in 0..3 {
            let id = scheduler.create_task(entry).unwrap();
            scheduler.mark_waiting(id).unwrap();
        }

        unsafe { scheduler.schedule() };

        assert_eq!(scheduler.current_task_id(), Some(TaskId::BOOTSTRAP));
        assert_eq!(state(&scheduler, TaskId::BOOTSTRAP), TaskState::Running);
        assert!(switches().is_empty());
    }

    #[test]
    fn round_robin_in_pool_order() {
        let mut scheduler = scheduler();
        for _ in 0..4 {
            scheduler.create_task(entry).unwrap();
        }
        let n = scheduler.task_count();

        let mut visited = Vec::new();
        for _ in 0..2 * n {
            unsafe { scheduler.schedule() };
            visited.push(scheduler.current_task_id().unwrap().as_u32());
        }

        assert_eq!(visited, vec![1, 2, 3, 4, 0, 1, 2, 3, 4, 0]);
        assert_eq!(switches().len(), 2 * n);

        let running = scheduler
            .tasks()
            .iter()
            .filter(|task| task.state() == TaskState::Running)
            .count();
        assert_eq!(running, 1);
    }

    #[test]
    fn round_robin_wraps_from_the_middle() {
        let mut scheduler = scheduler();
        let ids: Vec<TaskId> = (0..3).map(|_| scheduler.create_task(entry).unwrap()).collect();

        // Park the first created task and let the rest rotate.
        scheduler.mark_waiting(ids[0]).unwrap();
        let mut visited = Vec::new();
        for _ in 0..3 {
            unsafe { scheduler.schedule() };
            visited.push(scheduler.current_task_id().unwrap());
        }
        assert_eq!(visited, vec![ids[1], ids[2], TaskId::BOOTSTRAP]);

        scheduler.mark_runnable(ids[0]).unwrap();
        unsafe { scheduler.schedule() };
        assert_eq!(scheduler.current_task_id(), Some(ids[0]));
    }

    #[test]
    fn running_task_cannot_be_parked() {
        let mut scheduler = scheduler();
        assert_eq!(
            scheduler.mark_waiting(TaskId::BOOTSTRAP),
            Err(SchedulerError::TaskRunning(TaskId::BOOTSTRAP))
        );
        assert_eq!(
            scheduler.mark_runnable(TaskId(42)),
            Err(SchedulerError::UnknownTask(TaskId(42)))
        );
    }

    #[test]
    fn outgoing_task_keeps_its_stack_pointer() {
        let mut scheduler = scheduler();
        let b = scheduler.create_task(entry).unwrap();
        let b_sp = scheduler.task(b).unwrap().stack_pointer();

        unsafe { scheduler.schedule() };
        unsafe { scheduler.schedule() };

        // The recording switch never writes through `from`, so both pointers are untouched.
        assert_eq!(scheduler.task(b).unwrap().stack_pointer(), b_sp);
        assert_eq!(scheduler.task(TaskId::BOOTSTRAP).unwrap().stack_pointer(), 0);
        assert_eq!(scheduler.current_task_id(), Some(TaskId::BOOTSTRAP));
    }

    #[test]
    fn decided_switch_names_both_stacks() {
        let mut scheduler = scheduler();
        let b = scheduler.create_task(entry).unwrap();
        let b_sp = scheduler.task(b).unwrap().stack_pointer();

        let switch = scheduler.pick_next().unwrap();
        assert_eq!(switch.to(), b_sp);
        assert_eq!(
            switch.from() as usize,
            &scheduler.tasks()[0].stack_pointer as *const usize as usize
        );

        // The states already reflect the switch, but nothing has been transferred yet.
        assert_eq!(scheduler.current_task_id(), Some(b));
        assert!(switches().is_empty());
    }
}
