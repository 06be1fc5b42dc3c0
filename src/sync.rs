//! Locks shared between tasks and interrupt handlers.

use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use spin::{Mutex, MutexGuard};

use crate::arch::InterruptFlag;

/// A spin lock that masks interrupts for as long as it is held.
///
/// A plain spin lock taken by a task with interrupts enabled can be held across a preemption.
/// If an interrupt handler, or any code running with interrupts masked, then spins on it, the
/// holder never runs again. Holding this lock keeps the timer out, so the holder always gets to
/// release it.
pub struct IrqMutex<T, F: InterruptFlag> {
    inner: Mutex<T>,
    _flag: PhantomData<fn() -> F>,
}

impl<T, F: InterruptFlag> IrqMutex<T, F> {
    pub const fn new(value: T) -> Self {
        IrqMutex {
            inner: Mutex::new(value),
            _flag: PhantomData,
        }
    }

    pub fn lock(&self) -> IrqMutexGuard<'_, T, F> {
        let were_enabled = F::save_and_disable();
        IrqMutexGuard {
            guard: ManuallyDrop::new(self.inner.lock()),
            were_enabled,
            _flag: PhantomData,
        }
    }

    /// ## Safety
    ///
    /// Only for paths that never return to whoever held the lock, such as fatal fault handlers.
    pub unsafe fn force_unlock(&self) {
        self.inner.force_unlock();
    }
}

pub struct IrqMutexGuard<'a, T, F: InterruptFlag> {
    guard: ManuallyDrop<MutexGuard<'a, T>>,
    were_enabled: bool,
    _flag: PhantomData<fn() -> F>,
}

impl<T, F: InterruptFlag> Deref for IrqMutexGuard<'_, T, F> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T, F: InterruptFlag> DerefMut for IrqMutexGuard<'_, T, F> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T, F: InterruptFlag> Drop for IrqMutexGuard<'_, T, F> {
    fn drop(&mut self) {
        // The lock is released before interrupts come back on.
        // SAFETY: the guard is dropped exactly once, here.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        F::restore(self.were_enabled);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arch::test::FakeInterruptFlag;

    #[test]
    fn holding_the_lock_masks_interrupts() {
        FakeInterruptFlag::set_enabled(true);
        let lock: IrqMutex<u32, FakeInterruptFlag> = IrqMutex::new(1);

        {
            let mut value = lock.lock();
            assert!(!FakeInterruptFlag::are_enabled());
            *value += 1;
        }

        assert!(FakeInterruptFlag::are_enabled());
        assert_eq!(*lock.lock(), 2);
        assert!(FakeInterruptFlag::are_enabled());
    }

    #[test]
    fn masked_callers_stay_masked() {
        FakeInterruptFlag::set_enabled(false);
        let lock: IrqMutex<u32, FakeInterruptFlag> = IrqMutex::new(0);

        drop(lock.lock());
        assert!(!FakeInterruptFlag::are_enabled());

        FakeInterruptFlag::set_enabled(true);
    }

    #[test]
    fn dropping_the_guard_releases_the_lock() {
        FakeInterruptFlag::set_enabled(true);
        let lock: IrqMutex<u32, FakeInterruptFlag> = IrqMutex::new(0);

        drop(lock.lock());
        assert!(lock.inner.try_lock().is_some());
    }
}
