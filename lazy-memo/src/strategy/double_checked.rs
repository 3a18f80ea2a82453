//! Double-checked locking on an explicit "computed" flag.
//!
//! Fast path: `Acquire`-load the flag; if set, the slot is initialized and never written again.
//! Slow path: take the per-instance mutex, re-check the flag, run the factory,
//! write the slot, and `Release`-store the flag as the last step inside the critical section.

use std::{
    cell::UnsafeCell,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, PoisonError,
    },
};

use tracing::trace;

use super::{ComputeOnce, Guarantee};

pub struct DoubleChecked<T, F> {
    computed: AtomicBool,
    lock: Mutex<()>,
    value: UnsafeCell<Option<T>>,
    factory: F,
}

// SAFETY: the slot is written only while holding `lock` and only before `computed` is published.
// After publication it is only ever read, so sharing `&T` requires `T: Sync`, and since the value
// may be produced on one thread and dropped on another, `T: Send`.
// The factory only runs under `lock`, so it is never called concurrently.
unsafe impl<T: Send + Sync, F: Send> Sync for DoubleChecked<T, F> {}

impl<T, F> DoubleChecked<T, F> {
    pub fn new(factory: F) -> Self {
        DoubleChecked {
            computed: AtomicBool::new(false),
            lock: Mutex::new(()),
            value: UnsafeCell::new(None),
            factory,
        }
    }

    /// # Safety
    ///
    /// `computed` must have been observed `true` with `Acquire` ordering, or the caller holds `lock`
    /// and has just published the value.
    unsafe fn published(&self) -> &T {
        match &*self.value.get() {
            Some(value) => value,
            None => unreachable!("computed flag published before the value"),
        }
    }
}

impl<T, F> crate::sealed::Sealed for DoubleChecked<T, F> {}

impl<T, E, F> ComputeOnce for DoubleChecked<T, F>
where
    T: Send + Sync,
    F: Fn() -> Result<T, E> + Send,
{
    type Value = T;
    type Error = E;

    #[inline]
    fn get(&self) -> Result<&T, E> {
        if self.computed.load(Ordering::Acquire) {
            // SAFETY: observed the flag with Acquire
            return Ok(unsafe { self.published() });
        }
        self.get_slow()
    }

    fn is_computed(&self) -> bool {
        self.computed.load(Ordering::Acquire)
    }

    fn guarantee(&self) -> Guarantee {
        Guarantee::ExactlyOnce
    }
}

impl<T, E, F> DoubleChecked<T, F>
where
    T: Send + Sync,
    F: Fn() -> Result<T, E> + Send,
{
    #[cold]
    fn get_slow(&self) -> Result<&T, E> {
        // A factory that panicked poisons the mutex, but it never got to write the slot or the flag.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        // Relaxed is enough: the flag is only stored while holding `lock`.
        if !self.computed.load(Ordering::Relaxed) {
            trace!("running factory");
            scopeguard::defer_on_unwind! {
                tracing::warn!("factory panicked, memoizer stays uncomputed");
            };
            let value = (self.factory)()?;
            // SAFETY: we hold `lock` and `computed` is unset, so no reader can hold a reference into the slot.
            unsafe { *self.value.get() = Some(value) };
            self.computed.store(true, Ordering::Release);
        }
        // SAFETY: `computed` is set and we hold `lock`.
        Ok(unsafe { self.published() })
    }
}
