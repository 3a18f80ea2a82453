//! Double-checked locking where the published value pointer doubles as the flag.
//!
//! A null pointer means "not computed". The factory lives in the mutex and is dropped
//! once the value is published, so whatever it captured is released early.

use std::{
    marker::PhantomData,
    ptr,
    sync::{
        atomic::{AtomicPtr, Ordering},
        Mutex, PoisonError,
    },
};

use tracing::trace;

use super::{ComputeOnce, Guarantee};

pub struct DoubleCheckedNulled<T, F> {
    value: AtomicPtr<T>,
    factory: Mutex<Option<F>>,
    _owns: PhantomData<T>,
}

impl<T, F> DoubleCheckedNulled<T, F> {
    pub fn new(factory: F) -> Self {
        DoubleCheckedNulled {
            value: AtomicPtr::new(ptr::null_mut()),
            factory: Mutex::new(Some(factory)),
            _owns: PhantomData,
        }
    }

    /// Whether the factory has been dropped, i.e., the value was published.
    pub fn factory_released(&self) -> bool {
        self.factory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl<T, F> Drop for DoubleCheckedNulled<T, F> {
    fn drop(&mut self) {
        let value = *self.value.get_mut();
        if !value.is_null() {
            // SAFETY: non-null pointers in `value` come from `Box::into_raw` and are published once.
            drop(unsafe { Box::from_raw(value) });
        }
    }
}

impl<T, F> crate::sealed::Sealed for DoubleCheckedNulled<T, F> {}

impl<T, E, F> ComputeOnce for DoubleCheckedNulled<T, F>
where
    T: Send + Sync,
    F: Fn() -> Result<T, E> + Send,
{
    type Value = T;
    type Error = E;

    #[inline]
    fn get(&self) -> Result<&T, E> {
        let value = self.value.load(Ordering::Acquire);
        if !value.is_null() {
            // SAFETY: published pointers stay valid and unmodified until `self` is dropped.
            return Ok(unsafe { &*value });
        }
        self.get_slow()
    }

    fn is_computed(&self) -> bool {
        !self.value.load(Ordering::Acquire).is_null()
    }

    fn guarantee(&self) -> Guarantee {
        Guarantee::ExactlyOnce
    }
}

impl<T, E, F> DoubleCheckedNulled<T, F>
where
    T: Send + Sync,
    F: Fn() -> Result<T, E> + Send,
{
    #[cold]
    fn get_slow(&self) -> Result<&T, E> {
        let mut factory = self.factory.lock().unwrap_or_else(PoisonError::into_inner);
        // Relaxed is enough: the pointer is only stored while holding the factory lock.
        let value = self.value.load(Ordering::Relaxed);
        if !value.is_null() {
            // SAFETY: see `get`
            return Ok(unsafe { &*value });
        }
        let make = match factory.as_ref() {
            Some(make) => make,
            None => unreachable!("factory released but no value published"),
        };
        trace!("running factory");
        scopeguard::defer_on_unwind! {
            tracing::warn!("factory panicked, memoizer stays uncomputed");
        };
        let value = Box::into_raw(Box::new(make()?));
        self.value.store(value, Ordering::Release);
        *factory = None;
        // SAFETY: we just published it
        Ok(unsafe { &*value })
    }
}
