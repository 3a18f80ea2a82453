//! Lock-free memoization through a compare-exchange on an empty atomic slot.
//!
//! There is no lock, hence nothing keeps two threads that both observe an empty slot from
//! both running the factory. Both then try to install their value; the first compare-exchange
//! wins, the loser drops its own value and returns the winner's. So the factory may run more
//! than once, but only a single value is ever observable. See [`Guarantee::SingleValue`].

use std::{
    marker::PhantomData,
    ptr,
    sync::atomic::{AtomicPtr, Ordering},
};

use tracing::trace;

use super::{ComputeOnce, Guarantee};

pub struct AtomicSwap<T, F> {
    value: AtomicPtr<T>,
    factory: F,
    _owns: PhantomData<T>,
}

impl<T, F> AtomicSwap<T, F> {
    pub fn new(factory: F) -> Self {
        AtomicSwap {
            value: AtomicPtr::new(ptr::null_mut()),
            factory,
            _owns: PhantomData,
        }
    }
}

impl<T, F> Drop for AtomicSwap<T, F> {
    fn drop(&mut self) {
        let value = *self.value.get_mut();
        if !value.is_null() {
            // SAFETY: non-null pointers in `value` come from `Box::into_raw` of the race winner.
            drop(unsafe { Box::from_raw(value) });
        }
    }
}

impl<T, F> crate::sealed::Sealed for AtomicSwap<T, F> {}

impl<T, E, F> ComputeOnce for AtomicSwap<T, F>
where
    T: Send + Sync,
    F: Fn() -> Result<T, E> + Send + Sync,
{
    type Value = T;
    type Error = E;

    fn get(&self) -> Result<&T, E> {
        let current = self.value.load(Ordering::Acquire);
        if !current.is_null() {
            // SAFETY: the installed pointer stays valid and unmodified until `self` is dropped.
            return Ok(unsafe { &*current });
        }

        let fresh = Box::into_raw(Box::new((self.factory)()?));
        match self.value.compare_exchange(
            ptr::null_mut(),
            fresh,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            // SAFETY: we installed it
            Ok(_) => Ok(unsafe { &*fresh }),
            Err(winner) => {
                trace!("lost the race to install a value, dropping ours");
                // SAFETY: `fresh` was never shared
                drop(unsafe { Box::from_raw(fresh) });
                // SAFETY: see the fast path
                Ok(unsafe { &*winner })
            }
        }
    }

    fn is_computed(&self) -> bool {
        !self.value.load(Ordering::Acquire).is_null()
    }

    fn guarantee(&self) -> Guarantee {
        Guarantee::SingleValue
    }
}
