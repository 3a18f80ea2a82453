//! [`once_cell::sync::OnceCell`] behind the [`ComputeOnce`] interface.
//!
//! Threads that find the cell empty block until the initializing thread is done.
//! A failing initializer leaves the cell empty and one of the waiters takes over.

use once_cell::sync::OnceCell;

use super::{ComputeOnce, Guarantee};

pub struct OnceCellBacked<T, F> {
    cell: OnceCell<T>,
    factory: F,
}

impl<T, F> OnceCellBacked<T, F> {
    pub fn new(factory: F) -> Self {
        OnceCellBacked {
            cell: OnceCell::new(),
            factory,
        }
    }
}

impl<T, F> crate::sealed::Sealed for OnceCellBacked<T, F> {}

impl<T, E, F> ComputeOnce for OnceCellBacked<T, F>
where
    T: Send + Sync,
    F: Fn() -> Result<T, E> + Send + Sync,
{
    type Value = T;
    type Error = E;

    #[inline]
    fn get(&self) -> Result<&T, E> {
        self.cell.get_or_try_init(|| (self.factory)())
    }

    fn is_computed(&self) -> bool {
        self.cell.get().is_some()
    }

    fn guarantee(&self) -> Guarantee {
        Guarantee::ExactlyOnce
    }
}
