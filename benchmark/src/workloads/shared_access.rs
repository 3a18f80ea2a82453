//! All clients call `get()` on one memoizer. The first calls race on initialization,
//! everything after that measures the fast path under contention.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use lazy_memo::{LazyMemoizer, Strategy};

use super::{ExpensiveValue, Workload};

pub(crate) struct SharedAccess {
    memo: LazyMemoizer<ExpensiveValue>,
    factory_runs: Arc<AtomicU64>,
}

impl SharedAccess {
    pub(crate) fn new(strategy: Strategy) -> Self {
        let factory_runs = Arc::new(AtomicU64::new(0));
        let memo = LazyMemoizer::infallible(strategy, {
            let factory_runs = Arc::clone(&factory_runs);
            move || ExpensiveValue::build(&factory_runs)
        });
        Self { memo, factory_runs }
    }
}

impl Workload for SharedAccess {
    #[inline(always)]
    fn op(&self) {
        std::hint::black_box(self.memo.value().first());
    }

    fn factory_runs(&self) -> u64 {
        self.factory_runs.load(Ordering::Relaxed)
    }
}
