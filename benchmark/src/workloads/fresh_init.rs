//! Every op builds a new memoizer and computes its value, i.e., measures the slow path
//! (plus the allocation of the memoizer itself). Clients don't share memoizers.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use lazy_memo::{LazyMemoizer, Strategy};

use super::{ExpensiveValue, Workload};

pub(crate) struct FreshInit {
    strategy: Strategy,
    factory_runs: Arc<AtomicU64>,
}

impl FreshInit {
    pub(crate) fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            factory_runs: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Workload for FreshInit {
    #[inline(always)]
    fn op(&self) {
        let memo = LazyMemoizer::infallible(self.strategy, {
            let factory_runs = Arc::clone(&self.factory_runs);
            move || ExpensiveValue::build(&factory_runs)
        });
        std::hint::black_box(memo.value().first());
    }

    fn factory_runs(&self) -> u64 {
        self.factory_runs.load(Ordering::Relaxed)
    }
}
