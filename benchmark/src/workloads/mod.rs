use std::sync::atomic::{AtomicU64, Ordering};

use lazy_memo::Strategy;

use crate::WorkloadKind;

pub(crate) mod fresh_init;
pub(crate) mod shared_access;

/// One operation that client threads run in a loop; shared by all clients of a round.
pub(crate) trait Workload: Sync {
    fn op(&self);
    /// How often the memoized factory ran so far, across all clients.
    fn factory_runs(&self) -> u64;
}

pub(crate) fn setup_workload(kind: WorkloadKind, strategy: Strategy) -> Box<dyn Workload> {
    match kind {
        WorkloadKind::SharedAccess => Box::new(shared_access::SharedAccess::new(strategy)),
        WorkloadKind::FreshInit => Box::new(fresh_init::FreshInit::new(strategy)),
    }
}

/// Stands in for something costly to set up, e.g. a cipher instance or a formatter.
pub(crate) struct ExpensiveValue {
    table: Vec<u64>,
}

const TABLE_LEN: u64 = 1024;

impl ExpensiveValue {
    pub(crate) fn build(factory_runs: &AtomicU64) -> Self {
        factory_runs.fetch_add(1, Ordering::Relaxed);
        ExpensiveValue {
            table: (0..TABLE_LEN)
                .map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15))
                .collect(),
        }
    }

    pub(crate) fn first(&self) -> Option<u64> {
        self.table.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::setup_workload;
    use crate::WorkloadKind;
    use lazy_memo::Strategy;

    #[test]
    fn shared_access_runs_factory_once_for_strict_strategies() {
        for strategy in [Strategy::DoubleChecked, Strategy::DoubleCheckedNulled, Strategy::OnceCell] {
            let workload = setup_workload(WorkloadKind::SharedAccess, strategy);
            std::thread::scope(|scope| {
                for _ in 0..8 {
                    scope.spawn(|| {
                        for _ in 0..100 {
                            workload.op();
                        }
                    });
                }
            });
            assert_eq!(workload.factory_runs(), 1, "{strategy}");
        }
    }

    #[test]
    fn fresh_init_runs_factory_per_op() {
        let workload = setup_workload(WorkloadKind::FreshInit, Strategy::AtomicSwap);
        for _ in 0..10 {
            workload.op();
        }
        assert_eq!(workload.factory_runs(), 10);
    }
}
