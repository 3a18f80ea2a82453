use std::{
    panic::AssertUnwindSafe,
    sync::{Arc, Barrier},
    time::Duration,
};

use crate::{
    strategy::DoubleCheckedNulled,
    test_util::{init_logging, Calls, Tracked},
    ComputeOnce, Error, Guarantee, LazyMemoizer, Strategy,
};

const RACERS: usize = 64;

fn slow_counting_memoizer(strategy: Strategy, calls: &Calls) -> LazyMemoizer<Tracked> {
    let calls = calls.clone();
    let token = Arc::new(());
    LazyMemoizer::infallible(strategy, move || {
        let id = calls.record();
        // widen the window in which racers find the slot empty
        std::thread::sleep(Duration::from_millis(20));
        Tracked::new(id, &token)
    })
}

/// Has all `RACERS` threads call `get` at once; returns the address and id each one observed.
fn race(memo: &LazyMemoizer<Tracked>) -> Vec<(usize, usize)> {
    let start = Barrier::new(RACERS);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                scope.spawn(|| {
                    start.wait();
                    let value = memo.value();
                    (value as *const Tracked as usize, value.id)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

#[test]
fn racing_callers_run_factory_exactly_once() {
    init_logging();
    for strategy in Strategy::ALL {
        if strategy.guarantee() != Guarantee::ExactlyOnce {
            continue;
        }
        let calls = Calls::default();
        let memo = slow_counting_memoizer(strategy, &calls);
        let observed = race(&memo);
        assert_eq!(calls.count(), 1, "{strategy}");
        assert!(
            observed.iter().all(|o| *o == observed[0]),
            "{strategy}: callers observed different values"
        );
        assert!(memo.is_computed());
    }
}

#[test]
fn racing_callers_observe_a_single_value() {
    init_logging();
    for strategy in Strategy::ALL {
        let calls = Calls::default();
        let memo = slow_counting_memoizer(strategy, &calls);
        let observed = race(&memo);
        assert!(calls.count() >= 1, "{strategy}");
        assert!(
            observed.iter().all(|o| *o == observed[0]),
            "{strategy}: callers observed different values"
        );
        // nobody runs the factory once the value is visible
        let settled = calls.count();
        let _ = race(&memo);
        assert_eq!(calls.count(), settled, "{strategy}");
    }
}

#[test]
fn atomic_swap_may_run_factory_more_than_once() {
    init_logging();
    let calls = Calls::default();
    let token = Arc::new(());
    // Both racers must be inside the factory before either can publish.
    let both_inside = Arc::new(Barrier::new(2));
    let memo = LazyMemoizer::infallible(Strategy::AtomicSwap, {
        let calls = calls.clone();
        let token = Arc::clone(&token);
        move || {
            let id = calls.record();
            both_inside.wait();
            Tracked::new(id, &token)
        }
    });
    assert_eq!(memo.guarantee(), Guarantee::SingleValue);

    let observed: Vec<usize> = std::thread::scope(|scope| {
        let a = scope.spawn(|| memo.value().id);
        let b = scope.spawn(|| memo.value().id);
        vec![a.join().unwrap(), b.join().unwrap()]
    });

    assert_eq!(calls.count(), 2);
    assert_eq!(observed[0], observed[1], "both racers see the winner's value");
    // token held by: us, the factory closure, the retained value; the loser's value is gone
    assert_eq!(Arc::strong_count(&token), 3);
}

#[test]
fn repeated_get_returns_cached_value() {
    for strategy in Strategy::ALL {
        let calls = Calls::default();
        let memo = LazyMemoizer::infallible(strategy, {
            let calls = calls.clone();
            move || calls.record() + 100
        });
        assert!(!memo.is_computed());
        let first: *const usize = memo.value();
        for _ in 0..10 {
            assert!(std::ptr::eq(first, memo.value()), "{strategy}");
        }
        assert_eq!(*memo.value(), 100);
        assert_eq!(calls.count(), 1, "{strategy}");
    }
}

#[test]
fn failed_factory_is_retried() {
    init_logging();
    for strategy in Strategy::ALL {
        let calls = Calls::default();
        let memo = LazyMemoizer::new(strategy, {
            let calls = calls.clone();
            move || match calls.record() {
                0 => Err("transient"),
                n => Ok(n),
            }
        });

        assert_eq!(memo.get().unwrap_err(), "transient", "{strategy}");
        assert!(!memo.is_computed(), "{strategy}: error must not be cached");

        assert_eq!(*memo.get().unwrap(), 1, "{strategy}");
        assert_eq!(*memo.get().unwrap(), 1, "{strategy}");
        assert_eq!(calls.count(), 2, "{strategy}");
    }
}

#[test]
fn panicking_factory_is_retried() {
    init_logging();
    for strategy in Strategy::ALL {
        let calls = Calls::default();
        let memo = LazyMemoizer::infallible(strategy, {
            let calls = calls.clone();
            move || {
                if calls.record() == 0 {
                    panic!("factory exploded");
                }
                7u32
            }
        });

        let res = std::panic::catch_unwind(AssertUnwindSafe(|| *memo.value()));
        assert!(res.is_err(), "{strategy}");
        assert!(!memo.is_computed(), "{strategy}");

        assert_eq!(*memo.value(), 7, "{strategy}");
        assert_eq!(calls.count(), 2, "{strategy}");
    }
}

#[test]
fn missing_factory_is_rejected_at_construction() {
    for strategy in Strategy::ALL {
        let res = LazyMemoizer::<u32, ()>::from_optional(strategy, None::<fn() -> Result<u32, ()>>);
        assert!(matches!(res, Err(Error::InvalidArgument(_))), "{strategy}");

        let memo = LazyMemoizer::from_optional(strategy, Some(|| Ok::<_, ()>(5u32))).unwrap();
        assert_eq!(memo.get(), Ok(&5));
    }
}

#[test]
fn memoized_value_dropped_with_memoizer() {
    for strategy in Strategy::ALL {
        let token = Arc::new(());
        let memo = LazyMemoizer::infallible(strategy, {
            let token = Arc::clone(&token);
            move || Tracked::new(0, &token)
        });
        // us + factory
        assert_eq!(Arc::strong_count(&token), 2, "{strategy}");
        memo.value();
        let expect = match strategy {
            // the factory was released on publication
            Strategy::DoubleCheckedNulled => 2,
            _ => 3,
        };
        assert_eq!(Arc::strong_count(&token), expect, "{strategy}");
        drop(memo);
        assert_eq!(Arc::strong_count(&token), 1, "{strategy}");
    }
}

#[test]
fn uncomputed_memoizer_drops_cleanly() {
    for strategy in Strategy::ALL {
        let memo = LazyMemoizer::infallible(strategy, || String::from("never"));
        assert!(!memo.is_computed());
        drop(memo);
    }
}

#[test]
fn double_checked_nulled_releases_factory_after_publishing() {
    let captured = Arc::new(());
    let memo = DoubleCheckedNulled::new({
        let captured = Arc::clone(&captured);
        move || Ok::<_, ()>(Arc::strong_count(&captured))
    });
    assert!(!memo.factory_released());
    assert_eq!(*memo.get().unwrap(), 2);
    assert!(memo.factory_released());
    assert_eq!(Arc::strong_count(&captured), 1);
    assert_eq!(*memo.get().unwrap(), 2);
}

#[test]
fn memoizer_reports_its_strategy() {
    for strategy in Strategy::ALL {
        let memo = LazyMemoizer::infallible(strategy, || ());
        assert_eq!(memo.strategy(), strategy);
        assert_eq!(memo.guarantee(), strategy.guarantee());
        assert_eq!(
            format!("{memo:?}"),
            format!("LazyMemoizer {{ strategy: {strategy:?}, computed: false }}")
        );
    }
}
