use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

pub(crate) fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// Counts factory invocations across clones.
#[derive(Clone, Default)]
pub(crate) struct Calls(Arc<AtomicUsize>);

impl Calls {
    /// Record an invocation and return its zero-based sequence number.
    pub(crate) fn record(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Value that keeps a shared token alive, to observe when memoized values get dropped.
pub(crate) struct Tracked {
    pub(crate) id: usize,
    _token: Arc<()>,
}

impl Tracked {
    pub(crate) fn new(id: usize, token: &Arc<()>) -> Self {
        Tracked {
            id,
            _token: Arc::clone(token),
        }
    }
}
