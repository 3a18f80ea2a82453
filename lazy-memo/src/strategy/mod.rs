//! Parent module for the [`ComputeOnce`] trait and its implementations.

use std::{fmt, str::FromStr};

pub mod atomic_swap;
pub mod double_checked;
pub mod double_checked_nulled;
pub mod once_cell_backed;

pub use atomic_swap::AtomicSwap;
pub use double_checked::DoubleChecked;
pub use double_checked_nulled::DoubleCheckedNulled;
pub use once_cell_backed::OnceCellBacked;

/// A thread-safe slot that is filled at most once by a factory bound at construction.
///
/// Implemented by the structs in [`crate::strategy`]; use [`crate::LazyMemoizer`] if the
/// strategy should be picked at runtime.
pub trait ComputeOnce: crate::sealed::Sealed + Send + Sync {
    type Value;
    type Error;

    /// Return the memoized value, running the factory if no value has been published yet.
    ///
    /// Factory errors are returned as-is and not cached: the slot stays empty and the
    /// next call runs the factory again.
    fn get(&self) -> Result<&Self::Value, Self::Error>;

    /// Whether a value has been published. Once `true`, stays `true`.
    fn is_computed(&self) -> bool;

    fn guarantee(&self) -> Guarantee;
}

/// What a [`ComputeOnce`] implementation promises about factory invocations.
///
/// Both variants promise that all callers observe one and the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guarantee {
    /// The factory completes successfully at most once, no matter how many threads race.
    /// Failed invocations don't count; the next caller retries.
    ExactlyOnce,
    /// Threads that race on an empty slot may each run the factory.
    /// Exactly one of the produced values is retained; the others are dropped right away.
    SingleValue,
}

/// Names the [`ComputeOnce`] implementations for runtime selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// See [`DoubleChecked`].
    #[default]
    DoubleChecked,
    /// See [`DoubleCheckedNulled`].
    DoubleCheckedNulled,
    /// See [`AtomicSwap`].
    AtomicSwap,
    /// See [`OnceCellBacked`].
    OnceCell,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::DoubleChecked,
        Strategy::DoubleCheckedNulled,
        Strategy::AtomicSwap,
        Strategy::OnceCell,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::DoubleChecked => "double-checked",
            Strategy::DoubleCheckedNulled => "double-checked-nulled",
            Strategy::AtomicSwap => "atomic-swap",
            Strategy::OnceCell => "once-cell",
        }
    }

    pub fn guarantee(&self) -> Guarantee {
        match self {
            Strategy::DoubleChecked | Strategy::DoubleCheckedNulled | Strategy::OnceCell => {
                Guarantee::ExactlyOnce
            }
            Strategy::AtomicSwap => Guarantee::SingleValue,
        }
    }

    pub(crate) fn build<T, E, F>(self, factory: F) -> Box<dyn ComputeOnce<Value = T, Error = E>>
    where
        T: Send + Sync + 'static,
        E: 'static,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        match self {
            Strategy::DoubleChecked => Box::new(DoubleChecked::new(factory)),
            Strategy::DoubleCheckedNulled => Box::new(DoubleCheckedNulled::new(factory)),
            Strategy::AtomicSwap => Box::new(AtomicSwap::new(factory)),
            Strategy::OnceCell => Box::new(OnceCellBacked::new(factory)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| crate::Error::UnknownStrategy(s.to_owned()))
    }
}
